//! routeshot capture engine
//!
//! Turns a project's file-based routes, a fixture document and a set of
//! viewports into a deterministic screenshot set, and records the review
//! stage that set belongs to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ScreenshotCaptureService                    │
//! │    ├── RequestValidator      (project path, enumerations)   │
//! │    ├── RouteDiscoveryPort    (routes.json manifest)         │
//! │    ├── FixtureManager        (fixtures.json, expansion)     │
//! │    └── BrowserController     (PlaywrightSession)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  routes::Discovery (app | pages)  ->  RouteManifest::scan   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  WorkflowStateManager                                       │
//! │    in-development -> reviews-requested -> in-review         │
//! │                    -> submitted-for-development             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod capture;
pub mod config;
pub mod fixtures;
pub mod manifest;
pub mod readiness;
pub mod routes;
pub mod validate;
pub mod workflow;

pub use browser::{BrowserController, BrowserError, PlaywrightConfig, PlaywrightSession, ShotRequest};
pub use capture::{screenshot_file_name, CaptureOptions, ScreenshotCaptureService};
pub use config::{ProjectConfig, CONFIG_FILE_NAME};
pub use fixtures::{FixtureManager, FixtureValidator, InstanceGenerator, ValidationOutcome};
pub use manifest::{ManifestRouteDiscovery, RouteDiscoveryPort, RouteManifest};
pub use readiness::wait_for_app;
pub use routes::{Discovery, RouteDiscovery};
pub use validate::{DefaultRequestValidator, RequestValidator, ValidatedRequest};
pub use workflow::WorkflowStateManager;
