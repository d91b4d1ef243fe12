//! Browser controller port
//!
//! The capture service only ever asks for one screenshot at a time through
//! [`BrowserController`]. An implementation must, for every shot:
//! 1. open an isolated browsing context sized to the viewport
//! 2. navigate and wait for network quiescence
//! 3. write the auth fixture and global state into client-side storage
//! 4. reload if anything was written
//! 5. capture one full-page image to `output_path`
//! 6. release the page and context on every exit path

pub mod playwright;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use routeshot_common::{AuthFixture, GlobalState, ViewportConfig};

pub use playwright::{Engine, PlaywrightConfig, PlaywrightSession};

/// Everything the controller needs for one screenshot
#[derive(Debug, Clone)]
pub struct ShotRequest {
    pub url: String,
    pub viewport: ViewportConfig,
    pub auth_fixture: Option<AuthFixture>,
    pub global_state: Option<GlobalState>,
    pub output_path: PathBuf,
}

impl ShotRequest {
    pub fn injects_fixtures(&self) -> bool {
        self.auth_fixture.is_some() || self.global_state.is_some()
    }
}

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("target unreachable: {0}")]
    Unreachable(String),

    #[error("navigation timed out after {0} ms")]
    Timeout(u64),

    #[error("{0}")]
    Failed(String),

    #[error("driver error: {0}")]
    Driver(String),
}

impl BrowserError {
    /// Whether the failure means the application itself cannot be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, BrowserError::Unreachable(_) | BrowserError::Timeout(_))
    }
}

#[async_trait]
pub trait BrowserController: Send + Sync {
    async fn capture(&self, shot: &ShotRequest) -> Result<(), BrowserError>;
}
