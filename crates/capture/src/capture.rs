//! Screenshot capture orchestration
//!
//! A run validates the request, expands the discovered routes into concrete
//! instances, then takes one shot per (instance, viewport) pair. Shots are
//! recorded instance-major, viewport-minor regardless of how many are in
//! flight, and the first failure ends the run. The first shot always runs on
//! its own, so an unreachable app fails the run after a single navigation.

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use routeshot_common::{
    default_viewports, AuthFixture, CaptureRequest, CaptureResult, Error, GlobalState,
    InjectedFixtures, Result, ScreenshotResult, ViewportConfig, DEFAULT_DATA_DIR,
};

use crate::browser::{BrowserController, ShotRequest};
use crate::fixtures::FixtureManager;
use crate::manifest::RouteDiscoveryPort;
use crate::validate::RequestValidator;

/// Capture service options
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Output directory, relative to the project path
    pub output_dir: PathBuf,
    pub viewports: Vec<ViewportConfig>,
    /// Maximum shots in flight
    pub concurrency: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_DATA_DIR).join("screenshots"),
            viewports: default_viewports(),
            concurrency: 1,
        }
    }
}

/// File name for one screenshot: `/product/a` at `mobile` gives
/// `product_a_mobile.png`, the root instance is named `index`. Slashes in
/// either part become underscores so the file lands in the output directory.
pub fn screenshot_file_name(instance: &str, viewport: &str) -> String {
    let trimmed = instance.trim_matches('/');
    let stem = if trimmed.is_empty() {
        "index".to_string()
    } else {
        trimmed.replace('/', "_")
    };
    format!("{}_{}.png", stem, viewport.replace('/', "_"))
}

struct Job<'a> {
    instance: &'a str,
    viewport: &'a ViewportConfig,
}

pub struct ScreenshotCaptureService {
    discovery: Arc<dyn RouteDiscoveryPort>,
    browser: Arc<dyn BrowserController>,
    validator: Arc<dyn RequestValidator>,
    fixtures: Arc<FixtureManager>,
    options: CaptureOptions,
}

impl ScreenshotCaptureService {
    pub fn new(
        discovery: Arc<dyn RouteDiscoveryPort>,
        browser: Arc<dyn BrowserController>,
        validator: Arc<dyn RequestValidator>,
        fixtures: Arc<FixtureManager>,
    ) -> Self {
        Self {
            discovery,
            browser,
            validator,
            fixtures,
            options: CaptureOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Capture every route instance at every configured viewport.
    pub async fn capture_routes(&self, request: &CaptureRequest) -> Result<CaptureResult> {
        let request = self.validator.validate(request).await?;
        info!(
            "Capturing {} ({} router, {})",
            request.project_path.display(),
            request.router_type,
            request.auth_state
        );

        let routes = self.discovery.discover(&request.project_path).await?;
        let mut log = Vec::new();

        let mut instances = Vec::new();
        for route in &routes {
            if !route.is_dynamic {
                instances.push(route.path.clone());
                continue;
            }
            let expanded = self.fixtures.generate_route_instances(&route.path);
            if expanded.is_empty() {
                warn!("No fixtures for dynamic route {}, skipping", route.path);
                log.push(format!("Skipped {}: no fixture records", route.path));
            }
            instances.extend(expanded);
        }
        debug!("{} route(s) expanded to {} instance(s)", routes.len(), instances.len());

        let auth = self.fixtures.auth_fixture(request.auth_state);
        match &auth {
            Some(fixture) => log.push(format!(
                "Auth fixture '{}' injected ({} key(s))",
                request.auth_state,
                fixture.len()
            )),
            None => log.push(format!("No auth fixture for '{}'", request.auth_state)),
        }

        let global_state = if request.include_global_state {
            let state = self.fixtures.global_state();
            match &state {
                Some(bag) => log.push(format!("Global state injected ({} key(s))", bag.len())),
                None => log.push("Global state requested but none configured".to_string()),
            }
            state
        } else {
            None
        };

        let output_dir = request.project_path.join(&self.options.output_dir);
        tokio::fs::create_dir_all(&output_dir).await?;

        let jobs: Vec<Job<'_>> = instances
            .iter()
            .flat_map(|instance| {
                self.options.viewports.iter().map(move |viewport| Job {
                    instance: instance.as_str(),
                    viewport,
                })
            })
            .collect();

        let base_url = request.app_url.trim_end_matches('/');
        let concurrency = self.options.concurrency.max(1);

        let mut pending = jobs.iter();
        let mut screenshots = Vec::with_capacity(jobs.len());
        if let Some(first) = pending.next() {
            screenshots.push(
                self.shoot(first, base_url, &output_dir, auth.as_ref(), global_state.as_ref())
                    .await?,
            );
        }

        let rest: Vec<ScreenshotResult> = stream::iter(pending)
            .map(|job| {
                self.shoot(job, base_url, &output_dir, auth.as_ref(), global_state.as_ref())
            })
            .buffered(concurrency)
            .try_collect()
            .await?;
        screenshots.extend(rest);

        for shot in &screenshots {
            log.push(format!(
                "{} @ {}: {}",
                shot.route,
                shot.viewport,
                describe_injection(auth.is_some(), global_state.is_some())
            ));
        }

        info!(
            "Captured {} screenshot(s) across {} route(s)",
            screenshots.len(),
            routes.len()
        );

        Ok(CaptureResult {
            total_routes: routes.len(),
            total_screenshots: screenshots.len(),
            screenshots,
            injected_fixtures: InjectedFixtures { auth, global_state },
            fixture_injection_log: log,
        })
    }

    async fn shoot(
        &self,
        job: &Job<'_>,
        base_url: &str,
        output_dir: &Path,
        auth: Option<&AuthFixture>,
        global_state: Option<&GlobalState>,
    ) -> Result<ScreenshotResult> {
        let url = format!("{}{}", base_url, job.instance);
        let output_path = output_dir.join(screenshot_file_name(job.instance, &job.viewport.name));
        let shot = ShotRequest {
            url: url.clone(),
            viewport: job.viewport.clone(),
            auth_fixture: auth.cloned(),
            global_state: global_state.cloned(),
            output_path: output_path.clone(),
        };

        debug!("Shooting {} at {}", url, job.viewport.name);
        self.browser.capture(&shot).await.map_err(|e| {
            if e.is_connection() {
                Error::Connection {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            } else {
                Error::Capture {
                    route: job.instance.to_string(),
                    viewport: job.viewport.name.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        Ok(ScreenshotResult {
            route: job.instance.to_string(),
            viewport: job.viewport.name.clone(),
            dimensions: job.viewport.dimensions(),
            file_path: output_path,
            timestamp: Utc::now(),
        })
    }
}

fn describe_injection(auth: bool, global_state: bool) -> &'static str {
    match (auth, global_state) {
        (true, true) => "auth fixture and global state injected",
        (true, false) => "auth fixture injected",
        (false, true) => "global state injected",
        (false, false) => "no fixtures injected",
    }
}
