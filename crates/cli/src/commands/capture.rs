//! Capture Command

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use routeshot_capture::{
    wait_for_app, DefaultRequestValidator, ManifestRouteDiscovery, PlaywrightSession,
    RequestValidator, ScreenshotCaptureService, WorkflowStateManager,
};
use routeshot_common::{CaptureRequest, CaptureResult, ScreenshotResult, WorkflowState};

use super::Context;
use crate::output::{print_list, print_warning, print_structured, print_success, TableDisplay};

#[derive(Args)]
pub struct CaptureArgs {
    /// Auth state to capture under (authenticated or unauthenticated)
    #[arg(long, default_value = "unauthenticated")]
    pub auth_state: String,

    /// Inject the fixture global state bag
    #[arg(long)]
    pub include_global_state: bool,

    /// Move the workflow to reviews-requested after a successful run
    #[arg(long)]
    pub request_review: bool,

    /// Capture even when the workflow stage does not allow it
    #[arg(long)]
    pub force: bool,

    /// Wait up to this many seconds for the app to answer before capturing
    #[arg(long, value_name = "SECS")]
    pub wait_for_app: Option<u64>,

    /// Override the configured application URL
    #[arg(long)]
    pub app_url: Option<String>,

    /// Override the configured routing convention
    #[arg(long)]
    pub router: Option<String>,
}

#[derive(Serialize)]
pub struct ScreenshotDisplay {
    pub route: String,
    pub viewport: String,
    pub size: String,
    pub file: String,
}

impl ScreenshotDisplay {
    fn from_result(shot: &ScreenshotResult, project_root: &Path) -> Self {
        let file = shot
            .file_path
            .strip_prefix(project_root)
            .unwrap_or(&shot.file_path);
        Self {
            route: shot.route.clone(),
            viewport: shot.viewport.clone(),
            size: format!("{}x{}", shot.dimensions.width, shot.dimensions.height),
            file: file.display().to_string(),
        }
    }
}

impl TableDisplay for ScreenshotDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Route", "Viewport", "Size", "File"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.route.clone(),
            self.viewport.clone(),
            self.size.clone(),
            self.file.clone(),
        ]
    }
}

pub async fn execute(args: CaptureArgs, ctx: &Context) -> Result<()> {
    let workflow = ctx.workflow();
    let current = workflow.get_workflow_state().await?;
    if !current.state.allows_capture() {
        if !args.force {
            bail!(
                "workflow is in '{}'; capture is allowed in '{}' or '{}' (use --force to override)",
                current.state,
                WorkflowState::InDevelopment,
                WorkflowState::SubmittedForDevelopment
            );
        }
        warn!("Capturing in '{}' because --force was given", current.state);
    }

    let app_url = args.app_url.unwrap_or_else(|| ctx.config.app_url.clone());
    let request = CaptureRequest::new(app_url.clone(), ctx.project_root.clone())
        .with_router_type(
            args.router
                .unwrap_or_else(|| ctx.config.router_type.to_string()),
        )
        .with_auth_state(args.auth_state)
        .with_global_state(args.include_global_state || ctx.config.capture.include_global_state);

    // Reject bad input before starting a browser
    DefaultRequestValidator.validate(&request).await?;

    if let Some(secs) = args.wait_for_app {
        wait_for_app(&app_url, Duration::from_secs(secs)).await?;
    }

    let fixtures = ctx.fixtures().await?;
    PlaywrightSession::check_playwright_installed(&ctx.project_root)?;
    let session = Arc::new(
        PlaywrightSession::launch(ctx.config.playwright_config(&ctx.project_root)).await?,
    );

    let service = ScreenshotCaptureService::new(
        Arc::new(
            ManifestRouteDiscovery::new(ctx.storage.clone())
                .with_manifest_path(ctx.config.manifest_path(&ctx.project_root)),
        ),
        session.clone(),
        Arc::new(DefaultRequestValidator),
        fixtures,
    )
    .with_options(ctx.config.capture_options());

    let outcome = service.capture_routes(&request).await;
    drop(service);
    match Arc::try_unwrap(session) {
        Ok(session) => {
            if let Err(e) = session.shutdown().await {
                warn!("Driver shutdown failed: {}", e);
            }
        }
        Err(_) => warn!("Driver still shared at shutdown, killing it"),
    }
    let result = outcome?;

    record(ctx, &workflow, current.state, &result, args.request_review).await?;
    report(ctx, &result);
    Ok(())
}

async fn record(
    ctx: &Context,
    workflow: &WorkflowStateManager,
    current: WorkflowState,
    result: &CaptureResult,
    request_review: bool,
) -> Result<()> {
    let next = if request_review {
        WorkflowState::ReviewsRequested
    } else {
        current
    };
    workflow.set_workflow_state(next, Some(result.clone())).await?;
    if request_review && ctx.chatty() {
        print_success(&format!("Workflow moved to '{}'", next));
    }
    Ok(())
}

fn report(ctx: &Context, result: &CaptureResult) {
    if ctx.format.is_structured() {
        print_structured(result, ctx.format);
        return;
    }

    for line in &result.fixture_injection_log {
        debug!("{}", line);
    }
    let skipped = result
        .fixture_injection_log
        .iter()
        .filter(|line| line.starts_with("Skipped"))
        .count();
    if skipped > 0 {
        print_warning(&format!("{} dynamic route(s) had no fixture records", skipped));
    }
    let shots: Vec<ScreenshotDisplay> = result
        .screenshots
        .iter()
        .map(|shot| ScreenshotDisplay::from_result(shot, &ctx.project_root))
        .collect();
    print_list(&shots, ctx.format);
    print_success(&format!(
        "Captured {} screenshot(s) across {} route(s)",
        result.total_screenshots, result.total_routes
    ));
}
