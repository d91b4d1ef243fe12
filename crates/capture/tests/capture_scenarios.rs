//! End-to-end capture runs against an in-memory manifest and a recording
//! browser controller

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use routeshot_capture::{
    BrowserController, BrowserError, CaptureOptions, DefaultRequestValidator, FixtureManager,
    ManifestRouteDiscovery, ScreenshotCaptureService, ShotRequest,
};
use routeshot_common::{
    AuthFixtures, CaptureRequest, Error, FixtureConfig, FixtureRecord, MemoryStorage,
    ViewportConfig,
};

/// Records every shot and fails the ones a test asks for
#[derive(Default)]
struct RecordingBrowser {
    shots: Mutex<Vec<ShotRequest>>,
    finished: Mutex<Vec<String>>,
    fail_on: Option<(usize, fn() -> BrowserError)>,
    /// Total expected calls; call `n` sleeps `(total - n) * 10ms` so later
    /// shots finish first
    stagger: Option<usize>,
}

impl RecordingBrowser {
    fn failing_at(call: usize, error: fn() -> BrowserError) -> Self {
        Self {
            fail_on: Some((call, error)),
            ..Self::default()
        }
    }

    fn staggered(total: usize) -> Self {
        Self {
            stagger: Some(total),
            ..Self::default()
        }
    }

    fn finished(&self) -> Vec<String> {
        self.finished.lock().clone()
    }

    fn calls(&self) -> usize {
        self.shots.lock().len()
    }

    fn shots(&self) -> Vec<ShotRequest> {
        self.shots.lock().clone()
    }
}

#[async_trait]
impl BrowserController for RecordingBrowser {
    async fn capture(&self, shot: &ShotRequest) -> Result<(), BrowserError> {
        let call = {
            let mut shots = self.shots.lock();
            shots.push(shot.clone());
            shots.len()
        };
        if let Some(total) = self.stagger {
            let steps = total.saturating_sub(call) as u64;
            tokio::time::sleep(Duration::from_millis(steps * 10)).await;
        }
        match self.fail_on {
            Some((n, error)) if n == call => Err(error()),
            _ => {
                self.finished.lock().push(shot.output_path.display().to_string());
                Ok(())
            }
        }
    }
}

struct Harness {
    project: TempDir,
    browser: Arc<RecordingBrowser>,
    service: ScreenshotCaptureService,
}

impl Harness {
    fn new(manifest: serde_json::Value, fixtures: FixtureConfig, browser: RecordingBrowser) -> Self {
        Self::with_viewports(manifest, fixtures, browser, two_viewports())
    }

    fn with_viewports(
        manifest: serde_json::Value,
        fixtures: FixtureConfig,
        browser: RecordingBrowser,
        viewports: Vec<ViewportConfig>,
    ) -> Self {
        Self::with_options(
            manifest,
            fixtures,
            browser,
            CaptureOptions {
                viewports,
                ..CaptureOptions::default()
            },
        )
    }

    fn with_options(
        manifest: serde_json::Value,
        fixtures: FixtureConfig,
        browser: RecordingBrowser,
        options: CaptureOptions,
    ) -> Self {
        let project = TempDir::new().unwrap();
        let storage = Arc::new(MemoryStorage::new());
        storage.insert(
            project.path().join(".routeshot/routes.json"),
            manifest.to_string(),
        );

        let manager = Arc::new(FixtureManager::new(storage.clone()));
        manager.set_fixtures(fixtures);

        let browser = Arc::new(browser);
        let service = ScreenshotCaptureService::new(
            Arc::new(ManifestRouteDiscovery::new(storage)),
            browser.clone(),
            Arc::new(DefaultRequestValidator),
            manager,
        )
        .with_options(options);

        Self {
            project,
            browser,
            service,
        }
    }

    fn request(&self) -> CaptureRequest {
        CaptureRequest::new("http://localhost:3000", self.project.path())
    }
}

fn record(key: &str, value: &str) -> FixtureRecord {
    let mut record = FixtureRecord::new();
    record.insert(key.to_string(), json!(value));
    record
}

fn product_fixtures() -> FixtureConfig {
    let mut config = FixtureConfig::default();
    config.dynamic_routes.insert(
        "/product/$slug".to_string(),
        vec![record("slug", "laptop"), record("slug", "mouse")],
    );
    config
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_dynamic_route_expands_per_fixture_and_viewport() {
    let manifest = json!({
        "pagesRoutes": [{"path": "/product/$slug", "isDynamic": true, "parameters": ["slug"]}]
    });
    let harness = Harness::new(manifest, product_fixtures(), RecordingBrowser::default());

    let result = harness
        .service
        .capture_routes(&harness.request().with_router_type("pages"))
        .await
        .unwrap();

    let names: Vec<String> = result.screenshots.iter().map(|s| file_name(&s.file_path)).collect();
    assert_eq!(
        names,
        vec![
            "product_laptop_mobile.png",
            "product_laptop_desktop.png",
            "product_mouse_mobile.png",
            "product_mouse_desktop.png",
        ]
    );
    assert_eq!(result.total_routes, 1);
    assert_eq!(result.total_screenshots, 4);

    let urls: Vec<String> = harness.browser.shots().into_iter().map(|s| s.url).collect();
    assert_eq!(urls[0], "http://localhost:3000/product/laptop");
    assert_eq!(urls[3], "http://localhost:3000/product/mouse");
    assert!(harness.project.path().join(".routeshot/screenshots").is_dir());
}

#[tokio::test]
async fn test_total_screenshots_is_instances_times_viewports() {
    let manifest = json!({
        "appRoutes": [
            {"path": "/", "isDynamic": false},
            {"path": "/about", "isDynamic": false}
        ],
        "pagesRoutes": [
            {"path": "/blog/[slug]", "isDynamic": true, "parameters": ["slug"]},
            {"path": "/tags/[tag]", "isDynamic": true, "parameters": ["tag"]}
        ]
    });
    let mut fixtures = FixtureConfig::default();
    fixtures.dynamic_routes.insert(
        "/blog/[slug]".to_string(),
        vec![record("slug", "a"), record("slug", "b"), record("slug", "c")],
    );
    let harness = Harness::new(manifest, fixtures, RecordingBrowser::default());

    let result = harness.service.capture_routes(&harness.request()).await.unwrap();

    assert_eq!(result.total_routes, 4);
    assert_eq!(result.total_screenshots, 10);
    assert_eq!(harness.browser.calls(), 10);
    assert_eq!(result.screenshots[0].route, "/");
    assert_eq!(file_name(&result.screenshots[0].file_path), "index_mobile.png");
    assert_eq!(result.screenshots[9].route, "/blog/c");
    assert!(result
        .fixture_injection_log
        .iter()
        .any(|line| line.starts_with("Skipped /tags/[tag]")));
}

fn two_viewports() -> Vec<ViewportConfig> {
    vec![
        ViewportConfig::new("mobile", 375, 667),
        ViewportConfig::new("desktop", 1440, 900),
    ]
}

#[tokio::test]
async fn test_concurrent_shots_keep_job_order() {
    let manifest = json!({
        "appRoutes": [
            {"path": "/", "isDynamic": false},
            {"path": "/about", "isDynamic": false}
        ],
        "pagesRoutes": [{"path": "/product/$slug", "isDynamic": true, "parameters": ["slug"]}]
    });
    let harness = Harness::with_options(
        manifest,
        product_fixtures(),
        RecordingBrowser::staggered(8),
        CaptureOptions {
            viewports: two_viewports(),
            concurrency: 3,
            ..CaptureOptions::default()
        },
    );

    let result = harness.service.capture_routes(&harness.request()).await.unwrap();

    let routes: Vec<&str> = result.screenshots.iter().map(|s| s.route.as_str()).collect();
    assert_eq!(
        routes,
        vec![
            "/", "/", "/about", "/about", "/product/laptop", "/product/laptop", "/product/mouse",
            "/product/mouse",
        ]
    );
    let names: Vec<String> = result.screenshots.iter().map(|s| file_name(&s.file_path)).collect();
    assert_eq!(
        names,
        vec![
            "index_mobile.png",
            "index_desktop.png",
            "about_mobile.png",
            "about_desktop.png",
            "product_laptop_mobile.png",
            "product_laptop_desktop.png",
            "product_mouse_mobile.png",
            "product_mouse_desktop.png",
        ]
    );
    let viewports: Vec<&str> = result.screenshots.iter().map(|s| s.viewport.as_str()).collect();
    assert_eq!(viewports[..2], ["mobile", "desktop"]);

    // The browser saw the shots complete out of order
    let started: Vec<String> = harness
        .browser
        .shots()
        .into_iter()
        .map(|s| s.output_path.display().to_string())
        .collect();
    let finished = harness.browser.finished();
    assert_eq!(finished.len(), 8);
    assert_ne!(finished, started);
}

#[tokio::test]
async fn test_connection_failure_on_first_shot_starts_nothing_else() {
    let manifest = json!({"appRoutes": [
        {"path": "/", "isDynamic": false},
        {"path": "/a", "isDynamic": false}
    ]});
    let browser = RecordingBrowser::failing_at(1, || {
        BrowserError::Unreachable("net::ERR_CONNECTION_REFUSED".to_string())
    });
    let harness = Harness::with_options(
        manifest,
        FixtureConfig::default(),
        browser,
        CaptureOptions {
            viewports: two_viewports(),
            concurrency: 4,
            ..CaptureOptions::default()
        },
    );

    let err = harness.service.capture_routes(&harness.request()).await.unwrap_err();

    assert!(matches!(err, Error::Connection { ref url, .. } if url == "http://localhost:3000/"));
    assert_eq!(harness.browser.calls(), 1);
}

#[tokio::test]
async fn test_bogus_auth_state_fails_before_navigation() {
    let manifest = json!({"appRoutes": [{"path": "/", "isDynamic": false}]});
    let harness = Harness::new(manifest, FixtureConfig::default(), RecordingBrowser::default());

    let err = harness
        .service
        .capture_routes(&harness.request().with_auth_state("bogus"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidAuthState(ref v) if v == "bogus"));
    assert_eq!(harness.browser.calls(), 0);
    assert!(!harness.project.path().join(".routeshot/screenshots").exists());
}

#[tokio::test]
async fn test_connection_failure_aborts_run() {
    let manifest = json!({
        "pagesRoutes": [{"path": "/product/$slug", "isDynamic": true, "parameters": ["slug"]}]
    });
    let browser = RecordingBrowser::failing_at(1, || {
        BrowserError::Unreachable("net::ERR_CONNECTION_REFUSED".to_string())
    });
    let harness = Harness::new(manifest, product_fixtures(), browser);

    let err = harness.service.capture_routes(&harness.request()).await.unwrap_err();

    assert!(matches!(err, Error::Connection { ref url, .. } if url == "http://localhost:3000/product/laptop"));
    assert_eq!(harness.browser.calls(), 1);
}

#[tokio::test]
async fn test_other_failure_names_route_and_viewport() {
    let manifest = json!({"appRoutes": [
        {"path": "/", "isDynamic": false},
        {"path": "/pricing", "isDynamic": false}
    ]});
    let browser =
        RecordingBrowser::failing_at(4, || BrowserError::Failed("screenshot crashed".to_string()));
    let harness = Harness::new(manifest, FixtureConfig::default(), browser);

    let err = harness.service.capture_routes(&harness.request()).await.unwrap_err();

    match err {
        Error::Capture {
            route,
            viewport,
            reason,
        } => {
            assert_eq!(route, "/pricing");
            assert_eq!(viewport, "desktop");
            assert!(reason.contains("screenshot crashed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.browser.calls(), 4);
}

#[tokio::test]
async fn test_global_state_only_when_requested() {
    let manifest = json!({"appRoutes": [{"path": "/", "isDynamic": false}]});
    let mut fixtures = FixtureConfig::default();
    fixtures.auth = AuthFixtures {
        authenticated: Some(json!({"token": "t-1"}).as_object().unwrap().clone()),
        unauthenticated: None,
    };
    fixtures.global_state = Some(json!({"theme": "dark"}).as_object().unwrap().clone());

    let harness = Harness::with_viewports(
        manifest,
        fixtures,
        RecordingBrowser::default(),
        vec![ViewportConfig::new("desktop", 1440, 900)],
    );

    let without = harness
        .service
        .capture_routes(&harness.request().with_auth_state("authenticated"))
        .await
        .unwrap();
    assert!(without.injected_fixtures.auth.is_some());
    assert!(without.injected_fixtures.global_state.is_none());

    let with = harness
        .service
        .capture_routes(
            &harness
                .request()
                .with_auth_state("authenticated")
                .with_global_state(true),
        )
        .await
        .unwrap();
    assert_eq!(with.injected_fixtures.global_state.as_ref().unwrap()["theme"], "dark");

    let shots = harness.browser.shots();
    assert!(shots[0].global_state.is_none());
    assert!(shots[1].global_state.is_some());
    assert_eq!(shots[1].auth_fixture.as_ref().unwrap()["token"], "t-1");
}

#[tokio::test]
async fn test_missing_manifest_is_discovery_error() {
    let project = TempDir::new().unwrap();
    let storage = Arc::new(MemoryStorage::new());
    let browser = Arc::new(RecordingBrowser::default());
    let service = ScreenshotCaptureService::new(
        Arc::new(ManifestRouteDiscovery::new(storage.clone())),
        browser.clone(),
        Arc::new(DefaultRequestValidator),
        Arc::new(FixtureManager::new(storage)),
    );

    let err = service
        .capture_routes(&CaptureRequest::new("http://localhost:3000", project.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RouteDiscovery(_)));
    assert_eq!(browser.calls(), 0);
}
