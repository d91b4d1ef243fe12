//! Core types for routeshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// One discovered route file, as a canonical URL pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    pub path: String,
    pub is_dynamic: bool,
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl RouteDescriptor {
    pub fn static_route(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dynamic: false,
            parameters: Vec::new(),
        }
    }

    pub fn dynamic_route(path: impl Into<String>, parameters: Vec<String>) -> Self {
        Self {
            path: path.into(),
            is_dynamic: true,
            parameters,
        }
    }
}

/// File-based routing convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterType {
    /// Nested directories with a `page` file per route
    App,
    /// One file per route, `index` files for directory roots
    Pages,
}

impl RouterType {
    pub const ALL: [RouterType; 2] = [RouterType::App, RouterType::Pages];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouterType::App => "app",
            RouterType::Pages => "pages",
        }
    }
}

impl std::fmt::Display for RouterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" => Ok(RouterType::App),
            "pages" => Ok(RouterType::Pages),
            other => Err(Error::InvalidRouterType(other.to_string())),
        }
    }
}

/// Authentication state a capture runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Authenticated,
    Unauthenticated,
}

impl AuthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Authenticated => "authenticated",
            AuthState::Unauthenticated => "unauthenticated",
        }
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authenticated" => Ok(AuthState::Authenticated),
            "unauthenticated" => Ok(AuthState::Unauthenticated),
            other => Err(Error::InvalidAuthState(other.to_string())),
        }
    }
}

/// Flat map of parameter name to scalar value
pub type FixtureRecord = BTreeMap<String, Value>;

/// Client-side session payload for the authenticated state
pub type AuthFixture = Map<String, Value>;

/// Loosely typed application state injected next to the auth fixture
pub type GlobalState = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthFixtures {
    pub authenticated: Option<AuthFixture>,
    pub unauthenticated: Option<AuthFixture>,
}

/// Fixture configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureConfig {
    pub auth: AuthFixtures,
    #[serde(default)]
    pub dynamic_routes: BTreeMap<String, Vec<FixtureRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_state: Option<GlobalState>,
}

/// A named browser viewport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl ViewportConfig {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// The viewports used when a project does not configure its own
pub fn default_viewports() -> Vec<ViewportConfig> {
    vec![
        ViewportConfig::new("mobile", 375, 667),
        ViewportConfig::new("tablet", 768, 1024),
        ViewportConfig::new("desktop", 1440, 900),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A caller's request to capture every route of a project.
///
/// `router_type` and `auth_state` are kept as the caller supplied them;
/// the request validator turns them into [`RouterType`] and [`AuthState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub app_url: String,
    pub project_path: PathBuf,
    pub router_type: String,
    pub auth_state: String,
    #[serde(default)]
    pub include_global_state: bool,
}

impl CaptureRequest {
    pub fn new(app_url: impl Into<String>, project_path: impl Into<PathBuf>) -> Self {
        Self {
            app_url: app_url.into(),
            project_path: project_path.into(),
            router_type: RouterType::App.to_string(),
            auth_state: AuthState::Unauthenticated.to_string(),
            include_global_state: false,
        }
    }

    pub fn with_router_type(mut self, router_type: impl Into<String>) -> Self {
        self.router_type = router_type.into();
        self
    }

    pub fn with_auth_state(mut self, auth_state: impl Into<String>) -> Self {
        self.auth_state = auth_state.into();
        self
    }

    pub fn with_global_state(mut self, include: bool) -> Self {
        self.include_global_state = include;
        self
    }
}

/// One screenshot written during a capture run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotResult {
    pub route: String,
    pub viewport: String,
    pub dimensions: Dimensions,
    pub file_path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

/// Fixtures resolved once per capture request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectedFixtures {
    pub auth: Option<AuthFixture>,
    pub global_state: Option<GlobalState>,
}

/// Aggregate result of a successful capture run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub screenshots: Vec<ScreenshotResult>,
    pub injected_fixtures: InjectedFixtures,
    pub fixture_injection_log: Vec<String>,
    pub total_routes: usize,
    pub total_screenshots: usize,
}

/// Review lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowState {
    #[default]
    InDevelopment,
    ReviewsRequested,
    InReview,
    SubmittedForDevelopment,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 4] = [
        WorkflowState::InDevelopment,
        WorkflowState::ReviewsRequested,
        WorkflowState::InReview,
        WorkflowState::SubmittedForDevelopment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::InDevelopment => "in-development",
            WorkflowState::ReviewsRequested => "reviews-requested",
            WorkflowState::InReview => "in-review",
            WorkflowState::SubmittedForDevelopment => "submitted-for-development",
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<WorkflowState> {
        match self {
            WorkflowState::InDevelopment => Some(WorkflowState::ReviewsRequested),
            WorkflowState::ReviewsRequested => Some(WorkflowState::InReview),
            WorkflowState::InReview => Some(WorkflowState::SubmittedForDevelopment),
            WorkflowState::SubmittedForDevelopment => None,
        }
    }

    /// Whether a capture run may replace the screenshots in this stage.
    /// Only the developer-side stages do.
    pub fn allows_capture(&self) -> bool {
        matches!(
            self,
            WorkflowState::InDevelopment | WorkflowState::SubmittedForDevelopment
        )
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| Error::InvalidWorkflowState(s.to_string()))
    }
}

/// Persisted workflow document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStateData {
    pub state: WorkflowState,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_capture_result: Option<CaptureResult>,
}

impl WorkflowStateData {
    pub fn new(state: WorkflowState, last_capture_result: Option<CaptureResult>) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
            last_capture_result,
        }
    }
}

impl Default for WorkflowStateData {
    fn default() -> Self {
        Self::new(WorkflowState::InDevelopment, None)
    }
}

/// A reviewer note pinned to a screenshot.
///
/// Reading is lenient: numbers are accepted where text is expected and
/// numeric strings where a coordinate is. Anything else, including known
/// fields in an unexpected shape, is kept verbatim in `extra` so a read
/// followed by a write never drops it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for Annotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_fields)
    }
}

fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    let text = match fields.get(key)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    fields.remove(key);
    Some(text)
}

fn take_coordinate(fields: &mut Map<String, Value>, key: &str) -> Option<f64> {
    let coordinate = match fields.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    fields.remove(key);
    Some(coordinate)
}

fn take_timestamp(fields: &mut Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let timestamp = DateTime::parse_from_rfc3339(fields.get(key)?.as_str()?).ok()?;
    fields.remove(key);
    Some(timestamp.with_timezone(&Utc))
}

impl Annotation {
    fn from_fields(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take_text(&mut fields, "id").unwrap_or_default(),
            route: take_text(&mut fields, "route").unwrap_or_default(),
            viewport: take_text(&mut fields, "viewport"),
            x: take_coordinate(&mut fields, "x"),
            y: take_coordinate(&mut fields, "y"),
            comment: take_text(&mut fields, "comment").unwrap_or_default(),
            created_at: take_timestamp(&mut fields, "createdAt"),
            extra: fields,
        }
    }

    pub fn new(route: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            route: route.into(),
            viewport: None,
            x: None,
            y: None,
            comment: comment.into(),
            created_at: Some(Utc::now()),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closed_enums_reject_unknown_values() {
        assert!(matches!(
            "bogus".parse::<AuthState>(),
            Err(Error::InvalidAuthState(v)) if v == "bogus"
        ));
        assert!(matches!(
            "remix".parse::<RouterType>(),
            Err(Error::InvalidRouterType(_))
        ));
        assert_eq!("pages".parse::<RouterType>().unwrap(), RouterType::Pages);
    }

    #[test]
    fn test_workflow_state_wire_names() {
        for state in WorkflowState::ALL {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, json!(state.as_str()));
            assert_eq!(state.as_str().parse::<WorkflowState>().unwrap(), state);
        }
        assert_eq!(WorkflowState::SubmittedForDevelopment.next(), None);
        assert!(!WorkflowState::InReview.allows_capture());
    }

    #[test]
    fn test_fixture_config_default_document() {
        let json = serde_json::to_value(FixtureConfig::default()).unwrap();
        assert_eq!(
            json,
            json!({
                "auth": { "authenticated": null, "unauthenticated": null },
                "dynamicRoutes": {}
            })
        );
    }

    #[test]
    fn test_route_descriptor_parameters_optional() {
        let route: RouteDescriptor =
            serde_json::from_value(json!({ "path": "/about", "isDynamic": false })).unwrap();
        assert_eq!(route, RouteDescriptor::static_route("/about"));
    }

    #[test]
    fn test_annotation_keeps_unknown_fields() {
        let raw = json!({
            "id": "a1",
            "route": "/",
            "comment": "logo too small",
            "color": "#ff0000"
        });
        let annotation: Annotation = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(annotation.extra.get("color"), Some(&json!("#ff0000")));
        assert_eq!(serde_json::to_value(&annotation).unwrap(), raw);
    }

    #[test]
    fn test_annotation_reads_loose_records() {
        let annotation: Annotation = serde_json::from_value(json!({
            "id": 17,
            "x": "12.5",
            "y": 40,
            "comment": "overlaps the header",
            "createdAt": "2026-10-01T09:30:00Z"
        }))
        .unwrap();

        assert_eq!(annotation.id, "17");
        assert_eq!(annotation.route, "");
        assert_eq!(annotation.x, Some(12.5));
        assert_eq!(annotation.y, Some(40.0));
        assert_eq!(
            annotation.created_at.map(|dt| dt.to_rfc3339()),
            Some("2026-10-01T09:30:00+00:00".to_string())
        );
        assert!(annotation.extra.is_empty());
    }

    #[test]
    fn test_annotation_keeps_unexpected_shapes() {
        let raw = json!({
            "route": "/pricing",
            "x": "left",
            "viewport": { "name": "mobile" },
            "comment": "",
            "createdAt": "yesterday"
        });
        let annotation: Annotation = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(annotation.route, "/pricing");
        assert_eq!(annotation.x, None);
        assert_eq!(annotation.viewport, None);
        assert_eq!(annotation.created_at, None);
        assert_eq!(annotation.extra.get("x"), Some(&json!("left")));
        assert_eq!(serde_json::to_value(&annotation).unwrap(), raw);
    }
}
