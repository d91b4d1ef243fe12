//! Structural validation of fixture configuration documents

use serde::Serialize;
use serde_json::{Map, Value};

/// Outcome of validating a fixture document. Never an error in itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            violations: Vec::new(),
        }
    }

    pub fn from_violations(violations: Vec<String>) -> Self {
        if violations.is_empty() {
            return Self::ok();
        }
        Self {
            success: false,
            error: Some(violations.join("; ")),
            violations,
        }
    }
}

/// Validation strategy used by the fixture manager
pub trait FixtureValidator: Send + Sync {
    fn validate(&self, document: &Value) -> ValidationOutcome;
}

/// Checks the document shape field by field, reporting every violation
/// with its path.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl FixtureValidator for SchemaValidator {
    fn validate(&self, document: &Value) -> ValidationOutcome {
        let mut violations = Vec::new();

        match document.as_object() {
            Some(root) => {
                check_auth(root.get("auth"), &mut violations);
                check_dynamic_routes(root.get("dynamicRoutes"), &mut violations);
                check_global_state(root.get("globalState"), &mut violations);
            }
            None => violations.push(format!("<root>: expected an object, found {}", kind(document))),
        }

        ValidationOutcome::from_violations(violations)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn check_auth(auth: Option<&Value>, violations: &mut Vec<String>) {
    let auth = match auth {
        Some(Value::Object(auth)) => auth,
        Some(other) => {
            violations.push(format!("auth: expected an object, found {}", kind(other)));
            return;
        }
        None => {
            violations.push("auth: missing".to_string());
            return;
        }
    };

    match auth.get("authenticated") {
        Some(Value::Null | Value::Object(_)) => {}
        Some(other) => violations.push(format!(
            "auth.authenticated: expected an object or null, found {}",
            kind(other)
        )),
        None => violations.push("auth.authenticated: missing".to_string()),
    }

    match auth.get("unauthenticated") {
        Some(Value::Null) => {}
        Some(other) => violations.push(format!(
            "auth.unauthenticated: expected null, found {}",
            kind(other)
        )),
        None => violations.push("auth.unauthenticated: missing".to_string()),
    }
}

fn check_dynamic_routes(routes: Option<&Value>, violations: &mut Vec<String>) {
    let routes = match routes {
        Some(Value::Object(routes)) => routes,
        Some(other) => {
            violations.push(format!("dynamicRoutes: expected an object, found {}", kind(other)));
            return;
        }
        None => {
            violations.push("dynamicRoutes: missing".to_string());
            return;
        }
    };

    for (pattern, records) in routes {
        let Some(records) = records.as_array() else {
            violations.push(format!(
                "dynamicRoutes[{:?}]: expected an array, found {}",
                pattern,
                kind(records)
            ));
            continue;
        };

        for (index, record) in records.iter().enumerate() {
            let Some(record) = record.as_object() else {
                violations.push(format!(
                    "dynamicRoutes[{:?}][{}]: expected an object, found {}",
                    pattern,
                    index,
                    kind(record)
                ));
                continue;
            };
            for (key, value) in record {
                if !is_scalar(value) {
                    violations.push(format!(
                        "dynamicRoutes[{:?}][{}].{}: expected a string, number or boolean, found {}",
                        pattern,
                        index,
                        key,
                        kind(value)
                    ));
                }
            }
        }
    }
}

fn check_global_state(state: Option<&Value>, violations: &mut Vec<String>) {
    let state: &Map<String, Value> = match state {
        None | Some(Value::Null) => return,
        Some(Value::Object(state)) => state,
        Some(other) => {
            violations.push(format!("globalState: expected an object, found {}", kind(other)));
            return;
        }
    };

    for (key, value) in state {
        match value {
            Value::Null => {}
            v if is_scalar(v) => {}
            Value::Object(flags) => {
                for (flag, enabled) in flags {
                    if !enabled.is_boolean() {
                        violations.push(format!(
                            "globalState.{}.{}: expected a boolean, found {}",
                            key,
                            flag,
                            kind(enabled)
                        ));
                    }
                }
            }
            other => violations.push(format!(
                "globalState.{}: expected a primitive or a map of booleans, found {}",
                key,
                kind(other)
            )),
        }
    }
}
