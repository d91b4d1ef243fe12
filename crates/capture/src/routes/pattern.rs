//! Dynamic segment markers
//!
//! Three marker families can appear in a route pattern, in any mix:
//!
//! ```text
//! [name]        single parameter
//! [...name]     catch-all, one value spanning any number of segments
//! [[...name]]   optional catch-all
//! $name         sigil parameter
//! ```

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use routeshot_common::FixtureRecord;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[\[\.\.\.(?P<optional>[^\[\]/]+)\]\]|\[\.\.\.(?P<catchall>[^\[\]/]+)\]|\[(?P<param>[^\[\]/]+)\]|\$(?P<sigil>[A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("marker pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Param,
    CatchAll,
    OptionalCatchAll,
    Sigil,
}

/// One marker found in a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub name: String,
}

impl Marker {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let (kind, name) = if let Some(m) = caps.name("optional") {
            (MarkerKind::OptionalCatchAll, m)
        } else if let Some(m) = caps.name("catchall") {
            (MarkerKind::CatchAll, m)
        } else if let Some(m) = caps.name("param") {
            (MarkerKind::Param, m)
        } else {
            (MarkerKind::Sigil, caps.name("sigil")?)
        };
        Some(Self {
            kind,
            name: name.as_str().to_string(),
        })
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self.kind, MarkerKind::CatchAll | MarkerKind::OptionalCatchAll)
    }
}

/// All markers in `pattern`, in order of appearance.
pub fn markers(pattern: &str) -> Vec<Marker> {
    MARKER
        .captures_iter(pattern)
        .filter_map(|caps| Marker::from_captures(&caps))
        .collect()
}

pub fn is_dynamic(pattern: &str) -> bool {
    MARKER.is_match(pattern)
}

/// Parameter names with catch-all prefixes stripped.
pub fn parameters(pattern: &str) -> Vec<String> {
    markers(pattern).into_iter().map(|m| m.name).collect()
}

/// Replace every marker that `record` has a key for. Markers without a
/// matching key are left as written.
pub fn substitute(pattern: &str, record: &FixtureRecord) -> String {
    MARKER
        .replace_all(pattern, |caps: &Captures<'_>| {
            Marker::from_captures(caps)
                .and_then(|marker| record.get(&marker.name))
                .and_then(scalar_to_string)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> FixtureRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_static_pattern_has_no_markers() {
        assert!(!is_dynamic("/about/team"));
        assert!(parameters("/about/team").is_empty());
    }

    #[test]
    fn test_marker_families() {
        let found = markers("/shop/[category]/$slug/[...rest]");
        assert_eq!(
            found,
            vec![
                Marker { kind: MarkerKind::Param, name: "category".into() },
                Marker { kind: MarkerKind::Sigil, name: "slug".into() },
                Marker { kind: MarkerKind::CatchAll, name: "rest".into() },
            ]
        );
        assert_eq!(parameters("/docs/[[...path]]"), vec!["path".to_string()]);
        assert!(markers("/docs/[[...path]]")[0].is_catch_all());
    }

    #[test]
    fn test_substitute_mixed_families() {
        let rec = record(&[("category", json!("audio")), ("slug", json!("headphones"))]);
        assert_eq!(
            substitute("/shop/[category]/$slug", &rec),
            "/shop/audio/headphones"
        );
    }

    #[test]
    fn test_catch_all_is_one_token() {
        let rec = record(&[("slug", json!("guides/getting-started"))]);
        assert_eq!(
            substitute("/docs/[...slug]", &rec),
            "/docs/guides/getting-started"
        );
    }

    #[test]
    fn test_missing_key_left_unsubstituted() {
        let rec = record(&[("id", json!(42))]);
        assert_eq!(
            substitute("/users/[id]/posts/[postId]", &rec),
            "/users/42/posts/[postId]"
        );
    }

    #[test]
    fn test_non_scalar_value_left_unsubstituted() {
        let rec = record(&[("id", json!({ "nested": true }))]);
        assert_eq!(substitute("/users/$id", &rec), "/users/$id");
    }
}
