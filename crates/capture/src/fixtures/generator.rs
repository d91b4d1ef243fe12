//! Route-instance generation from a pattern and its fixture records

use routeshot_common::FixtureRecord;

use crate::routes::pattern;

/// Expansion strategy used by the fixture manager
pub trait InstanceGenerator: Send + Sync {
    /// Concrete paths for `pattern`, one per record, in record order.
    fn generate(&self, pattern: &str, records: &[FixtureRecord]) -> Vec<String>;
}

/// Substitutes record values into the pattern's markers.
///
/// A static pattern is its own single instance. A dynamic pattern with no
/// records has no instances: nobody can render it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternInstanceGenerator;

impl InstanceGenerator for PatternInstanceGenerator {
    fn generate(&self, route_pattern: &str, records: &[FixtureRecord]) -> Vec<String> {
        if !pattern::is_dynamic(route_pattern) {
            return vec![route_pattern.to_string()];
        }

        records
            .iter()
            .map(|record| pattern::substitute(route_pattern, record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: &[(&str, &str)]) -> Vec<FixtureRecord> {
        values
            .iter()
            .map(|(k, v)| FixtureRecord::from([(k.to_string(), json!(v))]))
            .collect()
    }

    #[test]
    fn test_static_pattern_ignores_records() {
        let generated = PatternInstanceGenerator.generate("/about", &records(&[("slug", "x")]));
        assert_eq!(generated, vec!["/about".to_string()]);
    }

    #[test]
    fn test_dynamic_without_records() {
        assert!(PatternInstanceGenerator.generate("/blog/[slug]", &[]).is_empty());
    }

    #[test]
    fn test_record_order_preserved() {
        let generated = PatternInstanceGenerator.generate(
            "/product/$slug",
            &records(&[("slug", "mouse"), ("slug", "laptop"), ("slug", "desk")]),
        );
        assert_eq!(
            generated,
            vec!["/product/mouse", "/product/laptop", "/product/desk"]
        );
    }
}
