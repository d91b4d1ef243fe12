//! Nested-directory convention: `app/<segments>/page.<ext>`

use routeshot_common::{RouteDescriptor, RouterType};

use super::{
    describe, is_reserved_segment, join_route, normalize_separators, split_route_file,
    RouteDiscovery,
};

const ROOTS: &[&str] = &["src/app/", "app/"];

/// The file that marks a directory as a route
const MARKER_FILE: &str = "page";

#[derive(Debug, Clone, Copy, Default)]
pub struct AppRouterDiscovery;

impl AppRouterDiscovery {
    /// `(marketing)` groups organise files without appearing in the URL.
    fn is_route_group(segment: &str) -> bool {
        segment.starts_with('(') && segment.ends_with(')')
    }

    /// Directories whose pages never render as standalone routes: API
    /// handlers, `_private` folders and `@slot` parallel routes.
    fn is_excluded_dir(segment: &str) -> bool {
        segment == "api"
            || segment.starts_with('_')
            || segment.starts_with('@')
            || is_reserved_segment(segment)
    }
}

impl RouteDiscovery for AppRouterDiscovery {
    fn router_type(&self) -> RouterType {
        RouterType::App
    }

    fn roots(&self) -> &'static [&'static str] {
        ROOTS
    }

    fn is_valid_route(&self, path: &str) -> bool {
        let path = normalize_separators(path);
        match split_route_file(&path, ROOTS) {
            Some(file) => {
                file.stem == MARKER_FILE
                    && !file.dirs.iter().any(|d| Self::is_excluded_dir(d))
            }
            None => false,
        }
    }

    fn parse_route_path(&self, path: &str) -> RouteDescriptor {
        let path = normalize_separators(path);
        let segments: Vec<&str> = split_route_file(&path, ROOTS)
            .map(|file| {
                file.dirs
                    .into_iter()
                    .filter(|d| !Self::is_route_group(d))
                    .collect()
            })
            .unwrap_or_default();
        describe(join_route(&segments))
    }
}
