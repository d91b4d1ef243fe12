//! File-per-route convention: `pages/<segments>/<name>.<ext>`, with
//! `index` files standing for their directory.
//!
//! Covers both the bracket-marker (`pages/`) and sigil-marker (`routes/`)
//! flavors; the marker family is decided per segment, not per project.

use routeshot_common::{RouteDescriptor, RouterType};

use super::{
    describe, is_auxiliary_stem, is_reserved_segment, join_route, normalize_separators,
    split_route_file, RouteDiscovery,
};

const ROOTS: &[&str] = &["src/pages/", "pages/", "src/routes/", "routes/"];

/// The file that stands for its enclosing directory
const MARKER_FILE: &str = "index";

#[derive(Debug, Clone, Copy, Default)]
pub struct PagesRouterDiscovery;

impl PagesRouterDiscovery {
    /// `_app`, `_document`, `_error`, `__root` and any other
    /// underscore-prefixed entry are framework shells, not routes.
    fn is_excluded_segment(segment: &str) -> bool {
        segment == "api" || segment.starts_with('_') || is_reserved_segment(segment)
    }
}

impl RouteDiscovery for PagesRouterDiscovery {
    fn router_type(&self) -> RouterType {
        RouterType::Pages
    }

    fn roots(&self) -> &'static [&'static str] {
        ROOTS
    }

    fn is_valid_route(&self, path: &str) -> bool {
        let path = normalize_separators(path);
        match split_route_file(&path, ROOTS) {
            Some(file) => {
                !is_auxiliary_stem(file.stem)
                    && !Self::is_excluded_segment(file.stem)
                    && !file.dirs.iter().any(|d| Self::is_excluded_segment(d))
            }
            None => false,
        }
    }

    fn parse_route_path(&self, path: &str) -> RouteDescriptor {
        let path = normalize_separators(path);
        let segments: Vec<&str> = split_route_file(&path, ROOTS)
            .map(|file| {
                let mut segments = file.dirs;
                if file.stem != MARKER_FILE {
                    segments.push(file.stem);
                }
                segments
            })
            .unwrap_or_default();
        describe(join_route(&segments))
    }
}
