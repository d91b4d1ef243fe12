//! Route discovery from file-based routing conventions
//!
//! Each convention turns a flat list of project-relative route file paths
//! into [`RouteDescriptor`]s. The convention is chosen by [`RouterType`] tag
//! through [`Discovery`], never by looking at the files.

pub mod app;
pub mod pages;
pub mod pattern;
pub mod scan;

use std::collections::HashSet;

use routeshot_common::{RouteDescriptor, RouterType, RESERVED_UI_SEGMENT};

pub use app::AppRouterDiscovery;
pub use pages::PagesRouterDiscovery;
pub use scan::{discover_project_routes, scan_route_files};

/// Source extensions that can define a route
pub const ROUTE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "mdx", "md"];

/// Contract shared by both routing conventions
pub trait RouteDiscovery: Send + Sync {
    fn router_type(&self) -> RouterType;

    /// Directories, relative to the project root, that hold route files.
    /// Longer prefixes come first so `src/app/` wins over `app/`.
    fn roots(&self) -> &'static [&'static str];

    fn is_valid_route(&self, path: &str) -> bool;

    fn parse_route_path(&self, path: &str) -> RouteDescriptor;

    /// Valid paths converted in input order; a route reached by two files
    /// (e.g. `page.tsx` and `page.mdx`) is kept once.
    fn discover_routes(&self, paths: &[String]) -> Vec<RouteDescriptor> {
        let mut seen = HashSet::new();
        paths
            .iter()
            .filter(|path| self.is_valid_route(path))
            .map(|path| self.parse_route_path(path))
            .filter(|route| seen.insert(route.path.clone()))
            .collect()
    }
}

/// Tagged dispatch over the two conventions
#[derive(Debug, Clone, Copy)]
pub enum Discovery {
    App(AppRouterDiscovery),
    Pages(PagesRouterDiscovery),
}

impl Discovery {
    pub fn for_router(router_type: RouterType) -> Self {
        match router_type {
            RouterType::App => Discovery::App(AppRouterDiscovery),
            RouterType::Pages => Discovery::Pages(PagesRouterDiscovery),
        }
    }

    fn inner(&self) -> &dyn RouteDiscovery {
        match self {
            Discovery::App(d) => d,
            Discovery::Pages(d) => d,
        }
    }
}

impl RouteDiscovery for Discovery {
    fn router_type(&self) -> RouterType {
        self.inner().router_type()
    }

    fn roots(&self) -> &'static [&'static str] {
        self.inner().roots()
    }

    fn is_valid_route(&self, path: &str) -> bool {
        self.inner().is_valid_route(path)
    }

    fn parse_route_path(&self, path: &str) -> RouteDescriptor {
        self.inner().parse_route_path(path)
    }

    fn discover_routes(&self, paths: &[String]) -> Vec<RouteDescriptor> {
        self.inner().discover_routes(paths)
    }
}

/// A route file path split into directory segments and file stem
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RouteFile<'a> {
    pub dirs: Vec<&'a str>,
    pub stem: &'a str,
}

/// Strip the routing root and extension. `None` when the file is outside
/// every root or does not have a route extension.
pub(crate) fn split_route_file<'a>(path: &'a str, roots: &[&str]) -> Option<RouteFile<'a>> {
    let path = path.trim_start_matches("./").trim_start_matches('/');
    let relative = roots
        .iter()
        .find_map(|root| path.strip_prefix(root))?;

    let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    let file = segments.pop()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if !ROUTE_EXTENSIONS.contains(&ext) || stem.is_empty() {
        return None;
    }

    Some(RouteFile {
        dirs: segments,
        stem,
    })
}

/// Test, story and spec files live next to routes in both conventions.
pub(crate) fn is_auxiliary_stem(stem: &str) -> bool {
    [".test", ".spec", ".stories"]
        .iter()
        .any(|suffix| stem.ends_with(suffix))
}

pub(crate) fn is_reserved_segment(segment: &str) -> bool {
    segment.starts_with(RESERVED_UI_SEGMENT)
}

pub(crate) fn join_route(segments: &[&str]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

pub(crate) fn describe(path: String) -> RouteDescriptor {
    if pattern::is_dynamic(&path) {
        let parameters = pattern::parameters(&path);
        RouteDescriptor::dynamic_route(path, parameters)
    } else {
        RouteDescriptor::static_route(path)
    }
}

/// Normalise Windows separators before parsing.
pub(crate) fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
