//! Live filesystem scan for route files

use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use routeshot_common::{RouteDescriptor, RouterType};

use super::{Discovery, RouteDiscovery};

/// Directory names never worth descending into
const SKIPPED_DIRS: &[&str] = &["node_modules"];

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Collect route file candidates under the convention's roots, as
/// project-relative `/`-separated paths in sorted order.
///
/// Best effort: a root that does not exist contributes nothing and an
/// unreadable directory drops only its own subtree.
pub fn scan_route_files(project_root: &Path, router_type: RouterType) -> Vec<String> {
    let discovery = Discovery::for_router(router_type);
    let mut files = Vec::new();

    for root in discovery.roots() {
        let dir = project_root.join(root.trim_end_matches('/'));
        if !dir.is_dir() {
            continue;
        }

        debug!("Scanning {} for {} routes", dir.display(), router_type);

        for entry in WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path during route scan: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Ok(relative) = entry.path().strip_prefix(project_root) {
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    files
}

/// Scan and parse in one step.
pub fn discover_project_routes(project_root: &Path, router_type: RouterType) -> Vec<RouteDescriptor> {
    let files = scan_route_files(project_root, router_type);
    Discovery::for_router(router_type).discover_routes(&files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "export default function Page() {}").unwrap();
    }

    #[test]
    fn test_scan_app_project() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "app/page.tsx");
        touch(tmp.path(), "app/layout.tsx");
        touch(tmp.path(), "app/blog/[slug]/page.tsx");
        touch(tmp.path(), "app/about/page.tsx");
        touch(tmp.path(), "app/api/ping/route.ts");
        touch(tmp.path(), "app/node_modules/pkg/page.js");

        let routes = discover_project_routes(tmp.path(), RouterType::App);
        let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/about", "/blog/[slug]", "/"]);
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_route_files(tmp.path(), RouterType::Pages).is_empty());
    }

    #[test]
    fn test_scan_pages_project() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/routes/index.tsx");
        touch(tmp.path(), "src/routes/__root.tsx");
        touch(tmp.path(), "src/routes/product/$slug.tsx");

        let routes = discover_project_routes(tmp.path(), RouterType::Pages);
        let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/product/$slug"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "pages/index.tsx");
        touch(tmp.path(), "pages/locked/secret.tsx");
        let locked = tmp.path().join("pages/locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let files = scan_route_files(tmp.path(), RouterType::Pages);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(files.contains(&"pages/index.tsx".to_string()));
        // Root bypasses permission bits, so only assert when it applies.
        if !files.contains(&"pages/locked/secret.tsx".to_string()) {
            assert_eq!(files, vec!["pages/index.tsx".to_string()]);
        }
    }
}
