//! Route manifest: the previously generated route list the capture service
//! reads instead of parsing files live

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use routeshot_common::{Error, Result, RouteDescriptor, RouterType, Storage, DEFAULT_DATA_DIR};

use crate::routes::discover_project_routes;

/// Manifest location relative to the project root
pub fn default_manifest_path() -> PathBuf {
    Path::new(DEFAULT_DATA_DIR).join("routes.json")
}

/// One route list per routing-convention flavor in use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_routes: Option<Vec<RouteDescriptor>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_routes: Option<Vec<RouteDescriptor>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl RouteManifest {
    /// Scan a project with every convention, keeping the flavors that
    /// found at least one route.
    pub fn scan(project_root: &Path) -> Self {
        let mut manifest = Self {
            generated_at: Some(Utc::now()),
            ..Self::default()
        };

        for router_type in RouterType::ALL {
            let routes = discover_project_routes(project_root, router_type);
            if routes.is_empty() {
                continue;
            }
            info!("Found {} {} route(s)", routes.len(), router_type);
            *manifest.flavor_mut(router_type) = Some(routes);
        }

        manifest
    }

    pub fn flavor(&self, router_type: RouterType) -> Option<&[RouteDescriptor]> {
        match router_type {
            RouterType::App => self.app_routes.as_deref(),
            RouterType::Pages => self.pages_routes.as_deref(),
        }
    }

    fn flavor_mut(&mut self, router_type: RouterType) -> &mut Option<Vec<RouteDescriptor>> {
        match router_type {
            RouterType::App => &mut self.app_routes,
            RouterType::Pages => &mut self.pages_routes,
        }
    }

    /// Every present flavor concatenated, app routes first.
    pub fn routes(&self) -> Vec<RouteDescriptor> {
        RouterType::ALL
            .into_iter()
            .filter_map(|router_type| self.flavor(router_type))
            .flat_map(|routes| routes.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        RouterType::ALL
            .into_iter()
            .all(|router_type| self.flavor(router_type).map_or(true, |r| r.is_empty()))
    }

    pub async fn load(storage: &dyn Storage, path: &Path) -> Result<Self> {
        if !storage.exists(path).await {
            return Err(Error::RouteDiscovery(format!(
                "route manifest not found at {}",
                path.display()
            )));
        }

        let raw = storage
            .read(path)
            .await
            .map_err(|e| Error::RouteDiscovery(format!("cannot read {}: {}", path.display(), e)))?;

        serde_json::from_str(&raw)
            .map_err(|e| Error::RouteDiscovery(format!("malformed manifest {}: {}", path.display(), e)))
    }

    pub async fn save(&self, storage: &dyn Storage, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        storage.write(path, &json).await?;
        info!("Route manifest written to {}", path.display());
        Ok(())
    }
}

/// Where the capture service gets its candidate routes
#[async_trait]
pub trait RouteDiscoveryPort: Send + Sync {
    async fn discover(&self, project_path: &Path) -> Result<Vec<RouteDescriptor>>;
}

/// Reads the route manifest from the project through the storage port
pub struct ManifestRouteDiscovery {
    storage: Arc<dyn Storage>,
    manifest_path: PathBuf,
}

impl ManifestRouteDiscovery {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            manifest_path: default_manifest_path(),
        }
    }

    /// Relative paths resolve against the project root.
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }
}

#[async_trait]
impl RouteDiscoveryPort for ManifestRouteDiscovery {
    async fn discover(&self, project_path: &Path) -> Result<Vec<RouteDescriptor>> {
        let path = project_path.join(&self.manifest_path);
        let manifest = RouteManifest::load(self.storage.as_ref(), &path).await?;

        if manifest.is_empty() {
            warn!("Route manifest {} lists no routes", path.display());
        }

        let routes = manifest.routes();
        debug!("Manifest {} yielded {} route(s)", path.display(), routes.len());
        Ok(routes)
    }
}
