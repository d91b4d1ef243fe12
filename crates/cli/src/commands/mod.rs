//! CLI Commands

pub mod capture;
pub mod fixtures;
pub mod routes;
pub mod workflow;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use routeshot_capture::{FixtureManager, ProjectConfig, WorkflowStateManager, CONFIG_FILE_NAME};
use routeshot_common::{FsStorage, Storage};

use crate::output::OutputFormat;

/// Everything a command needs about the project it runs against
pub struct Context {
    pub project_root: PathBuf,
    pub config: ProjectConfig,
    pub format: OutputFormat,
    pub storage: Arc<dyn Storage>,
}

impl Context {
    pub fn load(project: PathBuf, config_path: Option<&Path>, format: OutputFormat) -> Result<Self> {
        let project_root = project
            .canonicalize()
            .with_context(|| format!("project directory {} not found", project.display()))?;

        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_root.join(CONFIG_FILE_NAME));
        let config = ProjectConfig::load(&config_path)?;
        debug!("Using configuration {}", config_path.display());

        Ok(Self {
            project_root,
            config,
            format,
            storage: Arc::new(FsStorage::new()),
        })
    }

    /// Fixture manager with the project's fixture document loaded
    pub async fn fixtures(&self) -> Result<Arc<FixtureManager>> {
        let manager = Arc::new(FixtureManager::new(self.storage.clone()));
        manager
            .load_fixtures(&self.config.fixtures_path(&self.project_root))
            .await?;
        Ok(manager)
    }

    pub fn workflow(&self) -> WorkflowStateManager {
        WorkflowStateManager::new(
            self.storage.clone(),
            self.config.workflow_path(&self.project_root),
            self.config.annotations_path(&self.project_root),
        )
    }

    /// Decoration lines are suppressed for JSON and YAML output.
    pub fn chatty(&self) -> bool {
        !self.format.is_structured()
    }
}
