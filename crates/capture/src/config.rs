//! Project configuration (`routeshot.toml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use routeshot_common::{default_viewports, Error, Result, RouterType, ViewportConfig, DEFAULT_DATA_DIR};

use crate::browser::{Engine, PlaywrightConfig};
use crate::capture::CaptureOptions;

/// File name looked up at the project root
pub const CONFIG_FILE_NAME: &str = "routeshot.toml";

/// Project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Base URL of the running application
    pub app_url: String,

    /// Routing convention used by the project
    pub router_type: RouterType,

    /// Directory for routeshot's documents, relative to the project root
    pub data_dir: PathBuf,

    pub viewports: Vec<ViewportConfig>,

    pub capture: CaptureSettings,

    pub browser: BrowserSettings,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:3000".to_string(),
            router_type: RouterType::App,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            viewports: default_viewports(),
            capture: CaptureSettings::default(),
            browser: BrowserSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Shots in flight at once
    pub concurrency: usize,

    /// Inject the fixture global state bag by default
    pub include_global_state: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            include_global_state: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub engine: Engine,
    pub headless: bool,
    pub node_binary: PathBuf,
    pub navigation_timeout_ms: u64,
    pub launch_timeout_secs: u64,
    pub auth_storage_key: String,
    pub global_state_storage_key: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        let defaults = PlaywrightConfig::default();
        Self {
            engine: defaults.engine,
            headless: defaults.headless,
            node_binary: defaults.node_binary,
            navigation_timeout_ms: defaults.navigation_timeout_ms,
            launch_timeout_secs: defaults.launch_timeout.as_secs(),
            auth_storage_key: defaults.auth_storage_key,
            global_state_storage_key: defaults.global_state_storage_key,
        }
    }
}

impl ProjectConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
            config.check()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.viewports.is_empty() {
            return Err(Error::InvalidConfig("at least one viewport is required".to_string()));
        }
        if let Some(viewport) = self.viewports.iter().find(|v| v.width == 0 || v.height == 0) {
            return Err(Error::InvalidConfig(format!(
                "viewport '{}' must have a non-zero size",
                viewport.name
            )));
        }
        if self.capture.concurrency == 0 {
            return Err(Error::InvalidConfig("capture.concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Get the data directory for a project
    pub fn data_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.data_dir)
    }

    pub fn fixtures_path(&self, project_root: &Path) -> PathBuf {
        self.data_dir(project_root).join("fixtures.json")
    }

    pub fn manifest_path(&self, project_root: &Path) -> PathBuf {
        self.data_dir(project_root).join("routes.json")
    }

    pub fn workflow_path(&self, project_root: &Path) -> PathBuf {
        self.data_dir(project_root).join("workflow-state.json")
    }

    pub fn annotations_path(&self, project_root: &Path) -> PathBuf {
        self.data_dir(project_root).join("annotations.json")
    }

    /// Screenshot directory relative to the project root
    pub fn screenshots_dir(&self) -> PathBuf {
        self.data_dir.join("screenshots")
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            output_dir: self.screenshots_dir(),
            viewports: self.viewports.clone(),
            concurrency: self.capture.concurrency,
        }
    }

    pub fn playwright_config(&self, project_root: &Path) -> PlaywrightConfig {
        PlaywrightConfig {
            node_binary: self.browser.node_binary.clone(),
            working_dir: project_root.to_path_buf(),
            engine: self.browser.engine,
            headless: self.browser.headless,
            navigation_timeout_ms: self.browser.navigation_timeout_ms,
            launch_timeout: Duration::from_secs(self.browser.launch_timeout_secs),
            auth_storage_key: self.browser.auth_storage_key.clone(),
            global_state_storage_key: self.browser.global_state_storage_key.clone(),
        }
    }
}
