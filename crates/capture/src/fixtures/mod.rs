//! Fixture configuration and dynamic route expansion

pub mod generator;
pub mod validator;

use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use routeshot_common::{
    AuthFixture, AuthState, Error, FixtureConfig, FixtureRecord, GlobalState, Result, Storage,
    DEFAULT_DATA_DIR,
};

pub use generator::{InstanceGenerator, PatternInstanceGenerator};
pub use validator::{FixtureValidator, SchemaValidator, ValidationOutcome};

/// Fixture document location relative to the project root
pub fn default_fixtures_path() -> PathBuf {
    Path::new(DEFAULT_DATA_DIR).join("fixtures.json")
}

/// Owns the fixture configuration for a session and expands dynamic
/// route patterns against it.
pub struct FixtureManager {
    storage: Arc<dyn Storage>,
    validator: Box<dyn FixtureValidator>,
    generator: Box<dyn InstanceGenerator>,
    config: RwLock<Option<FixtureConfig>>,
}

impl FixtureManager {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_strategies(
            storage,
            Box::new(SchemaValidator),
            Box::new(PatternInstanceGenerator),
        )
    }

    pub fn with_strategies(
        storage: Arc<dyn Storage>,
        validator: Box<dyn FixtureValidator>,
        generator: Box<dyn InstanceGenerator>,
    ) -> Self {
        Self {
            storage,
            validator,
            generator,
            config: RwLock::new(None),
        }
    }

    /// Load and validate the fixture document at `path`. A missing
    /// document loads the default configuration.
    pub async fn load_fixtures(&self, path: &Path) -> Result<FixtureConfig> {
        if !self.storage.exists(path).await {
            info!("No fixtures at {}, using defaults", path.display());
            let config = FixtureConfig::default();
            self.set_fixtures(config.clone());
            return Ok(config);
        }

        let raw = self.storage.read(path).await?;
        let document: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigParse(format!("{}: {}", path.display(), e)))?;

        self.check(&document)?;

        let config: FixtureConfig = serde_json::from_value(document).map_err(|e| {
            Error::ConfigValidation {
                violations: vec![e.to_string()],
            }
        })?;

        info!(
            "Loaded fixtures from {} ({} dynamic route pattern(s))",
            path.display(),
            config.dynamic_routes.len()
        );
        self.set_fixtures(config.clone());
        Ok(config)
    }

    /// Replace the in-memory configuration. Not re-validated.
    pub fn set_fixtures(&self, config: FixtureConfig) {
        *self.config.write() = Some(config);
    }

    /// Snapshot of the current configuration, if any was loaded or set.
    pub fn loaded(&self) -> Option<FixtureConfig> {
        self.config.read().clone()
    }

    /// Auth fixture for a caller-supplied state name.
    pub fn get_auth_fixture(&self, state: &str) -> Result<Option<AuthFixture>> {
        let state: AuthState = state
            .parse()
            .map_err(|_| Error::InvalidState(state.to_string()))?;
        Ok(self.auth_fixture(state))
    }

    pub fn auth_fixture(&self, state: AuthState) -> Option<AuthFixture> {
        let config = self.config.read();
        let auth = &config.as_ref()?.auth;
        match state {
            AuthState::Authenticated => auth.authenticated.clone(),
            AuthState::Unauthenticated => auth.unauthenticated.clone(),
        }
    }

    pub fn global_state(&self) -> Option<GlobalState> {
        self.config.read().as_ref()?.global_state.clone()
    }

    /// Records registered for exactly `pattern`.
    pub fn get_dynamic_route_fixtures(&self, pattern: &str) -> Vec<FixtureRecord> {
        self.config
            .read()
            .as_ref()
            .and_then(|config| config.dynamic_routes.get(pattern).cloned())
            .unwrap_or_default()
    }

    pub fn generate_route_instances(&self, pattern: &str) -> Vec<String> {
        let records = self.get_dynamic_route_fixtures(pattern);
        let instances = self.generator.generate(pattern, &records);
        debug!("{} -> {} instance(s)", pattern, instances.len());
        instances
    }

    pub fn validate_fixture_config(&self, document: &Value) -> ValidationOutcome {
        self.validator.validate(document)
    }

    /// Write `config` to `path`. A configuration that would not load back
    /// is rejected with [`Error::ConfigValidation`] before anything is written.
    pub async fn save_fixtures(&self, path: &Path, config: &FixtureConfig) -> Result<()> {
        let document = serde_json::to_value(config).map_err(|e| Error::Save(e.to_string()))?;
        self.check(&document)?;

        let json =
            serde_json::to_string_pretty(&document).map_err(|e| Error::Save(e.to_string()))?;
        self.storage
            .write(path, &json)
            .await
            .map_err(|e| Error::Save(format!("{}: {}", path.display(), e)))?;
        info!("Saved fixtures to {}", path.display());
        Ok(())
    }

    fn check(&self, document: &Value) -> Result<()> {
        let outcome = self.validator.validate(document);
        if outcome.success {
            return Ok(());
        }
        let violations = if outcome.violations.is_empty() {
            outcome.error.into_iter().collect()
        } else {
            outcome.violations
        };
        Err(Error::ConfigValidation { violations })
    }
}
