//! Fixture Commands

use anyhow::{bail, Context as _, Result};
use clap::Subcommand;
use serde::Serialize;

use routeshot_capture::{FixtureManager, RouteManifest};
use routeshot_common::FixtureConfig;

use super::Context;
use crate::output::{print_error, print_info, print_item, print_structured, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum FixturesCommands {
    /// Check the fixture document against its schema
    Validate,

    /// Print the loaded fixture document
    Show,

    /// Write a starter fixture document
    Init {
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
pub struct FixtureSummary {
    pub authenticated: bool,
    pub unauthenticated: bool,
    pub dynamic_routes: usize,
    pub records: usize,
    pub global_state_keys: usize,
}

impl From<&FixtureConfig> for FixtureSummary {
    fn from(config: &FixtureConfig) -> Self {
        Self {
            authenticated: config.auth.authenticated.is_some(),
            unauthenticated: config.auth.unauthenticated.is_some(),
            dynamic_routes: config.dynamic_routes.len(),
            records: config.dynamic_routes.values().map(Vec::len).sum(),
            global_state_keys: config.global_state.as_ref().map_or(0, |g| g.len()),
        }
    }
}

impl TableDisplay for FixtureSummary {
    fn headers() -> Vec<&'static str> {
        vec!["Authenticated", "Unauthenticated", "Dynamic Routes", "Records", "Global State Keys"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.authenticated.to_string(),
            self.unauthenticated.to_string(),
            self.dynamic_routes.to_string(),
            self.records.to_string(),
            self.global_state_keys.to_string(),
        ]
    }
}

pub async fn execute(cmd: FixturesCommands, ctx: &Context) -> Result<()> {
    let path = ctx.config.fixtures_path(&ctx.project_root);

    match cmd {
        FixturesCommands::Validate => {
            if !ctx.storage.exists(&path).await {
                bail!("no fixture document at {}", path.display());
            }
            let raw = ctx.storage.read(&path).await?;
            let document: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", path.display()))?;

            let outcome = FixtureManager::new(ctx.storage.clone()).validate_fixture_config(&document);
            if ctx.format.is_structured() {
                print_structured(&outcome, ctx.format);
            } else if outcome.success {
                print_success(&format!("{} is valid", path.display()));
            } else if outcome.violations.is_empty() {
                print_error(outcome.error.as_deref().unwrap_or("invalid fixture document"));
            } else {
                for violation in &outcome.violations {
                    print_error(violation);
                }
            }
            if !outcome.success {
                bail!(
                    "{} failed validation with {} problem(s)",
                    path.display(),
                    outcome.violations.len().max(1)
                );
            }
        }

        FixturesCommands::Show => {
            let fixtures = ctx.fixtures().await?;
            let config = fixtures.loaded().unwrap_or_default();
            match ctx.format {
                OutputFormat::Table | OutputFormat::Plain => {
                    print_item(&FixtureSummary::from(&config), ctx.format);
                }
                _ => print_structured(&config, ctx.format),
            }
        }

        FixturesCommands::Init { force } => {
            if ctx.storage.exists(&path).await && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }

            let mut config = FixtureConfig::default();
            let manifest_path = ctx.config.manifest_path(&ctx.project_root);
            if let Ok(manifest) = RouteManifest::load(ctx.storage.as_ref(), &manifest_path).await {
                for route in manifest.routes().into_iter().filter(|r| r.is_dynamic) {
                    config.dynamic_routes.entry(route.path).or_default();
                }
            }

            let manager = FixtureManager::new(ctx.storage.clone());
            manager.save_fixtures(&path, &config).await?;
            if ctx.chatty() {
                print_success(&format!("Wrote {}", path.display()));
                if !config.dynamic_routes.is_empty() {
                    print_info(&format!(
                        "Add records for {} dynamic route pattern(s)",
                        config.dynamic_routes.len()
                    ));
                }
            }
        }
    }

    Ok(())
}
