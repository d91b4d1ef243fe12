//! Route Commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use routeshot_capture::RouteManifest;
use routeshot_common::{RouteDescriptor, RouterType};

use super::Context;
use crate::output::{print_list, print_success, print_warning, TableDisplay};

#[derive(Subcommand)]
pub enum RoutesCommands {
    /// Scan the project and write the route manifest
    Scan,

    /// List routes from the manifest
    List {
        /// Only routes of one routing convention
        #[arg(long)]
        router: Option<RouterType>,
    },

    /// List every concrete route instance after fixture expansion
    Expand,
}

#[derive(Serialize)]
pub struct RouteDisplay {
    pub router: RouterType,
    pub path: String,
    pub dynamic: bool,
    pub parameters: Vec<String>,
}

impl RouteDisplay {
    fn from_route(router: RouterType, route: &RouteDescriptor) -> Self {
        Self {
            router,
            path: route.path.clone(),
            dynamic: route.is_dynamic,
            parameters: route.parameters.clone(),
        }
    }
}

impl TableDisplay for RouteDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Router", "Path", "Dynamic", "Parameters"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.router.to_string(),
            self.path.clone(),
            if self.dynamic { "yes" } else { "no" }.to_string(),
            self.parameters.join(", "),
        ]
    }
}

#[derive(Serialize)]
pub struct InstanceDisplay {
    pub pattern: String,
    pub instance: String,
}

impl TableDisplay for InstanceDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Pattern", "Instance"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.pattern.clone(), self.instance.clone()]
    }
}

fn displays(manifest: &RouteManifest, filter: Option<RouterType>) -> Vec<RouteDisplay> {
    RouterType::ALL
        .into_iter()
        .filter(|router| filter.map_or(true, |f| f == *router))
        .filter_map(|router| manifest.flavor(router).map(|routes| (router, routes)))
        .flat_map(|(router, routes)| {
            routes
                .iter()
                .map(move |route| RouteDisplay::from_route(router, route))
        })
        .collect()
}

pub async fn execute(cmd: RoutesCommands, ctx: &Context) -> Result<()> {
    let manifest_path = ctx.config.manifest_path(&ctx.project_root);

    match cmd {
        RoutesCommands::Scan => {
            let manifest = RouteManifest::scan(&ctx.project_root);
            manifest.save(ctx.storage.as_ref(), &manifest_path).await?;

            let routes = displays(&manifest, None);
            if ctx.chatty() {
                if routes.is_empty() {
                    print_warning("No routes found under app/, pages/ or routes/");
                } else {
                    print_success(&format!(
                        "Wrote {} route(s) to {}",
                        routes.len(),
                        manifest_path.display()
                    ));
                }
            }
            print_list(&routes, ctx.format);
        }

        RoutesCommands::List { router } => {
            let manifest = RouteManifest::load(ctx.storage.as_ref(), &manifest_path).await?;
            print_list(&displays(&manifest, router), ctx.format);
        }

        RoutesCommands::Expand => {
            let manifest = RouteManifest::load(ctx.storage.as_ref(), &manifest_path).await?;
            let fixtures = ctx.fixtures().await?;

            let mut instances = Vec::new();
            for route in manifest.routes() {
                let expanded = if route.is_dynamic {
                    fixtures.generate_route_instances(&route.path)
                } else {
                    vec![route.path.clone()]
                };
                if expanded.is_empty() && ctx.chatty() {
                    print_warning(&format!("{} has no fixture records", route.path));
                }
                instances.extend(expanded.into_iter().map(|instance| InstanceDisplay {
                    pattern: route.path.clone(),
                    instance,
                }));
            }
            print_list(&instances, ctx.format);
        }
    }

    Ok(())
}
