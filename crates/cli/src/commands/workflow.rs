//! Workflow Commands

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;

use routeshot_common::{Annotation, WorkflowState, WorkflowStateData};

use super::Context;
use crate::output::{print_item, print_list, print_structured, print_success, TableDisplay};

#[derive(Subcommand)]
pub enum WorkflowCommands {
    /// Show the current workflow stage
    Status,

    /// Record a stage explicitly
    Set {
        /// in-development, reviews-requested, in-review or submitted-for-development
        state: WorkflowState,

        /// Drop the stored capture result instead of carrying it over
        #[arg(long)]
        clear_result: bool,
    },

    /// Move to the next stage
    Advance,

    /// Return to in-development and clear annotations
    Reset,

    /// List review annotations
    Annotations {
        /// Only annotations for this route
        #[arg(long)]
        route: Option<String>,
    },

    /// Add a review annotation
    Annotate {
        /// Route instance the comment refers to
        route: String,

        /// Comment text
        comment: String,

        /// Viewport name
        #[arg(long)]
        viewport: Option<String>,
    },
}

#[derive(Serialize)]
pub struct StatusDisplay {
    pub state: WorkflowState,
    pub since: String,
    pub screenshots: Option<usize>,
    pub routes: Option<usize>,
    pub capture_allowed: bool,
}

impl From<&WorkflowStateData> for StatusDisplay {
    fn from(data: &WorkflowStateData) -> Self {
        Self {
            state: data.state,
            since: data.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            screenshots: data.last_capture_result.as_ref().map(|r| r.total_screenshots),
            routes: data.last_capture_result.as_ref().map(|r| r.total_routes),
            capture_allowed: data.state.allows_capture(),
        }
    }
}

impl TableDisplay for StatusDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["State", "Since", "Screenshots", "Routes", "Capture Allowed"]
    }

    fn row(&self) -> Vec<String> {
        let count = |n: Option<usize>| n.map_or_else(|| "-".to_string(), |n| n.to_string());
        vec![
            self.state.to_string(),
            self.since.clone(),
            count(self.screenshots),
            count(self.routes),
            if self.capture_allowed { "yes" } else { "no" }.to_string(),
        ]
    }
}

#[derive(Serialize)]
pub struct AnnotationDisplay {
    pub id: String,
    pub route: String,
    pub viewport: String,
    pub comment: String,
    pub created: String,
}

impl From<&Annotation> for AnnotationDisplay {
    fn from(annotation: &Annotation) -> Self {
        Self {
            id: annotation.id.clone(),
            route: annotation.route.clone(),
            viewport: annotation.viewport.clone().unwrap_or_default(),
            comment: annotation.comment.clone(),
            created: annotation
                .created_at
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        }
    }
}

impl TableDisplay for AnnotationDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Route", "Viewport", "Comment", "Created"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.route.clone(),
            self.viewport.clone(),
            self.comment.clone(),
            self.created.clone(),
        ]
    }
}

fn print_stage(data: &WorkflowStateData, ctx: &Context) {
    if ctx.chatty() {
        let stage = data.state.to_string();
        let stage = if data.state.allows_capture() {
            stage.green()
        } else {
            stage.yellow()
        };
        println!("{} {}", "Workflow:".bold(), stage);
    }
    print_item(&StatusDisplay::from(data), ctx.format);
}

pub async fn execute(cmd: WorkflowCommands, ctx: &Context) -> Result<()> {
    let workflow = ctx.workflow();

    match cmd {
        WorkflowCommands::Status => {
            let data = workflow.get_workflow_state().await?;
            print_stage(&data, ctx);
        }

        WorkflowCommands::Set {
            state,
            clear_result,
        } => {
            let current = workflow.get_workflow_state().await?;
            let carried = if clear_result {
                None
            } else {
                current.last_capture_result
            };
            let data = workflow.set_workflow_state(state, carried).await?;
            print_stage(&data, ctx);
        }

        WorkflowCommands::Advance => {
            let current = workflow.get_workflow_state().await?;
            let Some(next) = current.state.next() else {
                bail!(
                    "'{}' is the last stage; use `routeshot workflow reset` to start over",
                    current.state
                );
            };
            let data = workflow
                .set_workflow_state(next, current.last_capture_result)
                .await?;
            if ctx.chatty() {
                print_success(&format!("{} -> {}", current.state, next));
            }
            print_stage(&data, ctx);
        }

        WorkflowCommands::Reset => {
            let data = workflow.reset_workflow().await?;
            if ctx.chatty() {
                print_success("Workflow reset, annotations cleared");
            }
            print_stage(&data, ctx);
        }

        WorkflowCommands::Annotations { route } => {
            let annotations = workflow.get_annotations().await?;
            let displays: Vec<AnnotationDisplay> = annotations
                .iter()
                .filter(|a| route.as_deref().map_or(true, |r| a.route == r))
                .map(AnnotationDisplay::from)
                .collect();
            print_list(&displays, ctx.format);
        }

        WorkflowCommands::Annotate {
            route,
            comment,
            viewport,
        } => {
            let mut annotations = workflow.get_annotations().await?;
            let mut annotation = Annotation::new(route, comment);
            annotation.viewport = viewport;
            let display = AnnotationDisplay::from(&annotation);
            annotations.push(annotation);
            workflow.save_annotations(&annotations).await?;

            if ctx.format.is_structured() {
                print_structured(&display, ctx.format);
            } else {
                print_success(&format!("Annotation {} added", display.id));
            }
        }
    }

    Ok(())
}
