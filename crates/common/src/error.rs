//! Error types for routeshot

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using routeshot Error
pub type Result<T> = std::result::Result<T, Error>;

/// routeshot error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse fixture configuration: {0}")]
    ConfigParse(String),

    #[error("Invalid fixture configuration: {}", .violations.join("; "))]
    ConfigValidation { violations: Vec<String> },

    #[error("Invalid state: {0} (expected 'authenticated' or 'unauthenticated')")]
    InvalidState(String),

    #[error("Invalid router type: {0} (expected 'app' or 'pages')")]
    InvalidRouterType(String),

    #[error("Invalid auth state: {0} (expected 'authenticated' or 'unauthenticated')")]
    InvalidAuthState(String),

    #[error("Invalid workflow state: {0}")]
    InvalidWorkflowState(String),

    #[error("Project path does not exist: {}", .0.display())]
    ProjectPath(PathBuf),

    #[error("Route discovery failed: {0}")]
    RouteDiscovery(String),

    #[error("Cannot reach {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("Capture failed for {route} at {viewport}: {reason}")]
    Capture {
        route: String,
        viewport: String,
        reason: String,
    },

    #[error("Failed to save fixtures: {0}")]
    Save(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Browser driver error: {0}")]
    Browser(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by caller input rather than the environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidState(_)
                | Error::InvalidRouterType(_)
                | Error::InvalidAuthState(_)
                | Error::InvalidWorkflowState(_)
                | Error::ProjectPath(_)
        )
    }
}
