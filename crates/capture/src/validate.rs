//! Capture request validation

use async_trait::async_trait;
use std::path::PathBuf;

use routeshot_common::{AuthState, CaptureRequest, Error, Result, RouterType};

/// A capture request whose enumerations have been parsed and whose
/// project path exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub app_url: String,
    pub project_path: PathBuf,
    pub router_type: RouterType,
    pub auth_state: AuthState,
    pub include_global_state: bool,
}

#[async_trait]
pub trait RequestValidator: Send + Sync {
    /// Reject bad input before the capture run has any side effect.
    async fn validate(&self, request: &CaptureRequest) -> Result<ValidatedRequest>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRequestValidator;

#[async_trait]
impl RequestValidator for DefaultRequestValidator {
    async fn validate(&self, request: &CaptureRequest) -> Result<ValidatedRequest> {
        let is_dir = tokio::fs::metadata(&request.project_path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(Error::ProjectPath(request.project_path.clone()));
        }

        let router_type: RouterType = request.router_type.parse()?;
        let auth_state: AuthState = request.auth_state.parse()?;

        Ok(ValidatedRequest {
            app_url: request.app_url.clone(),
            project_path: request.project_path.clone(),
            router_type,
            auth_state,
            include_global_state: request.include_global_state,
        })
    }
}
