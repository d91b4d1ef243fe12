//! Review workflow state and annotations
//!
//! The manager only records transitions; callers decide when one is
//! warranted. Both documents are plain overwrites with no concurrency check.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use routeshot_common::{
    Annotation, CaptureResult, Result, Storage, WorkflowState, WorkflowStateData,
    DEFAULT_DATA_DIR,
};

pub const WORKFLOW_FILE_NAME: &str = "workflow-state.json";
pub const ANNOTATIONS_FILE_NAME: &str = "annotations.json";

pub struct WorkflowStateManager {
    storage: Arc<dyn Storage>,
    state_path: PathBuf,
    annotations_path: PathBuf,
}

impl WorkflowStateManager {
    pub fn new(
        storage: Arc<dyn Storage>,
        state_path: impl Into<PathBuf>,
        annotations_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            state_path: state_path.into(),
            annotations_path: annotations_path.into(),
        }
    }

    /// Use the standard file names inside `data_dir`
    pub fn for_data_dir(storage: Arc<dyn Storage>, data_dir: &Path) -> Self {
        Self::new(
            storage,
            data_dir.join(WORKFLOW_FILE_NAME),
            data_dir.join(ANNOTATIONS_FILE_NAME),
        )
    }

    /// Manager for a project using the default data directory
    pub fn for_project(storage: Arc<dyn Storage>, project_root: &Path) -> Self {
        Self::for_data_dir(storage, &project_root.join(DEFAULT_DATA_DIR))
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn annotations_path(&self) -> &Path {
        &self.annotations_path
    }

    /// Current state; a project that never recorded one is in development.
    pub async fn get_workflow_state(&self) -> Result<WorkflowStateData> {
        if !self.storage.exists(&self.state_path).await {
            debug!("No workflow state at {}", self.state_path.display());
            return Ok(WorkflowStateData::default());
        }
        let raw = self.storage.read(&self.state_path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Overwrite the stored state. A `None` result clears any earlier one.
    pub async fn set_workflow_state(
        &self,
        state: WorkflowState,
        capture_result: Option<CaptureResult>,
    ) -> Result<WorkflowStateData> {
        let data = WorkflowStateData::new(state, capture_result);
        let raw = serde_json::to_string_pretty(&data)?;
        self.storage.write(&self.state_path, &raw).await?;
        info!("Workflow state set to {}", state);
        Ok(data)
    }

    pub async fn get_annotations(&self) -> Result<Vec<Annotation>> {
        if !self.storage.exists(&self.annotations_path).await {
            return Ok(Vec::new());
        }
        let raw = self.storage.read(&self.annotations_path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn save_annotations(&self, annotations: &[Annotation]) -> Result<()> {
        let raw = serde_json::to_string_pretty(annotations)?;
        self.storage.write(&self.annotations_path, &raw).await?;
        debug!("Saved {} annotation(s)", annotations.len());
        Ok(())
    }

    /// Back to `in-development` with no annotations.
    ///
    /// Two separate writes: if the second fails the state is already reset
    /// while the old annotations remain.
    pub async fn reset_workflow(&self) -> Result<WorkflowStateData> {
        let data = self.set_workflow_state(WorkflowState::InDevelopment, None).await?;
        self.save_annotations(&[]).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeshot_common::{InjectedFixtures, MemoryStorage};

    fn manager() -> (Arc<MemoryStorage>, WorkflowStateManager) {
        let storage = Arc::new(MemoryStorage::new());
        let manager = WorkflowStateManager::for_project(storage.clone(), Path::new("/project"));
        (storage, manager)
    }

    fn empty_result() -> CaptureResult {
        CaptureResult {
            screenshots: Vec::new(),
            injected_fixtures: InjectedFixtures::default(),
            fixture_injection_log: vec!["No auth fixture for 'unauthenticated'".to_string()],
            total_routes: 0,
            total_screenshots: 0,
        }
    }

    #[tokio::test]
    async fn test_missing_state_defaults() {
        let (_, manager) = manager();
        let data = manager.get_workflow_state().await.unwrap();
        assert_eq!(data.state, WorkflowState::InDevelopment);
        assert!(data.last_capture_result.is_none());
        assert!(manager.get_annotations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_overwrites_result() {
        let (storage, manager) = manager();
        manager
            .set_workflow_state(WorkflowState::ReviewsRequested, Some(empty_result()))
            .await
            .unwrap();
        let stored = manager.get_workflow_state().await.unwrap();
        assert_eq!(stored.state, WorkflowState::ReviewsRequested);
        assert_eq!(stored.last_capture_result, Some(empty_result()));

        manager.set_workflow_state(WorkflowState::InReview, None).await.unwrap();
        let stored = manager.get_workflow_state().await.unwrap();
        assert_eq!(stored.state, WorkflowState::InReview);
        assert!(stored.last_capture_result.is_none());

        let raw = storage.get(Path::new("/project/.routeshot/workflow-state.json")).unwrap();
        assert!(raw.contains("\"in-review\""));
        assert!(!raw.contains("lastCaptureResult"));
    }

    #[tokio::test]
    async fn test_reset_clears_annotations() {
        let (_, manager) = manager();
        manager
            .set_workflow_state(WorkflowState::SubmittedForDevelopment, Some(empty_result()))
            .await
            .unwrap();
        manager
            .save_annotations(&[Annotation::new("/about", "Header overlaps")])
            .await
            .unwrap();

        let data = manager.reset_workflow().await.unwrap();
        assert_eq!(data.state, WorkflowState::InDevelopment);
        assert!(manager.get_annotations().await.unwrap().is_empty());
        assert!(manager.get_workflow_state().await.unwrap().last_capture_result.is_none());
    }

    #[tokio::test]
    async fn test_reset_is_not_transactional() {
        let (storage, manager) = manager();
        manager
            .save_annotations(&[Annotation::new("/", "Logo blurry")])
            .await
            .unwrap();
        storage.set_read_only(true);

        assert!(manager.reset_workflow().await.is_err());
        storage.set_read_only(false);
        assert_eq!(manager.get_annotations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_annotation_extra_fields_survive() {
        let (storage, manager) = manager();
        let path = manager.annotations_path().to_path_buf();
        storage.insert(
            path.clone(),
            r#"[{"id":"a1","route":"/","comment":"ok","reviewer":"sam","severity":2}]"#,
        );

        let annotations = manager.get_annotations().await.unwrap();
        assert_eq!(annotations[0].extra["reviewer"], "sam");
        manager.save_annotations(&annotations).await.unwrap();
        assert!(storage.get(&path).unwrap().contains("\"severity\": 2"));
    }

    #[tokio::test]
    async fn test_loose_annotation_does_not_fail_the_file() {
        let (storage, manager) = manager();
        storage.insert(
            manager.annotations_path().to_path_buf(),
            r#"[
                {"id":"a1","route":"/","comment":"ok"},
                {"id":"a2","comment":"no route","x":"12.5","y":"top"}
            ]"#,
        );

        let annotations = manager.get_annotations().await.unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[1].route, "");
        assert_eq!(annotations[1].x, Some(12.5));
        assert_eq!(annotations[1].y, None);
        assert_eq!(annotations[1].extra["y"], "top");
    }
}
