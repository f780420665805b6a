//! Single-page copy engine.

use crate::error::{ClientError, ClientResult};
use crate::repository::ContentRepository;
use crate::transform::{TransformPipeline, TransformRegistry};
use std::sync::Arc;
use tracing::debug;

/// Copies one page (title + body) into a destination space, updating in
/// place when a same-titled page already exists there.
pub struct CopyEngine {
    registry: Arc<TransformRegistry>,
}

impl Default for CopyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyEngine {
    /// Creates an engine with the stock transformation registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TransformRegistry::default()))
    }

    /// Creates an engine with a custom transformation registry.
    pub fn with_registry(registry: Arc<TransformRegistry>) -> Self {
        Self { registry }
    }

    /// Copies the source page into `dest_space` under `dest_parent_id` and
    /// runs the transformation pipeline with the source and destination
    /// ids. Falls back to the registry's `copy_page` pipeline when none is
    /// supplied.
    ///
    /// Title is the matching key: an existing same-titled page in the
    /// destination space is updated (next version fetched, ancestors set),
    /// otherwise a new page is created under the parent. A failed
    /// transformation yields an error but does not undo the create/update.
    pub async fn copy_page(
        &self,
        repo: &dyn ContentRepository,
        source_page_id: &str,
        dest_space: &str,
        dest_parent_id: &str,
        pipeline: Option<&TransformPipeline>,
    ) -> ClientResult<String> {
        let source = repo.get_page(source_page_id).await?;

        let existing = repo
            .get_page_id_by_title(dest_space, &source.title)
            .await?;

        let dest_id = match existing {
            Some(id) => {
                debug!("updating existing destination page {} (id: {id})", source.title);
                repo.update_page(
                    dest_space,
                    &id,
                    &source.title,
                    &source.body,
                    Some(dest_parent_id),
                )
                .await?
            }
            None => {
                debug!("creating destination page {}", source.title);
                repo.create_page(dest_space, &source.title, &source.body, dest_parent_id)
                    .await?
            }
        };

        let default_pipeline;
        let pipeline = match pipeline {
            Some(pipeline) => pipeline,
            None => {
                default_pipeline = self
                    .registry
                    .pipeline_for("copy_page")
                    .unwrap_or_default();
                &default_pipeline
            }
        };

        let report = pipeline.run(repo, source_page_id, &dest_id).await;
        if !report.all_ok() {
            return Err(ClientError::Transform(format!(
                "steps [{}] failed for page {dest_id}",
                report.failed_steps().join(", ")
            )));
        }

        Ok(dest_id)
    }
}
