//! Post-copy transformation pipeline.
//!
//! A pipeline is an ordered list of side-effect steps run after a page has
//! been copied, each given the source and destination ids. Every step runs
//! regardless of earlier failures so unrelated side effects still make
//! partial progress; the aggregate result is the AND of all step results.

use crate::attachments::sync_attachments;
use crate::repository::ContentRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// A single transformation step.
#[async_trait]
pub trait TransformStep: Send + Sync {
    /// Step name, reported in [`PipelineReport`] outcomes.
    fn name(&self) -> &str;

    /// Applies the side effect. Returns whether it succeeded.
    async fn apply(
        &self,
        repo: &dyn ContentRepository,
        source_id: &str,
        dest_id: &str,
    ) -> bool;
}

/// Outcome of one step in a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: String,
    pub ok: bool,
}

/// Per-step outcomes of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub outcomes: Vec<StepOutcome>,
}

impl PipelineReport {
    /// True iff every step succeeded.
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.ok)
    }

    /// Names of the steps that failed.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.ok)
            .map(|o| o.step.as_str())
            .collect()
    }
}

/// An ordered list of transformation steps.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    steps: Vec<Arc<dyn TransformStep>>,
}

impl TransformPipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step. No duplicate detection, no removal.
    pub fn add(&mut self, step: Arc<dyn TransformStep>) {
        self.steps.push(step);
    }

    /// Returns the number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in registration order. Does not short-circuit: a
    /// failed step is recorded and the remaining steps still run.
    pub async fn run(
        &self,
        repo: &dyn ContentRepository,
        source_id: &str,
        dest_id: &str,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();

        for step in &self.steps {
            let ok = step.apply(repo, source_id, dest_id).await;
            if !ok {
                warn!("transformation step {} failed for {source_id} -> {dest_id}", step.name());
            }
            report.outcomes.push(StepOutcome {
                step: step.name().to_string(),
                ok,
            });
        }

        report
    }
}

/// Immutable mapping from operation name to the pipeline used when a caller
/// supplies none. Constructed once at startup and injected into the copy
/// engine; never mutated afterwards.
pub struct TransformRegistry {
    defaults: HashMap<String, TransformPipeline>,
}

impl TransformRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            defaults: HashMap::new(),
        }
    }

    /// Registers the default pipeline for an operation name.
    pub fn register(mut self, operation: impl Into<String>, pipeline: TransformPipeline) -> Self {
        self.defaults.insert(operation.into(), pipeline);
        self
    }

    /// Returns a fresh pipeline for the operation, if one is registered.
    pub fn pipeline_for(&self, operation: &str) -> Option<TransformPipeline> {
        self.defaults.get(operation).cloned()
    }
}

impl Default for TransformRegistry {
    /// The stock registry: `copy_page` runs the attachment-copy step.
    fn default() -> Self {
        let mut pipeline = TransformPipeline::new();
        pipeline.add(Arc::new(CopyAttachments));
        Self::empty().register("copy_page", pipeline)
    }
}

/// Replaces the destination page's attachment set with the source page's.
pub struct CopyAttachments;

#[async_trait]
impl TransformStep for CopyAttachments {
    fn name(&self) -> &str {
        "copy_attachments"
    }

    async fn apply(
        &self,
        repo: &dyn ContentRepository,
        source_id: &str,
        dest_id: &str,
    ) -> bool {
        sync_attachments(repo, source_id, dest_id).await
    }
}
