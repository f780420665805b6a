//! Recursive page-tree reading and synchronization.

use crate::copy::CopyEngine;
use crate::error::ClientResult;
use crate::repository::{ContentRepository, PageSummary};
use crate::transform::TransformPipeline;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A node in a page tree, produced by reading a live tree and consumed by
/// [`TreeSynchronizer::synchronize`].
///
/// Title is the sole matching key against destination children. Two sibling
/// source nodes with the same title are never expected; matching behavior
/// under that condition is undefined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub title: String,
    /// Id of the page this node was read from.
    pub page_id: String,
    pub children: Vec<TreeNode>,
}

/// One node-level failure recorded during a synchronize run.
#[derive(Debug, Clone)]
pub struct SyncFailure {
    /// Title of the node (or parent frame) the failure occurred on.
    pub title: String,
    pub error: String,
}

/// Outcome of a synchronize run. The run never aborts on a per-node
/// failure; everything that went wrong is recorded here.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Destination ids of successfully copied nodes.
    pub copied: Vec<String>,
    /// Destination ids of deleted stale children.
    pub deleted: Vec<String>,
    /// Per-node failures; the corresponding subtrees were skipped.
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// True iff no failure was recorded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One unit of pending work: a destination parent and the incoming nodes
/// to reconcile beneath it.
struct Frame {
    parent_id: String,
    nodes: Vec<TreeNode>,
    next: usize,
    pruned: bool,
}

/// Orchestrates recursive tree copy: deletes stale destination children,
/// copies each incoming node, then descends into its children.
pub struct TreeSynchronizer {
    engine: CopyEngine,
}

impl Default for TreeSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSynchronizer {
    /// Creates a synchronizer with the default copy engine.
    pub fn new() -> Self {
        Self::with_engine(CopyEngine::new())
    }

    /// Creates a synchronizer around a custom copy engine.
    pub fn with_engine(engine: CopyEngine) -> Self {
        Self { engine }
    }

    /// Reads the live subtree beneath `page_id` into a list of tree nodes.
    /// Children carrying any of `exclude_labels` are skipped, along with
    /// their subtrees.
    pub async fn build_tree(
        &self,
        repo: &dyn ContentRepository,
        page_id: &str,
        exclude_labels: &[String],
    ) -> ClientResult<Vec<TreeNode>> {
        build_subtree(repo, page_id.to_string(), exclude_labels).await
    }

    /// Reconciles the destination children of `dest_parent_id` against the
    /// incoming nodes, depth-first:
    ///
    /// 1. Every current child whose title matches no incoming node is
    ///    deleted (an empty incoming list wipes all children).
    /// 2. Each incoming node is copied in order; after a successful copy
    ///    its children are reconciled beneath the new id before the next
    ///    sibling is processed.
    ///
    /// A failed copy skips that subtree and continues with siblings; a
    /// failed delete is recorded and the run continues. Already-deleted
    /// stale children stay deleted when a later copy fails; re-running
    /// converges since the operation is idempotent.
    pub async fn synchronize(
        &self,
        repo: &dyn ContentRepository,
        dest_space: &str,
        dest_parent_id: &str,
        nodes: &[TreeNode],
        pipeline: Option<&TransformPipeline>,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        // Explicit frame stack instead of recursion: tree depth is
        // unbounded input.
        let mut stack = vec![Frame {
            parent_id: dest_parent_id.to_string(),
            nodes: nodes.to_vec(),
            next: 0,
            pruned: false,
        }];

        while let Some(frame) = stack.last_mut() {
            if !frame.pruned {
                frame.pruned = true;
                let parent_id = frame.parent_id.clone();
                let keep: Vec<String> = frame.nodes.iter().map(|n| n.title.clone()).collect();

                self.delete_stale_children(repo, &parent_id, &keep, &mut report)
                    .await;
                continue;
            }

            if frame.next >= frame.nodes.len() {
                stack.pop();
                continue;
            }

            let node = frame.nodes[frame.next].clone();
            frame.next += 1;
            let parent_id = frame.parent_id.clone();

            match self
                .engine
                .copy_page(repo, &node.page_id, dest_space, &parent_id, pipeline)
                .await
            {
                Ok(dest_id) => {
                    report.copied.push(dest_id.clone());
                    stack.push(Frame {
                        parent_id: dest_id,
                        nodes: node.children,
                        next: 0,
                        pruned: false,
                    });
                }
                Err(e) => {
                    warn!("copy of {} failed, skipping subtree: {e}", node.title);
                    report.failures.push(SyncFailure {
                        title: node.title,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "tree synchronization finished: {} copied, {} deleted, {} failures",
            report.copied.len(),
            report.deleted.len(),
            report.failures.len()
        );
        report
    }

    /// Deletes every current child of `parent_id` whose title appears in
    /// none of the incoming titles. Best-effort: failures are recorded and
    /// the run continues.
    async fn delete_stale_children(
        &self,
        repo: &dyn ContentRepository,
        parent_id: &str,
        incoming_titles: &[String],
        report: &mut SyncReport,
    ) {
        let current = match repo.get_child_pages(parent_id).await {
            Ok(current) => current,
            Err(e) => {
                warn!("failed to list children of {parent_id}: {e}");
                report.failures.push(SyncFailure {
                    title: parent_id.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let stale: Vec<PageSummary> = current
            .into_iter()
            .filter(|child| !incoming_titles.iter().any(|t| *t == child.title))
            .collect();

        for child in stale {
            match repo.delete_page(&child.id).await {
                Ok(()) => {
                    info!("deleted stale child {} (id: {})", child.title, child.id);
                    report.deleted.push(child.id);
                }
                Err(e) => {
                    warn!("failed to delete stale child {}: {e}", child.title);
                    report.failures.push(SyncFailure {
                        title: child.title,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Lists the children of a page, via a CQL search when labels must be
/// excluded and the plain child listing otherwise.
async fn child_pages_filtered(
    repo: &dyn ContentRepository,
    page_id: &str,
    exclude_labels: &[String],
) -> ClientResult<Vec<PageSummary>> {
    if exclude_labels.is_empty() {
        return repo.get_child_pages(page_id).await;
    }

    let hits = repo
        .search(&exclusion_cql(page_id, exclude_labels), None)
        .await?;
    Ok(hits
        .into_iter()
        .map(|h| PageSummary {
            id: h.id,
            title: h.title,
        })
        .collect())
}

/// Builds the child-enumeration query excluding the given labels. Label
/// names land inside a quoted CQL string literal, so quotes and
/// backslashes in them must be escaped.
fn exclusion_cql(page_id: &str, exclude_labels: &[String]) -> String {
    let mut cql = format!("parent = {page_id}");
    for label in exclude_labels {
        let escaped = label.replace('\\', "\\\\").replace('"', "\\\"");
        cql.push_str(&format!(" and label != \"{escaped}\""));
    }
    cql
}

fn build_subtree<'a>(
    repo: &'a dyn ContentRepository,
    page_id: String,
    exclude_labels: &'a [String],
) -> BoxFuture<'a, ClientResult<Vec<TreeNode>>> {
    async move {
        let children = child_pages_filtered(repo, &page_id, exclude_labels).await?;

        let mut nodes = Vec::with_capacity(children.len());
        for child in children {
            let grandchildren = build_subtree(repo, child.id.clone(), exclude_labels).await?;
            nodes.push(TreeNode {
                title: child.title,
                page_id: child.id,
                children: grandchildren,
            });
        }

        Ok(nodes)
    }
    .boxed()
}
