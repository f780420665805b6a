//! Confluence REST client with a recursive page-tree copy and sync engine.
//!
//! # Architecture
//!
//! - **ContentClient / ContentRepository**: typed client over the content
//!   API (pages, attachments, labels, CQL search). The engine only sees the
//!   [`ContentRepository`] trait.
//! - **TransformPipeline**: ordered post-copy side-effect steps, run with
//!   the source and destination page ids after every node copy.
//! - **CopyEngine**: copies one page, updating in place when a same-titled
//!   page already exists in the destination space.
//! - **TreeSynchronizer**: recursive tree reconciliation — deletes stale
//!   destination children, copies each incoming node, descends.
//!
//! Everything is best-effort: a failure at one node or step is recorded and
//! logged at that granularity without halting siblings, and nothing is
//! rolled back. All remote I/O is strictly sequential; listing calls are
//! capped at [`MAX_RESULTS`] items and silently truncate beyond that.
//!
//! # Example
//!
//! ```no_run
//! use confluence_sync::{ClientConfig, ContentClient, TreeSynchronizer};
//!
//! # async fn run() -> confluence_sync::ClientResult<()> {
//! let client = ContentClient::new(ClientConfig::new(
//!     "https://wiki.example.com",
//!     "user",
//!     "secret",
//! ));
//!
//! let sync = TreeSynchronizer::new();
//! let tree = sync.build_tree(&client, "1234", &[]).await?;
//! let report = sync.synchronize(&client, "TARGET", "5678", &tree, None).await;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

mod attachments;
mod client;
mod config;
mod copy;
mod error;
mod markup;
mod repository;
mod rest;
mod transform;
mod tree;

pub use attachments::sync_attachments;
pub use client::ContentClient;
pub use config::{ClientConfig, MAX_RESULTS};
pub use copy::CopyEngine;
pub use error::{ClientError, ClientResult};
pub use markup::{Link, Macro, StorageFormat};
pub use repository::{
    Attachment, ContentRepository, Label, Page, PageSummary, SearchHit,
};
pub use transform::{
    CopyAttachments, PipelineReport, StepOutcome, TransformPipeline, TransformRegistry,
    TransformStep,
};
pub use tree::{SyncFailure, SyncReport, TreeNode, TreeSynchronizer};
