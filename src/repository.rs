//! Domain model and the repository boundary the sync engine depends on.

use crate::error::ClientResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A page with its full body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Opaque page id.
    pub id: String,
    /// Title, unique within a space+parent for matching purposes.
    pub title: String,
    /// Space key.
    pub space: String,
    /// Body in storage-format markup.
    pub body: String,
    /// Current version number (monotonic, incremented on every update).
    pub version: u64,
    /// Direct parent page, if any.
    pub parent_id: Option<String>,
}

/// A page as returned by listing calls (no body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
}

/// An attachment as returned by listing calls. The payload is fetched
/// separately via its download reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    /// Filename, unique within the parent page.
    pub filename: String,
    /// Server-relative download reference for the binary payload.
    pub download_ref: String,
}

/// A page label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub prefix: String,
    pub name: String,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
}

/// The remote content repository boundary.
///
/// This is the only interface the tree/copy/attachment/transformation
/// layers depend on; [`ContentClient`](crate::ContentClient) is the HTTP
/// implementation. All calls are strictly sequential per operation.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetches a page with its body. `NotFound` if the id does not resolve.
    async fn get_page(&self, id: &str) -> ClientResult<Page>;

    /// Lists the direct child pages of a page, in server order.
    async fn get_child_pages(&self, id: &str) -> ClientResult<Vec<PageSummary>>;

    /// Resolves a page id by exact title within a space. Absence is a
    /// normal outcome, not an error.
    async fn get_page_id_by_title(&self, space: &str, title: &str)
        -> ClientResult<Option<String>>;

    /// Returns the version number the next update of this page must carry
    /// (latest history version + 1). A concurrent writer can invalidate
    /// this between read and write; the remote then rejects the update.
    async fn get_next_version(&self, id: &str) -> ClientResult<u64>;

    /// Creates a page under a parent. Returns the new page id.
    async fn create_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: &str,
    ) -> ClientResult<String>;

    /// Updates a page in place, optionally re-parenting it. Returns the
    /// page id.
    async fn update_page(
        &self,
        space: &str,
        id: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> ClientResult<String>;

    /// Deletes a page.
    async fn delete_page(&self, id: &str) -> ClientResult<()>;

    /// Lists the attachments of a page, in server order.
    async fn list_attachments(&self, page_id: &str) -> ClientResult<Vec<Attachment>>;

    /// Downloads an attachment's binary payload via its download reference.
    async fn download_attachment(&self, download_ref: &str) -> ClientResult<Vec<u8>>;

    /// Uploads a local file as an attachment. The attachment filename is
    /// the file's basename; an existing attachment with the same filename
    /// is updated, otherwise one is created. Returns the attachment id.
    async fn upload_attachment(&self, path: &Path, page_id: &str) -> ClientResult<String>;

    /// Deletes an attachment.
    async fn delete_attachment(&self, id: &str) -> ClientResult<()>;

    /// Runs a CQL query, optionally scoped to a space.
    async fn search(&self, cql: &str, space: Option<&str>) -> ClientResult<Vec<SearchHit>>;

    /// Adds global labels to a page.
    async fn add_labels(&self, page_id: &str, labels: &[String]) -> ClientResult<()>;

    /// Returns the labels of a page.
    async fn get_labels(&self, page_id: &str) -> ClientResult<Vec<Label>>;

    /// Deletes labels from a page, best-effort per label.
    async fn delete_labels(&self, page_id: &str, labels: &[String]) -> ClientResult<()>;
}
