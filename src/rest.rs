//! Wire types for the Confluence REST API.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ResultList<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentResponse {
    pub id: String,
    pub title: String,
    pub space: Option<SpaceRef>,
    pub body: Option<ContentBody>,
    pub version: Option<VersionRef>,
    #[serde(default = "Vec::new")]
    pub ancestors: Vec<AncestorRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpaceRef {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentBody {
    pub storage: Option<StorageBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StorageBody {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionRef {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AncestorRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(rename = "lastUpdated")]
    pub last_updated: VersionRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachmentResponse {
    pub id: String,
    /// Attachment titles double as filenames.
    pub title: String,
    #[serde(rename = "_links")]
    pub links: AttachmentLinks,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachmentLinks {
    pub download: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResult {
    pub content: Option<ContentSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelResponse {
    pub prefix: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConvertedBody {
    pub value: String,
}
