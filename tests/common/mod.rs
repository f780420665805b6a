//! Shared test helpers: an in-memory content repository with fault
//! injection.

#![allow(dead_code)]

use async_trait::async_trait;
use confluence_sync::{
    Attachment, ClientError, ClientResult, ContentRepository, Label, Page, PageSummary, SearchHit,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

static TRACING: Once = Once::new();

/// Installs a fmt subscriber once per test binary; `RUST_LOG` controls
/// what shows up in the captured output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub id: String,
    pub space: String,
    pub title: String,
    pub body: String,
    pub parent_id: Option<String>,
    pub version: u64,
}

#[derive(Debug, Clone)]
pub struct FakeAttachment {
    pub id: String,
    pub page_id: String,
    pub filename: String,
    pub download_ref: String,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct State {
    pages: Vec<FakePage>,
    attachments: Vec<FakeAttachment>,
    labels: Vec<(String, Label)>,
    next_id: u64,
    /// Page ids whose next-version fetch (and thus update) fails.
    fail_version_for: HashSet<String>,
    /// Download refs that fail.
    fail_download_refs: HashSet<String>,
    /// Page ids whose delete fails.
    fail_delete_for: HashSet<String>,
    /// Every local path handed to upload_attachment.
    uploaded_paths: Vec<PathBuf>,
    /// Ids passed to delete_page, in order.
    deleted_pages: Vec<String>,
}

/// In-memory [`ContentRepository`] for engine-level tests.
pub struct FakeRepo {
    state: Mutex<State>,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    // ── Seeding ─────────────────────────────────────────────────

    pub fn add_page(
        &self,
        id: &str,
        space: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) {
        self.state.lock().unwrap().pages.push(FakePage {
            id: id.to_string(),
            space: space.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            parent_id: parent_id.map(str::to_string),
            version: 1,
        });
    }

    pub fn add_attachment(&self, page_id: &str, filename: &str, payload: &[u8]) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("att{}", state.next_id);
        state.attachments.push(FakeAttachment {
            id: id.clone(),
            page_id: page_id.to_string(),
            filename: filename.to_string(),
            download_ref: format!("/download/{page_id}/{filename}"),
            payload: payload.to_vec(),
        });
        id
    }

    pub fn add_label(&self, page_id: &str, name: &str) {
        self.state.lock().unwrap().labels.push((
            page_id.to_string(),
            Label {
                prefix: "global".to_string(),
                name: name.to_string(),
            },
        ));
    }

    // ── Fault injection ─────────────────────────────────────────

    /// Makes every future update of this page fail at the next-version
    /// fetch.
    pub fn fail_next_version(&self, page_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_version_for
            .insert(page_id.to_string());
    }

    /// Makes downloads of this attachment's payload fail.
    pub fn fail_download(&self, page_id: &str, filename: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_download_refs
            .insert(format!("/download/{page_id}/{filename}"));
    }

    /// Makes deletes of this page fail.
    pub fn fail_delete(&self, page_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_delete_for
            .insert(page_id.to_string());
    }

    // ── Assertions ──────────────────────────────────────────────

    pub fn page_by_title(&self, space: &str, title: &str) -> Option<FakePage> {
        self.state
            .lock()
            .unwrap()
            .pages
            .iter()
            .find(|p| p.space == space && p.title == title)
            .cloned()
    }

    pub fn page_by_id(&self, id: &str) -> Option<FakePage> {
        self.state
            .lock()
            .unwrap()
            .pages
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn pages_in(&self, space: &str) -> Vec<FakePage> {
        self.state
            .lock()
            .unwrap()
            .pages
            .iter()
            .filter(|p| p.space == space)
            .cloned()
            .collect()
    }

    pub fn child_titles(&self, parent_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .pages
            .iter()
            .filter(|p| p.parent_id.as_deref() == Some(parent_id))
            .map(|p| p.title.clone())
            .collect()
    }

    pub fn attachment_filenames(&self, page_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .iter()
            .filter(|a| a.page_id == page_id)
            .map(|a| a.filename.clone())
            .collect()
    }

    pub fn attachment_payload(&self, page_id: &str, filename: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .iter()
            .find(|a| a.page_id == page_id && a.filename == filename)
            .map(|a| a.payload.clone())
    }

    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().uploaded_paths.clone()
    }

    pub fn deleted_page_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_pages.clone()
    }
}

#[async_trait]
impl ContentRepository for FakeRepo {
    async fn get_page(&self, id: &str) -> ClientResult<Page> {
        let state = self.state.lock().unwrap();
        state
            .pages
            .iter()
            .find(|p| p.id == id)
            .map(|p| Page {
                id: p.id.clone(),
                title: p.title.clone(),
                space: p.space.clone(),
                body: p.body.clone(),
                version: p.version,
                parent_id: p.parent_id.clone(),
            })
            .ok_or_else(|| ClientError::NotFound(format!("page {id}")))
    }

    async fn get_child_pages(&self, id: &str) -> ClientResult<Vec<PageSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pages
            .iter()
            .filter(|p| p.parent_id.as_deref() == Some(id))
            .map(|p| PageSummary {
                id: p.id.clone(),
                title: p.title.clone(),
            })
            .collect())
    }

    async fn get_page_id_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> ClientResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pages
            .iter()
            .find(|p| p.space == space && p.title == title)
            .map(|p| p.id.clone()))
    }

    async fn get_next_version(&self, id: &str) -> ClientResult<u64> {
        let state = self.state.lock().unwrap();
        if state.fail_version_for.contains(id) {
            return Err(ClientError::Network(format!(
                "history fetch failed for {id}"
            )));
        }
        state
            .pages
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.version + 1)
            .ok_or_else(|| ClientError::NotFound(format!("page {id}")))
    }

    async fn create_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: &str,
    ) -> ClientResult<String> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("p{}", state.next_id);
        state.pages.push(FakePage {
            id: id.clone(),
            space: space.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            parent_id: Some(parent_id.to_string()),
            version: 1,
        });
        Ok(id)
    }

    async fn update_page(
        &self,
        _space: &str,
        id: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> ClientResult<String> {
        let mut state = self.state.lock().unwrap();
        // The HTTP client fetches the next version before the PUT; mirror
        // that failure point here.
        if state.fail_version_for.contains(id) {
            return Err(ClientError::Network(format!(
                "history fetch failed for {id}"
            )));
        }
        let page = state
            .pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("page {id}")))?;
        page.title = title.to_string();
        page.body = body.to_string();
        if let Some(parent) = parent_id {
            page.parent_id = Some(parent.to_string());
        }
        page.version += 1;
        Ok(id.to_string())
    }

    async fn delete_page(&self, id: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete_for.contains(id) {
            return Err(ClientError::Network(format!("delete failed for {id}")));
        }
        if !state.pages.iter().any(|p| p.id == id) {
            return Err(ClientError::NotFound(format!("page {id}")));
        }

        // Deleting a page takes its subtree with it.
        let mut doomed: HashSet<String> = HashSet::new();
        doomed.insert(id.to_string());
        loop {
            let more: Vec<String> = state
                .pages
                .iter()
                .filter(|p| {
                    p.parent_id
                        .as_ref()
                        .is_some_and(|parent| doomed.contains(parent))
                        && !doomed.contains(&p.id)
                })
                .map(|p| p.id.clone())
                .collect();
            if more.is_empty() {
                break;
            }
            doomed.extend(more);
        }

        state.pages.retain(|p| !doomed.contains(&p.id));
        state.attachments.retain(|a| !doomed.contains(&a.page_id));
        state.deleted_pages.push(id.to_string());
        Ok(())
    }

    async fn list_attachments(&self, page_id: &str) -> ClientResult<Vec<Attachment>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attachments
            .iter()
            .filter(|a| a.page_id == page_id)
            .map(|a| Attachment {
                id: a.id.clone(),
                filename: a.filename.clone(),
                download_ref: a.download_ref.clone(),
            })
            .collect())
    }

    async fn download_attachment(&self, download_ref: &str) -> ClientResult<Vec<u8>> {
        let state = self.state.lock().unwrap();
        if state.fail_download_refs.contains(download_ref) {
            return Err(ClientError::Network(format!(
                "download failed: {download_ref}"
            )));
        }
        state
            .attachments
            .iter()
            .find(|a| a.download_ref == download_ref)
            .map(|a| a.payload.clone())
            .ok_or_else(|| ClientError::NotFound(format!("attachment {download_ref}")))
    }

    async fn upload_attachment(&self, path: &Path, page_id: &str) -> ClientResult<String> {
        let payload = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let mut state = self.state.lock().unwrap();
        state.uploaded_paths.push(path.to_path_buf());

        if let Some(existing) = state
            .attachments
            .iter_mut()
            .find(|a| a.page_id == page_id && a.filename == filename)
        {
            existing.payload = payload;
            return Ok(existing.id.clone());
        }

        state.next_id += 1;
        let id = format!("att{}", state.next_id);
        state.attachments.push(FakeAttachment {
            id: id.clone(),
            page_id: page_id.to_string(),
            filename: filename.clone(),
            download_ref: format!("/download/{page_id}/{filename}"),
            payload,
        });
        Ok(id)
    }

    async fn delete_attachment(&self, id: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.attachments.len();
        state.attachments.retain(|a| a.id != id);
        if state.attachments.len() == before {
            return Err(ClientError::NotFound(format!("attachment {id}")));
        }
        Ok(())
    }

    async fn search(&self, cql: &str, _space: Option<&str>) -> ClientResult<Vec<SearchHit>> {
        // Understands the child-enumeration queries the tree walker emits:
        // `parent = <id>` with zero or more `and label != "<name>"` clauses.
        let state = self.state.lock().unwrap();

        let parent = cql
            .strip_prefix("parent = ")
            .map(|rest| rest.split(' ').next().unwrap_or(rest).to_string())
            .ok_or_else(|| ClientError::Network(format!("unsupported CQL: {cql}")))?;

        let excluded: Vec<String> = cql
            .split("label != \"")
            .skip(1)
            .filter_map(|part| part.split('"').next())
            .map(str::to_string)
            .collect();

        Ok(state
            .pages
            .iter()
            .filter(|p| p.parent_id.as_deref() == Some(parent.as_str()))
            .filter(|p| {
                !state
                    .labels
                    .iter()
                    .any(|(page_id, label)| *page_id == p.id && excluded.contains(&label.name))
            })
            .map(|p| SearchHit {
                id: p.id.clone(),
                title: p.title.clone(),
            })
            .collect())
    }

    async fn add_labels(&self, page_id: &str, labels: &[String]) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        for name in labels {
            state.labels.push((
                page_id.to_string(),
                Label {
                    prefix: "global".to_string(),
                    name: name.clone(),
                },
            ));
        }
        Ok(())
    }

    async fn get_labels(&self, page_id: &str) -> ClientResult<Vec<Label>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .labels
            .iter()
            .filter(|(id, _)| id == page_id)
            .map(|(_, label)| label.clone())
            .collect())
    }

    async fn delete_labels(&self, page_id: &str, labels: &[String]) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .labels
            .retain(|(id, label)| id != page_id || !labels.contains(&label.name));
        Ok(())
    }
}
