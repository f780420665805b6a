//! HTTP implementation of the content repository.
//!
//! Talks to the Confluence REST API with basic auth. Every call is a single
//! request/response cycle; nothing is cached or memoized.

use crate::config::{ClientConfig, MAX_RESULTS};
use crate::error::{ClientError, ClientResult};
use crate::repository::{Attachment, ContentRepository, Label, Page, PageSummary, SearchHit};
use crate::rest::{
    AttachmentResponse, ContentResponse, ContentSummary, ConvertedBody, HistoryResponse,
    IdResponse, LabelResponse, ResultList, SearchResult,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Header Confluence requires on attachment uploads and downloads.
const NOCHECK_HEADER: (&str, &str) = ("X-Atlassian-Token", "nocheck");

/// Confluence REST client.
pub struct ContentClient {
    config: ClientConfig,
    client: Client,
}

impl ContentClient {
    /// Creates a new client for the configured instance.
    pub fn new(config: ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    /// Creates a client from the `CONFLUENCE_*` environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Sends a request with basic auth and checks the status. 404 maps to
    /// `NotFound`; any other non-2xx to `UnexpectedStatus` with the
    /// response body as message.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> ClientResult<reqwest::Response> {
        let response = request
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("{context} failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ClientError::NotFound(context.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("{context} rejected with {status}: {message}");
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        debug!("GET {path}");
        let response = self
            .send(self.client.get(self.url(path)).query(query), path)
            .await?;
        parse(response, path).await
    }

    async fn attachment_id_by_filename(
        &self,
        filename: &str,
        page_id: &str,
    ) -> ClientResult<Option<String>> {
        let path = format!("/rest/api/content/{page_id}/child/attachment");
        let list: ResultList<IdResponse> = self
            .get_json(&path, &[("filename", filename.to_string())])
            .await?;
        Ok(list.results.into_iter().next().map(|a| a.id))
    }

    /// Lists every page of a space, keyed by id. Truncated at
    /// [`MAX_RESULTS`] for very large spaces.
    pub async fn get_all_pages_for_space(&self, space: &str) -> ClientResult<Vec<PageSummary>> {
        let list: ResultList<ContentSummary> = self
            .get_json(
                "/rest/api/content",
                &[
                    ("type", "page".to_string()),
                    ("spaceKey", space.to_string()),
                    ("limit", MAX_RESULTS.to_string()),
                ],
            )
            .await?;

        Ok(list
            .results
            .into_iter()
            .map(|c| PageSummary {
                id: c.id,
                title: c.title,
            })
            .collect())
    }

    /// Updates a page if one with the same title already exists in the
    /// space, creates it otherwise. Returns the page id.
    pub async fn update_or_create_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: &str,
    ) -> ClientResult<String> {
        match self.get_page_id_by_title(space, title).await? {
            Some(id) => {
                self.update_page(space, &id, title, body, Some(parent_id))
                    .await
            }
            None => self.create_page(space, title, body, parent_id).await,
        }
    }

    /// Converts a content body from one representation to another, with
    /// page context if `page_id` is given.
    pub async fn convert_body(
        &self,
        from: &str,
        to: &str,
        body: &str,
        page_id: Option<&str>,
    ) -> ClientResult<String> {
        let mut request = serde_json::json!({
            "representation": from,
            "value": body,
        });
        if let Some(id) = page_id {
            request["content"] = serde_json::json!({ "id": id });
        }

        let path = format!("/rest/api/contentbody/convert/{to}");
        debug!("POST {path}");
        let response = self
            .send(self.client.post(self.url(&path)).json(&request), &path)
            .await?;
        let converted: ConvertedBody = parse(response, &path).await?;
        Ok(converted.value)
    }
}

#[async_trait]
impl ContentRepository for ContentClient {
    async fn get_page(&self, id: &str) -> ClientResult<Page> {
        let path = format!("/rest/api/content/{id}");
        let content: ContentResponse = self
            .get_json(
                &path,
                &[("expand", "body.storage,version,space,ancestors".to_string())],
            )
            .await?;

        Ok(Page {
            id: content.id,
            title: content.title,
            space: content.space.map(|s| s.key).unwrap_or_default(),
            body: content
                .body
                .and_then(|b| b.storage)
                .map(|s| s.value)
                .unwrap_or_default(),
            version: content.version.map(|v| v.number).unwrap_or(1),
            parent_id: content.ancestors.last().map(|a| a.id.clone()),
        })
    }

    async fn get_child_pages(&self, id: &str) -> ClientResult<Vec<PageSummary>> {
        let path = format!("/rest/api/content/{id}/child/page");
        let list: ResultList<ContentSummary> = self
            .get_json(&path, &[("limit", MAX_RESULTS.to_string())])
            .await?;

        Ok(list
            .results
            .into_iter()
            .map(|c| PageSummary {
                id: c.id,
                title: c.title,
            })
            .collect())
    }

    async fn get_page_id_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> ClientResult<Option<String>> {
        let list: ResultList<ContentSummary> = self
            .get_json(
                "/rest/api/content",
                &[
                    ("type", "page".to_string()),
                    ("title", title.to_string()),
                    ("spaceKey", space.to_string()),
                ],
            )
            .await?;

        Ok(list.results.into_iter().next().map(|c| c.id))
    }

    async fn get_next_version(&self, id: &str) -> ClientResult<u64> {
        let path = format!("/rest/api/content/{id}/history");
        let history: HistoryResponse = self.get_json(&path, &[]).await?;
        Ok(history.last_updated.number + 1)
    }

    async fn create_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: &str,
    ) -> ClientResult<String> {
        let request = serde_json::json!({
            "type": "page",
            "title": title,
            "space": { "key": space },
            "body": {
                "storage": { "value": body, "representation": "storage" }
            },
            "ancestors": [ { "id": parent_id } ],
        });

        debug!("POST /rest/api/content");
        let response = self
            .send(
                self.client.post(self.url("/rest/api/content")).json(&request),
                "create page",
            )
            .await?;
        let created: IdResponse = parse(response, "create page").await?;

        info!("created page {title} (id: {})", created.id);
        Ok(created.id)
    }

    async fn update_page(
        &self,
        _space: &str,
        id: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> ClientResult<String> {
        let version = self.get_next_version(id).await?;

        let mut request = serde_json::json!({
            "type": "page",
            "title": title,
            "version": { "number": version },
            "body": {
                "storage": { "value": body, "representation": "storage" }
            },
        });
        if let Some(parent) = parent_id {
            request["ancestors"] = serde_json::json!([ { "id": parent } ]);
        }

        let path = format!("/rest/api/content/{id}");
        debug!("PUT {path}");
        let response = self
            .send(self.client.put(self.url(&path)).json(&request), &path)
            .await?;
        let updated: IdResponse = parse(response, &path).await?;

        info!("updated page {title} to version {version} (id: {})", updated.id);
        Ok(updated.id)
    }

    async fn delete_page(&self, id: &str) -> ClientResult<()> {
        let path = format!("/rest/api/content/{id}");
        debug!("DELETE {path}");
        self.send(self.client.delete(self.url(&path)), &path).await?;
        info!("deleted page {id}");
        Ok(())
    }

    async fn list_attachments(&self, page_id: &str) -> ClientResult<Vec<Attachment>> {
        let path = format!("/rest/api/content/{page_id}/child/attachment");
        let list: ResultList<AttachmentResponse> = self
            .get_json(&path, &[("limit", MAX_RESULTS.to_string())])
            .await?;

        Ok(list
            .results
            .into_iter()
            .map(|a| Attachment {
                id: a.id,
                filename: a.title,
                download_ref: a.links.download,
            })
            .collect())
    }

    async fn download_attachment(&self, download_ref: &str) -> ClientResult<Vec<u8>> {
        debug!("GET {download_ref}");
        let response = self
            .send(
                self.client
                    .get(self.url(download_ref))
                    .header(NOCHECK_HEADER.0, NOCHECK_HEADER.1),
                download_ref,
            )
            .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(format!("read download body failed: {e}")))?;

        Ok(bytes.to_vec())
    }

    async fn upload_attachment(&self, path: &Path, page_id: &str) -> ClientResult<String> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "attachment path has no filename",
                ))
            })?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        debug!("uploading {filename} ({} bytes) to page {page_id}", bytes.len());

        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(filename.clone()));

        // An attachment with the same filename is updated through its own
        // data endpoint; otherwise one is created.
        let existing = self.attachment_id_by_filename(&filename, page_id).await?;

        let id = match existing {
            Some(attachment_id) => {
                let endpoint = format!(
                    "/rest/api/content/{page_id}/child/attachment/{attachment_id}/data"
                );
                let response = self
                    .send(
                        self.client
                            .post(self.url(&endpoint))
                            .header(NOCHECK_HEADER.0, NOCHECK_HEADER.1)
                            .multipart(form),
                        &endpoint,
                    )
                    .await?;
                let updated: IdResponse = parse(response, &endpoint).await?;
                updated.id
            }
            None => {
                let endpoint = format!("/rest/api/content/{page_id}/child/attachment");
                let response = self
                    .send(
                        self.client
                            .post(self.url(&endpoint))
                            .header(NOCHECK_HEADER.0, NOCHECK_HEADER.1)
                            .multipart(form),
                        &endpoint,
                    )
                    .await?;
                let created: ResultList<IdResponse> = parse(response, &endpoint).await?;
                created
                    .results
                    .into_iter()
                    .next()
                    .map(|a| a.id)
                    .ok_or_else(|| {
                        ClientError::Network("empty attachment upload response".to_string())
                    })?
            }
        };

        info!("uploaded {filename} to page {page_id} (id: {id})");
        Ok(id)
    }

    async fn delete_attachment(&self, id: &str) -> ClientResult<()> {
        // Attachments are content; deletion goes through the same endpoint.
        self.delete_page(id).await
    }

    async fn search(&self, cql: &str, space: Option<&str>) -> ClientResult<Vec<SearchHit>> {
        let mut query = vec![
            ("cql", cql.to_string()),
            ("limit", MAX_RESULTS.to_string()),
            ("expand", "ancestors".to_string()),
        ];
        if let Some(space) = space {
            query.push((
                "cqlcontext",
                serde_json::json!({ "spaceKey": space }).to_string(),
            ));
        }

        let list: ResultList<SearchResult> = self.get_json("/rest/api/search", &query).await?;

        Ok(list
            .results
            .into_iter()
            .filter_map(|r| r.content)
            .map(|c| SearchHit {
                id: c.id,
                title: c.title,
            })
            .collect())
    }

    async fn add_labels(&self, page_id: &str, labels: &[String]) -> ClientResult<()> {
        let request: Vec<_> = labels
            .iter()
            .map(|label| serde_json::json!({ "prefix": "global", "name": label }))
            .collect();

        let path = format!("/rest/api/content/{page_id}/label");
        debug!("POST {path}");
        self.send(self.client.post(self.url(&path)).json(&request), &path)
            .await?;
        Ok(())
    }

    async fn get_labels(&self, page_id: &str) -> ClientResult<Vec<Label>> {
        let path = format!("/rest/api/content/{page_id}/label");
        let list: ResultList<LabelResponse> = self.get_json(&path, &[]).await?;

        Ok(list
            .results
            .into_iter()
            .map(|l| Label {
                prefix: l.prefix,
                name: l.name,
            })
            .collect())
    }

    async fn delete_labels(&self, page_id: &str, labels: &[String]) -> ClientResult<()> {
        for label in labels {
            let path = format!("/rest/api/content/{page_id}/label/{label}");
            debug!("DELETE {path}");
            if let Err(e) = self.send(self.client.delete(self.url(&path)), &path).await {
                warn!("failed to delete label {label} from page {page_id}: {e}");
            }
        }
        Ok(())
    }
}

async fn parse<T: DeserializeOwned>(response: reqwest::Response, context: &str) -> ClientResult<T> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Network(format!("failed to parse {context} response: {e}")))
}
