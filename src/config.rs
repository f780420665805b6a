//! Client configuration.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};

/// Hard ceiling on the number of items any single listing or search call
/// returns. Spaces and trees beyond this bound are silently truncated;
/// callers must treat them as under-synchronized.
pub const MAX_RESULTS: u32 = 10_000;

/// Configuration for [`ContentClient`](crate::ContentClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the Confluence instance (no trailing slash),
    /// e.g. `https://wiki.example.com`.
    pub base_url: String,
    /// Username for basic auth.
    pub username: String,
    /// Password or API token for basic auth.
    pub password: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 60,
        }
    }
}

impl ClientConfig {
    /// Creates a config from explicit values.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Loads the config from `CONFLUENCE_BASEURL`, `CONFLUENCE_USERNAME`
    /// and `CONFLUENCE_PASSWORD`.
    pub fn from_env() -> ClientResult<Self> {
        let var = |name: &str| {
            std::env::var(name)
                .map_err(|_| ClientError::Config(format!("{name} environment variable not set")))
        };

        Ok(Self::new(
            var("CONFLUENCE_BASEURL")?,
            var("CONFLUENCE_USERNAME")?,
            var("CONFLUENCE_PASSWORD")?,
        ))
    }
}
