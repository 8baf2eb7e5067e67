pub mod error;
pub mod types;

pub use error::{BooksApiError, Result};
pub use types::{ImageLinks, Volume, VolumeInfo, VolumeItem, VolumesResponse};

use std::time::Duration;

pub struct BooksClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BooksClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build a client whose every request is capped at `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn volumes_url(&self) -> String {
        format!("{}/volumes", self.base_url)
    }

    /// Run one search and return the first result page. No pagination
    /// parameters are sent, so the API's default page size applies.
    ///
    /// Only a body that is not a result page at all is an error; entries
    /// that fail to decode come back as `VolumeItem::Malformed`.
    pub async fn search_volumes(&self, query: &str) -> Result<Vec<VolumeItem>> {
        let mut request = self.client.get(self.volumes_url()).query(&[("q", query)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BooksApiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.bytes().await?;
        let parsed: VolumesResponse = serde_json::from_slice(&body)?;
        tracing::debug!(
            query,
            count = parsed.items.len(),
            total = parsed.total_items,
            "Volumes search complete"
        );

        Ok(parsed.into_items())
    }
}
