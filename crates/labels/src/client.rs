use tracing::warn;

use crate::error::LabelError;
use crate::record::{AppendRequest, AppendResponse, LabelRecord, NewLabel, sanitize_world};

/// HTTP client for a label server (`GET`/`POST /api/labels`).
#[derive(Debug, Clone)]
pub struct LabelClient {
    http: reqwest::Client,
    base_url: String,
}

impl LabelClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn labels_url(&self) -> String {
        format!("{}/api/labels", self.base_url)
    }

    pub async fn fetch_all(&self, world: &str) -> Result<Vec<LabelRecord>, LabelError> {
        let resp = self
            .http
            .get(self.labels_url())
            .query(&[("world", sanitize_world(world))])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Labels for `world`, or none at all if the service is unavailable.
    pub async fn fetch_all_or_empty(&self, world: &str) -> Vec<LabelRecord> {
        match self.fetch_all(world).await {
            Ok(labels) => labels,
            Err(err) => {
                warn!("labels for {world} unavailable: {err}");
                Vec::new()
            }
        }
    }

    /// Submit one label; returns the world's label count afterwards.
    pub async fn append(&self, world: &str, label: NewLabel) -> Result<usize, LabelError> {
        let body = AppendRequest {
            world: sanitize_world(world),
            label,
        };
        let resp: AppendResponse = self
            .http
            .post(self.labels_url())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = LabelClient::new("http://labels.test/");
        assert_eq!(client.labels_url(), "http://labels.test/api/labels");
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_no_labels() {
        // Port 9 (discard) is closed on test hosts; the connect fails fast.
        let client = LabelClient::new("http://127.0.0.1:9");
        assert!(matches!(client.fetch_all("earth").await, Err(LabelError::Network(_))));
        assert!(client.fetch_all_or_empty("earth").await.is_empty());
    }
}
