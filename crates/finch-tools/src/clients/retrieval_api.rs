use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{ClientError, DocumentIndex};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Adapter over the filing-retrieval service: `retrieve(ticker, query)`
/// against a vector index maintained elsewhere.
pub struct RetrievalApiIndex {
    client: reqwest::Client,
    base_url: String,
}

impl RetrievalApiIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent("finch/0.1")
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DocumentIndex for RetrievalApiIndex {
    async fn retrieve(&self, ticker: &str, query: &str) -> Result<Vec<String>, ClientError> {
        let response = self
            .client
            .get(format!("{}/retrieve", self.base_url))
            .query(&[("ticker", ticker), ("q", query)])
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Request(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Payload(e.to_string()))?;

        parse_chunks(&body)
    }
}

fn parse_chunks(body: &Value) -> Result<Vec<String>, ClientError> {
    let chunks = body["chunks"]
        .as_array()
        .ok_or_else(|| ClientError::Payload("missing chunks".into()))?;
    Ok(chunks
        .iter()
        .filter_map(|c| c.as_str().map(String::from))
        .collect())
}
