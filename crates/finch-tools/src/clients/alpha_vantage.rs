use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::{Article, ClientError, NewsProvider, NewsQuery};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const FEED_LIMIT: usize = 5;

/// News adapter over the Alpha Vantage news-sentiment endpoint.
pub struct AlphaVantageNews {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl AlphaVantageNews {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent("finch/0.1")
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl NewsProvider for AlphaVantageNews {
    async fn top_stories(&self, query: &NewsQuery) -> Result<Vec<Article>, ClientError> {
        let mut params: Vec<(&str, String)> = vec![
            ("function", "NEWS_SENTIMENT".into()),
            ("apikey", self.api_key.expose_secret().to_string()),
            ("limit", FEED_LIMIT.to_string()),
            ("sort", "RELEVANCE".into()),
        ];
        if !query.tickers.is_empty() {
            params.push(("tickers", query.tickers.join(",")));
        }
        if !query.topics.is_empty() {
            params.push(("topics", query.topics.join(",")));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
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

        Ok(parse_feed(&body))
    }
}

fn parse_feed(body: &Value) -> Vec<Article> {
    let Some(feed) = body["feed"].as_array() else {
        return Vec::new();
    };
    feed.iter()
        .take(FEED_LIMIT)
        .map(|item| Article {
            title: item["title"].as_str().unwrap_or("Unknown Title").to_string(),
            summary: item["summary"].as_str().unwrap_or_default().to_string(),
            source: item["source"].as_str().unwrap_or("Unknown Source").to_string(),
            published: item["time_published"]
                .as_str()
                .unwrap_or("Unknown Timestamp")
                .to_string(),
            url: item["url"].as_str().map(String::from),
        })
        .collect()
}
