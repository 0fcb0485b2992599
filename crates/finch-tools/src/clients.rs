//! Black-box data collaborators. The tools only see these traits; HTTP
//! adapters live in the submodules and tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod alpha_vantage;
pub mod chart_api;
pub mod retrieval_api;

pub use alpha_vantage::AlphaVantageNews;
pub use chart_api::ChartApiMarketData;
pub use retrieval_api::RetrievalApiIndex;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// A live quote. Either field may be missing outside trading hours or for
/// unknown symbols.
#[derive(Clone, Debug, Default)]
pub struct Quote {
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClosePrice {
    pub date: NaiveDate,
    pub close: f64,
}

#[async_trait]
pub trait MarketData: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<Quote, ClientError>;

    /// Closing price on a specific trading day; None on non-trading days.
    async fn close_on(&self, ticker: &str, date: NaiveDate) -> Result<Option<f64>, ClientError>;

    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ClosePrice>, ClientError>;
}

#[derive(Clone, Debug, Default)]
pub struct NewsQuery {
    pub query: String,
    pub tickers: Vec<String>,
    pub topics: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub published: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Most relevant recent stories for the query. At-least-relevant, not
    /// guaranteed complete.
    async fn top_stories(&self, query: &NewsQuery) -> Result<Vec<Article>, ClientError>;
}

#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Relevant filing excerpts for a ticker, most relevant first.
    async fn retrieve(&self, ticker: &str, query: &str) -> Result<Vec<String>, ClientError>;
}
