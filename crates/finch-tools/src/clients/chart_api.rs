use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use super::{ClientError, ClosePrice, MarketData, Quote};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Market-data adapter over a Yahoo-style chart API.
pub struct ChartApiMarketData {
    client: reqwest::Client,
    base_url: String,
}

impl ChartApiMarketData {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent("finch/0.1")
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn chart(&self, ticker: &str, params: &[(&str, String)]) -> Result<Value, ClientError> {
        let url = format!("{}/v8/finance/chart/{ticker}", self.base_url);
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Request(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Payload(e.to_string()))
    }
}

impl Default for ChartApiMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for ChartApiMarketData {
    async fn quote(&self, ticker: &str) -> Result<Quote, ClientError> {
        let body = self
            .chart(
                ticker,
                &[("interval", "1d".into()), ("range", "1d".into())],
            )
            .await?;
        Ok(parse_quote(&body))
    }

    async fn close_on(&self, ticker: &str, date: NaiveDate) -> Result<Option<f64>, ClientError> {
        let next = date.succ_opt().unwrap_or(date);
        let closes = self.daily_closes(ticker, date, next).await?;
        Ok(closes.iter().find(|c| c.date == date).map(|c| c.close))
    }

    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ClosePrice>, ClientError> {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let body = self
            .chart(
                ticker,
                &[
                    ("interval", "1d".into()),
                    ("period1", period1.to_string()),
                    ("period2", period2.to_string()),
                ],
            )
            .await?;
        parse_daily_closes(&body)
    }
}

fn parse_quote(body: &Value) -> Quote {
    let meta = &body["chart"]["result"][0]["meta"];
    Quote {
        price: meta["regularMarketPrice"].as_f64(),
        previous_close: meta["chartPreviousClose"]
            .as_f64()
            .or_else(|| meta["previousClose"].as_f64()),
    }
}

fn parse_daily_closes(body: &Value) -> Result<Vec<ClosePrice>, ClientError> {
    let result = &body["chart"]["result"][0];
    let timestamps = result["timestamp"]
        .as_array()
        .ok_or_else(|| ClientError::Payload("missing timestamps".into()))?;
    let closes = result["indicators"]["quote"][0]["close"]
        .as_array()
        .ok_or_else(|| ClientError::Payload("missing close series".into()))?;

    let mut points = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes.iter()) {
        let (Some(ts), Some(close)) = (ts.as_i64(), close.as_f64()) else {
            continue; // null close on holidays
        };
        let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        points.push(ClosePrice { date, close });
    }
    Ok(points)
}
