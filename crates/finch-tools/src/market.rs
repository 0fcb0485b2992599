use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::warn;

use finch_core::tools::{Tool, ToolError, ToolResult, UiType};

use crate::clients::MarketData;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current or dated price lookup for a single ticker.
pub struct StockPriceTool {
    market: Arc<dyn MarketData>,
}

impl StockPriceTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }

    async fn price_on(&self, ticker: &str, date_raw: &str) -> Result<ToolResult, ToolError> {
        let Ok(date) = NaiveDate::parse_from_str(date_raw, DATE_FORMAT) else {
            return Ok(ToolResult::text("Invalid date format. Please use YYYY-MM-DD."));
        };

        match self.market.close_on(ticker, date).await {
            Ok(Some(close)) => Ok(ToolResult::with_ui(
                UiType::Ticker,
                format!("Ticker: {ticker} on {date_raw}"),
                json!(format!("{close:.2}")),
                format!("The closing price of {ticker} on {date_raw} was: ${close:.2}"),
            )),
            Ok(None) => Ok(ToolResult::text(format!(
                "No trading data available for {ticker} on {date_raw}. It might have been a non-trading day."
            ))),
            Err(e) => {
                warn!(ticker, error = %e, "historical price lookup failed");
                Ok(ToolResult::text("Unable to retrieve stock price."))
            }
        }
    }

    async fn live_price(&self, ticker: &str) -> Result<ToolResult, ToolError> {
        let quote = match self.market.quote(ticker).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(ticker, error = %e, "quote lookup failed");
                return Ok(ToolResult::text("Unable to retrieve stock price."));
            }
        };

        if let Some(price) = quote.price {
            return Ok(ToolResult::with_ui(
                UiType::Ticker,
                format!("Ticker: {ticker}"),
                json!(format!("{price:.2}")),
                format!("The current price of {ticker} is: ${price:.2}"),
            ));
        }
        if let Some(close) = quote.previous_close {
            return Ok(ToolResult::with_ui(
                UiType::Ticker,
                format!("Ticker: {ticker}"),
                json!(format!("{close:.2}")),
                format!("The market is currently closed. The last closing price of {ticker} was: ${close:.2}"),
            ));
        }
        Ok(ToolResult::text(format!(
            "Could not retrieve the current or previous close price for {ticker}."
        )))
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &str {
        "get_stock_price"
    }

    fn description(&self) -> &str {
        "Get the current stock price for a ticker, or the closing price on a specific date"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["ticker"],
            "properties": {
                "ticker": {
                    "type": "string",
                    "description": "The stock ticker symbol, e.g. AAPL",
                },
                "date": {
                    "type": "string",
                    "description": "Optional date in YYYY-MM-DD format for a historical close",
                },
            },
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let ticker = args["ticker"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("ticker is required".into()))?
            .to_uppercase();

        match args["date"].as_str() {
            Some(date) => self.price_on(&ticker, date).await,
            None => self.live_price(&ticker).await,
        }
    }
}

/// Daily closing prices over a date range, for charting.
pub struct HistoricalDataTool {
    market: Arc<dyn MarketData>,
}

impl HistoricalDataTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for HistoricalDataTool {
    fn name(&self) -> &str {
        "get_historical_stock_data"
    }

    fn description(&self) -> &str {
        "Get daily closing prices for a ticker over a date range"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["ticker", "start_date", "end_date"],
            "properties": {
                "ticker": {"type": "string", "description": "The stock ticker symbol"},
                "start_date": {"type": "string", "description": "Range start, YYYY-MM-DD"},
                "end_date": {"type": "string", "description": "Range end, YYYY-MM-DD"},
            },
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let (Some(ticker), Some(start_raw), Some(end_raw)) = (
            args["ticker"].as_str(),
            args["start_date"].as_str(),
            args["end_date"].as_str(),
        ) else {
            return Ok(ToolResult::text(
                "Please provide a valid ticker, start date, and end date.",
            ));
        };
        let ticker = ticker.to_uppercase();

        let (Ok(start), Ok(end)) = (
            NaiveDate::parse_from_str(start_raw, DATE_FORMAT),
            NaiveDate::parse_from_str(end_raw, DATE_FORMAT),
        ) else {
            return Ok(ToolResult::text("Invalid date format. Please use YYYY-MM-DD."));
        };

        let closes = match self.market.daily_closes(&ticker, start, end).await {
            Ok(closes) => closes,
            Err(e) => {
                warn!(%ticker, error = %e, "historical data lookup failed");
                return Ok(ToolResult::text("Unable to retrieve historical stock data."));
            }
        };

        if closes.is_empty() {
            return Ok(ToolResult::text(format!(
                "No historical data found for {ticker} in the specified date range."
            )));
        }

        let points: Vec<Value> = closes
            .iter()
            .map(|c| json!({"date": c.date.format(DATE_FORMAT).to_string(), "close": c.close}))
            .collect();

        Ok(ToolResult::with_ui(
            UiType::LineChart,
            format!("Historical data for {ticker}"),
            json!(points),
            format!("Successfully retrieved historical data for {ticker} from {start_raw} to {end_raw}."),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, ClosePrice, Quote};

    struct FakeMarket {
        quote: Result<Quote, ()>,
        closes: Vec<ClosePrice>,
    }

    impl FakeMarket {
        fn with_quote(price: Option<f64>, previous_close: Option<f64>) -> Arc<Self> {
            Arc::new(Self {
                quote: Ok(Quote { price, previous_close }),
                closes: Vec::new(),
            })
        }

        fn with_closes(closes: Vec<ClosePrice>) -> Arc<Self> {
            Arc::new(Self {
                quote: Ok(Quote::default()),
                closes,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                quote: Err(()),
                closes: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl MarketData for FakeMarket {
        async fn quote(&self, _ticker: &str) -> Result<Quote, ClientError> {
            self.quote
                .clone()
                .map_err(|()| ClientError::Request("down".into()))
        }

        async fn close_on(
            &self,
            _ticker: &str,
            date: NaiveDate,
        ) -> Result<Option<f64>, ClientError> {
            if self.quote.is_err() {
                return Err(ClientError::Request("down".into()));
            }
            Ok(self.closes.iter().find(|c| c.date == date).map(|c| c.close))
        }

        async fn daily_closes(
            &self,
            _ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<ClosePrice>, ClientError> {
            if self.quote.is_err() {
                return Err(ClientError::Request("down".into()));
            }
            Ok(self
                .closes
                .iter()
                .filter(|c| c.date >= start && c.date <= end)
                .cloned()
                .collect())
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[tokio::test]
    async fn live_price_produces_ticker_payload() {
        let tool = StockPriceTool::new(FakeMarket::with_quote(Some(190.123), None));
        let result = tool.execute(json!({"ticker": "aapl"})).await.unwrap();

        assert_eq!(result.ui_type, UiType::Ticker);
        assert_eq!(result.ui_title, "Ticker: AAPL");
        assert_eq!(result.ui_content, json!("190.12"));
        assert!(result.response_content.contains("$190.12"));
    }

    #[tokio::test]
    async fn closed_market_falls_back_to_previous_close() {
        let tool = StockPriceTool::new(FakeMarket::with_quote(None, Some(188.5)));
        let result = tool.execute(json!({"ticker": "AAPL"})).await.unwrap();

        assert_eq!(result.ui_type, UiType::Ticker);
        assert!(result.response_content.contains("market is currently closed"));
        assert!(result.response_content.contains("$188.50"));
    }

    #[tokio::test]
    async fn no_price_at_all_degrades_to_text() {
        let tool = StockPriceTool::new(FakeMarket::with_quote(None, None));
        let result = tool.execute(json!({"ticker": "ZZZZ"})).await.unwrap();
        assert_eq!(result.ui_type, UiType::Text);
        assert!(result.response_content.contains("Could not retrieve"));
    }

    #[tokio::test]
    async fn dated_lookup_returns_closing_price() {
        let tool = StockPriceTool::new(FakeMarket::with_closes(vec![ClosePrice {
            date: date("2024-03-15"),
            close: 172.62,
        }]));
        let result = tool
            .execute(json!({"ticker": "AAPL", "date": "2024-03-15"}))
            .await
            .unwrap();

        assert_eq!(result.ui_type, UiType::Ticker);
        assert_eq!(result.ui_title, "Ticker: AAPL on 2024-03-15");
        assert!(result.response_content.contains("closing price"));
        assert!(result.response_content.contains("$172.62"));
    }

    #[tokio::test]
    async fn non_trading_day_explains_itself() {
        let tool = StockPriceTool::new(FakeMarket::with_closes(Vec::new()));
        let result = tool
            .execute(json!({"ticker": "AAPL", "date": "2024-03-16"}))
            .await
            .unwrap();
        assert_eq!(result.ui_type, UiType::Text);
        assert!(result.response_content.contains("non-trading day"));
    }

    #[tokio::test]
    async fn bad_date_format_is_instructive() {
        let tool = StockPriceTool::new(FakeMarket::with_closes(Vec::new()));
        let result = tool
            .execute(json!({"ticker": "AAPL", "date": "03/15/2024"}))
            .await
            .unwrap();
        assert!(result.response_content.contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn provider_failure_maps_to_apology() {
        let tool = StockPriceTool::new(FakeMarket::failing());
        let result = tool.execute(json!({"ticker": "AAPL"})).await.unwrap();
        assert_eq!(result.ui_type, UiType::Text);
        assert_eq!(result.response_content, "Unable to retrieve stock price.");
    }

    #[tokio::test]
    async fn missing_ticker_is_an_argument_error() {
        let tool = StockPriceTool::new(FakeMarket::with_quote(Some(1.0), None));
        let result = tool.execute(json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn historical_range_produces_line_chart() {
        let tool = HistoricalDataTool::new(FakeMarket::with_closes(vec![
            ClosePrice { date: date("2024-01-02"), close: 248.42 },
            ClosePrice { date: date("2024-01-03"), close: 251.03 },
        ]));
        let result = tool
            .execute(json!({
                "ticker": "tsla",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
            }))
            .await
            .unwrap();

        assert_eq!(result.ui_type, UiType::LineChart);
        assert_eq!(result.ui_title, "Historical data for TSLA");
        let points = result.ui_content.as_array().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0]["date"], "2024-01-02");
        assert_eq!(points[0]["close"], 248.42);
        assert!(result.response_content.contains("2024-01-01"));
    }

    #[tokio::test]
    async fn empty_range_degrades_to_text() {
        let tool = HistoricalDataTool::new(FakeMarket::with_closes(Vec::new()));
        let result = tool
            .execute(json!({
                "ticker": "TSLA",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
            }))
            .await
            .unwrap();
        assert_eq!(result.ui_type, UiType::Text);
        assert!(result.response_content.contains("No historical data"));
    }

    #[tokio::test]
    async fn missing_range_arguments_are_instructive() {
        let tool = HistoricalDataTool::new(FakeMarket::with_closes(Vec::new()));
        let result = tool.execute(json!({"ticker": "TSLA"})).await.unwrap();
        assert!(result
            .response_content
            .contains("valid ticker, start date, and end date"));
    }
}
