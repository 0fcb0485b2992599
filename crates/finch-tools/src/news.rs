use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use finch_core::tools::{Tool, ToolError, ToolResult, UiType};

use crate::clients::{NewsProvider, NewsQuery};

/// Relevant market news, routed to the news panel.
pub struct NewsTool {
    news: Arc<dyn NewsProvider>,
}

impl NewsTool {
    pub fn new(news: Arc<dyn NewsProvider>) -> Self {
        Self { news }
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Tool for NewsTool {
    fn name(&self) -> &str {
        "get_news"
    }

    fn description(&self) -> &str {
        "Get recent news articles relevant to tickers or market topics"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The user's question, for context"},
                "tickers": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Ticker symbols the news should cover",
                },
                "topics": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Market topics, e.g. earnings, ipo, mergers_and_acquisitions",
                },
            },
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let query = NewsQuery {
            query: args["query"].as_str().unwrap_or_default().to_string(),
            tickers: string_list(&args["tickers"]),
            topics: string_list(&args["topics"]),
        };

        let articles = match self.news.top_stories(&query).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(error = %e, "news lookup failed");
                return Ok(ToolResult::text("Unable to retrieve news at this time."));
            }
        };

        if articles.is_empty() {
            return Ok(ToolResult::text(
                "No relevant news found for the specified tickers.",
            ));
        }

        let tickers_str = query.tickers.join(", ");
        let count = articles.len();
        Ok(ToolResult::with_ui(
            UiType::NewsFeed,
            "Latest News",
            serde_json::to_value(&articles)
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?,
            format!(
                "I've found {count} relevant news articles about {tickers_str}. \
                 You can view them in the News panel on the right side of your screen."
            ),
        )
        .with_target("news_space"))
    }
}
