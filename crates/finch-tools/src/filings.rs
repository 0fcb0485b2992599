use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use finch_core::tools::{Tool, ToolError, ToolResult};

use crate::clients::DocumentIndex;

/// Regulatory-filing excerpts from the document index, keyed by ticker and
/// keyword query.
pub struct FilingsTool {
    index: Arc<dyn DocumentIndex>,
}

impl FilingsTool {
    pub fn new(index: Arc<dyn DocumentIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for FilingsTool {
    fn name(&self) -> &str {
        "retrieve_filing"
    }

    fn description(&self) -> &str {
        "Retrieve relevant excerpts from a company's regulatory filings"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["ticker", "keywords"],
            "properties": {
                "ticker": {"type": "string", "description": "The company's ticker symbol"},
                "keywords": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Keywords describing the passages to retrieve",
                },
            },
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let ticker = args["ticker"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("ticker is required".into()))?
            .to_uppercase();
        let keywords: Vec<&str> = args["keywords"]
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        let query = keywords.join(" ");

        let chunks = match self.index.retrieve(&ticker, &query).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(%ticker, error = %e, "filing retrieval failed");
                return Ok(ToolResult::text("Unable to retrieve filings at this time."));
            }
        };

        if chunks.is_empty() {
            return Ok(ToolResult::text(format!(
                "No filing excerpts found for {ticker}."
            )));
        }

        Ok(ToolResult::text(chunks.concat()))
    }
}
