use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use finch_core::tools::{ExecutionMode, Tool, ToolError, ToolResult};

/// The user's portfolio, read from a configured JSON file. Declared Sync:
/// a local file read, no downstream suspension.
pub struct PortfolioTool {
    path: PathBuf,
}

impl PortfolioTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Tool for PortfolioTool {
    fn name(&self) -> &str {
        "retrieve_portfolio"
    }

    fn description(&self) -> &str {
        "Retrieve the user's current portfolio holdings"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Sync
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult, ToolError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "portfolio file unreadable");
                return Ok(ToolResult::text("Unable to retrieve the portfolio right now."));
            }
        };

        // Re-encode so the model sees one compact, valid JSON document.
        match serde_json::from_str::<Value>(&raw) {
            Ok(portfolio) => Ok(ToolResult::text(portfolio.to_string())),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "portfolio file is not valid JSON");
                Ok(ToolResult::text("Unable to retrieve the portfolio right now."))
            }
        }
    }
}
