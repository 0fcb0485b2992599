use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handlers declare how they run: a Sync handler completes without
/// suspending, an Async handler awaits downstream I/O.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sync,
    Async,
}

/// Which front-end surface a tool result is destined for. `Text` means no
/// special UI payload; the result only feeds back into the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiType {
    Text,
    Ticker,
    LineChart,
    NewsFeed,
}

/// Standardised tool output. `response_content` is always present; the
/// model needs something to continue reasoning from even when there is no
/// UI payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub ui_type: UiType,
    pub ui_title: String,
    pub ui_content: Value,
    pub response_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ToolResult {
    /// A plain result: no UI payload, only model-facing content.
    pub fn text(response_content: impl Into<String>) -> Self {
        Self {
            ui_type: UiType::Text,
            ui_title: String::new(),
            ui_content: Value::Null,
            response_content: response_content.into(),
            target: None,
        }
    }

    /// A result carrying a structured UI payload alongside the model-facing
    /// content.
    pub fn with_ui(
        ui_type: UiType,
        ui_title: impl Into<String>,
        ui_content: Value,
        response_content: impl Into<String>,
    ) -> Self {
        Self {
            ui_type,
            ui_title: ui_title.into(),
            ui_content,
            response_content: response_content.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// True when the result must be forwarded to the caller as a structured
    /// payload in addition to being folded into history.
    pub fn has_ui_payload(&self) -> bool {
        self.ui_type != UiType::Text
    }
}

/// Tool definition advertised to the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: Value,
}

/// Trait implemented by each tool handler.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Async
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters_schema(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}
