use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::messages::Message;
use crate::stream::StreamEvent;
use crate::tools::ToolDefinition;

/// Constrains whether the model may answer directly, must call a tool, or
/// may do either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

/// One streaming request to the model endpoint.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>, tools: Vec<ToolDefinition>, tool_choice: ToolChoice) -> Self {
        Self {
            messages,
            tools,
            tool_choice,
        }
    }
}

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// The model-streaming collaborator. Must honor the tool-choice policy and
/// support multiple tool calls within one response.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn stream(&self, request: &ChatRequest) -> Result<EventStream, ProviderError>;
}
