use std::sync::Arc;

use tracing::{debug, info, warn};

use finch_core::messages::{Conversation, Message};
use finch_core::tools::ToolResult;

use crate::reassembler::CompleteToolCall;
use crate::registry::ToolRegistry;

/// A tool result paired with the call that produced it.
#[derive(Debug)]
pub struct DispatchedCall {
    pub call: CompleteToolCall,
    pub result: ToolResult,
}

/// Executes reassembled tool calls in arrival order and folds each result
/// into the conversation as a function-role turn.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Run every call, in order. Each call (including an unknown tool name
    /// or a failed handler) appends exactly one function-role message so
    /// the model can recover conversationally on the follow-up pass.
    pub async fn dispatch(
        &self,
        calls: Vec<CompleteToolCall>,
        conversation: &mut Conversation,
    ) -> Vec<DispatchedCall> {
        let mut dispatched = Vec::with_capacity(calls.len());

        for call in calls {
            let result = self.execute(&call).await;

            conversation.push(Message::function(
                call.id.clone(),
                call.name.clone(),
                result.response_content.clone(),
            ));

            dispatched.push(DispatchedCall { call, result });
        }

        dispatched
    }

    async fn execute(&self, call: &CompleteToolCall) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "model requested an unregistered tool");
            return ToolResult::text(format!("Error: function {} does not exist", call.name));
        };

        info!(tool = %call.name, mode = ?tool.execution_mode(), "executing tool call");
        debug!(tool = %call.name, args = %call.arguments, "tool arguments");

        match tool.execute(call.arguments.clone()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool execution failed");
                ToolResult::text(format!(
                    "The {} tool could not complete the request: {e}",
                    call.name
                ))
            }
        }
    }
}
