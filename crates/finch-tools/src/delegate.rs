use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use finch_core::tools::{Tool, ToolError, ToolResult};
use finch_engine::SubAgentOrchestrator;

/// Hands a research request to the sub-agent orchestrator and returns the
/// aggregated contributions as one model-facing string.
pub struct DelegateTool {
    orchestrator: Arc<SubAgentOrchestrator>,
}

impl DelegateTool {
    pub fn new(orchestrator: Arc<SubAgentOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        "delegate_research"
    }

    fn description(&self) -> &str {
        "Delegate a research request to specialist data agents and return their combined findings"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["instructions"],
            "properties": {
                "instructions": {
                    "type": "string",
                    "description": "The user's request plus all context the agents will need",
                },
            },
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let instructions = args["instructions"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("instructions is required".into()))?;

        let combined = self
            .orchestrator
            .orchestrate(instructions)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(ToolResult::text(combined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finch_core::ids::ToolCallId;
    use finch_core::stream::StreamEvent;
    use finch_engine::orchestrator::{AgentError, SubAgent};
    use finch_engine::AgentRegistry;
    use finch_llm::{MockProvider, MockResponse};

    struct StaticAgent;

    #[async_trait]
    impl SubAgent for StaticAgent {
        fn name(&self) -> &str {
            "company_data_agent"
        }
        fn description(&self) -> &str {
            "returns fixed data"
        }
        async fn run(&self, _instructions: &str) -> Result<String, AgentError> {
            Ok("Revenue grew 12% year over year.".into())
        }
    }

    fn delegation_events(agent: &str) -> Vec<StreamEvent> {
        vec![
            StreamEvent::ToolCallStart {
                index: 0,
                id: ToolCallId::from_raw("call_1"),
                name: agent.into(),
            },
            StreamEvent::ToolCallDelta {
                index: 0,
                fragment: "{\"instructions\":\"revenue?\"}".into(),
            },
            StreamEvent::End,
        ]
    }

    fn orchestrator(events: Vec<StreamEvent>) -> Arc<SubAgentOrchestrator> {
        let mut agents = AgentRegistry::new();
        agents.register(Arc::new(StaticAgent));
        Arc::new(SubAgentOrchestrator::new(
            Arc::new(MockProvider::new(vec![MockResponse::Stream(events)])),
            Arc::new(agents),
            "orchestrate",
        ))
    }

    #[tokio::test]
    async fn aggregate_returned_as_text_result() {
        let tool = DelegateTool::new(orchestrator(delegation_events("company_data_agent")));
        let result = tool
            .execute(json!({"instructions": "revenue?"}))
            .await
            .unwrap();
        assert!(!result.has_ui_payload());
        assert_eq!(result.response_content, "Revenue grew 12% year over year.");
    }

    #[tokio::test]
    async fn unknown_agent_surfaces_as_execution_error() {
        let tool = DelegateTool::new(orchestrator(delegation_events("ghost_agent")));
        let result = tool.execute(json!({"instructions": "revenue?"})).await;
        assert!(
            matches!(&result, Err(ToolError::ExecutionFailed(msg)) if msg.contains("ghost_agent"))
        );
    }

    #[tokio::test]
    async fn missing_instructions_is_an_argument_error() {
        let tool = DelegateTool::new(orchestrator(vec![StreamEvent::End]));
        let result = tool.execute(json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
