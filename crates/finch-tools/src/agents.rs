use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, instrument};

use finch_core::messages::Message;
use finch_core::provider::{ChatProvider, ChatRequest, ToolChoice};
use finch_core::stream::StreamEvent;
use finch_engine::orchestrator::{AgentError, SubAgent};

const SYSTEM_PROMPT: &str = "You are a quantitative company-data analyst. \
Answer the request with specific figures and data points only; no advice, \
no hedging. If a figure is unavailable, say so plainly.";

/// Specialist sub-agent for quantitative company data. Runs one text-only
/// model pass over its instructions and returns the streamed answer.
pub struct CompanyDataAgent {
    provider: Arc<dyn ChatProvider>,
}

impl CompanyDataAgent {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SubAgent for CompanyDataAgent {
    fn name(&self) -> &str {
        "company_data_agent"
    }

    fn description(&self) -> &str {
        "Answers quantitative questions about a company: financials, ratios, fundamentals"
    }

    #[instrument(skip_all)]
    async fn run(&self, instructions: &str) -> Result<String, AgentError> {
        let request = ChatRequest::new(
            vec![Message::system(SYSTEM_PROMPT), Message::user(instructions)],
            Vec::new(),
            ToolChoice::None,
        );

        let mut stream = self
            .provider
            .stream(&request)
            .await
            .map_err(|e| AgentError::Failed(e.to_string()))?;

        let mut answer = String::new();
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Text { delta } => answer.push_str(&delta),
                StreamEvent::Usage { total_tokens } => {
                    debug!(total_tokens, "company data pass token usage");
                }
                StreamEvent::Error { error } => {
                    return Err(AgentError::Failed(error.to_string()));
                }
                StreamEvent::End => break,
                _ => {}
            }
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finch_core::errors::ProviderError;
    use finch_llm::{MockProvider, MockResponse};

    #[tokio::test]
    async fn collects_streamed_answer() {
        let provider = Arc::new(MockProvider::new(vec![MockResponse::stream_text_chunks(&[
            "Q2 revenue was ",
            "$24.9B.",
        ])]));
        let agent = CompanyDataAgent::new(Arc::clone(&provider) as Arc<dyn ChatProvider>);

        let answer = agent.run("What was Q2 revenue?").await.unwrap();
        assert_eq!(answer, "Q2 revenue was $24.9B.");

        // Text-only pass: no tools, tool choice none.
        let requests = provider.requests();
        assert_eq!(requests[0].tool_choice, ToolChoice::None);
        assert!(requests[0].tools.is_empty());
        assert_eq!(requests[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn provider_failure_becomes_agent_error() {
        let provider = Arc::new(MockProvider::new(vec![MockResponse::Error(
            ProviderError::NetworkError("down".into()),
        )]));
        let agent = CompanyDataAgent::new(provider);
        assert!(agent.run("anything").await.is_err());
    }

    #[tokio::test]
    async fn mid_stream_error_becomes_agent_error() {
        let provider = Arc::new(MockProvider::new(vec![MockResponse::Stream(vec![
            StreamEvent::Text { delta: "part".into() },
            StreamEvent::Error {
                error: ProviderError::StreamInterrupted("reset".into()),
            },
        ])]));
        let agent = CompanyDataAgent::new(provider);
        assert!(agent.run("anything").await.is_err());
    }
}
