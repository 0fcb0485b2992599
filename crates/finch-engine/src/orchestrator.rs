use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error, info, instrument, warn};

use finch_core::messages::Message;
use finch_core::provider::{ChatProvider, ChatRequest, ToolChoice};
use finch_core::stream::StreamEvent;

use crate::arguments::{ArgumentBuffer, BufferState};
use crate::error::EngineError;
use crate::registry::AgentRegistry;

/// A delegated reasoning unit: takes natural-language instructions, returns
/// one textual contribution. Run concurrently with its peers.
#[async_trait]
pub trait SubAgent: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, instructions: &str) -> Result<String, AgentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{0}")]
    Failed(String),
}

struct PendingDelegation {
    agent_name: String,
    buffer: ArgumentBuffer,
}

/// Fans a delegation request out to named sub-agents.
///
/// Runs its own model pass with tool choice `required` (the model must
/// delegate, not answer) and launches each delegation the moment its
/// argument buffer first parses, without waiting for the stream to end.
/// Each index dispatches at most once; a misrouted delegation (unknown
/// agent) aborts the whole call, because the prompting layer's
/// call-each-agent-exactly-once policy cannot be partially recovered.
pub struct SubAgentOrchestrator {
    provider: Arc<dyn ChatProvider>,
    agents: Arc<AgentRegistry>,
    system_prompt: String,
}

impl SubAgentOrchestrator {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        agents: Arc<AgentRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            agents,
            system_prompt: system_prompt.into(),
        }
    }

    /// Run one orchestration call. Returns the contributions of every
    /// launched agent, concatenated in launch order.
    #[instrument(skip(self, prompt))]
    pub async fn orchestrate(&self, prompt: &str) -> Result<String, EngineError> {
        let request = ChatRequest::new(
            vec![
                Message::system(self.system_prompt.clone()),
                Message::user(prompt),
            ],
            self.agents.definitions(),
            ToolChoice::Required,
        );

        let mut stream = self.provider.stream(&request).await?;

        let mut pending: HashMap<usize, PendingDelegation> = HashMap::new();
        let mut dispatched: HashSet<usize> = HashSet::new();
        let mut launched: Vec<(String, tokio::task::JoinHandle<Result<String, AgentError>>)> =
            Vec::new();

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::ToolCallStart { index, name, .. } => {
                    if dispatched.contains(&index) {
                        debug!(index, "fragment for already-dispatched index; ignored");
                        continue;
                    }
                    pending.insert(
                        index,
                        PendingDelegation {
                            agent_name: name,
                            buffer: ArgumentBuffer::new(),
                        },
                    );
                }

                StreamEvent::ToolCallDelta { index, fragment } => {
                    if dispatched.contains(&index) {
                        debug!(index, "fragment for already-dispatched index; ignored");
                        continue;
                    }
                    let Some(delegation) = pending.get_mut(&index) else {
                        warn!(index, "argument fragment for unknown delegation; dropped");
                        continue;
                    };
                    delegation.buffer.push(&fragment);
                    if delegation.buffer.state() != BufferState::Balanced {
                        continue;
                    }
                    let Ok(args) = delegation.buffer.parse() else {
                        continue;
                    };

                    // Arguments are complete: launch now, and remove the index
                    // so later fragments can never dispatch it again.
                    let delegation = pending.remove(&index).expect("pending entry exists");
                    dispatched.insert(index);

                    let Some(agent) = self.agents.get(&delegation.agent_name) else {
                        error!(agent = %delegation.agent_name, "delegation to unknown agent");
                        return Err(EngineError::UnknownAgent(delegation.agent_name));
                    };

                    let instructions = args["instructions"].as_str().unwrap_or_default().to_string();
                    info!(agent = %delegation.agent_name, "launching delegation");
                    let handle =
                        tokio::spawn(async move { agent.run(&instructions).await });
                    launched.push((delegation.agent_name, handle));
                }

                StreamEvent::Text { delta } => {
                    // Tool choice is `required`; stray text carries nothing.
                    debug!(len = delta.len(), "ignoring text from delegation pass");
                }

                StreamEvent::Usage { total_tokens } => {
                    debug!(total_tokens, "delegation pass token usage");
                }

                StreamEvent::End => break,

                StreamEvent::Error { error } => return Err(EngineError::Provider(error)),
            }
        }

        if launched.is_empty() {
            warn!("delegation pass produced no agent calls");
            return Ok("No agents were called.".to_string());
        }

        // Join in launch order; a failed unit contributes a placeholder
        // instead of cancelling its siblings.
        let mut parts = Vec::with_capacity(launched.len());
        for (name, handle) in launched {
            match handle.await {
                Ok(Ok(text)) => parts.push(text),
                Ok(Err(e)) => {
                    warn!(agent = %name, error = %e, "delegated agent failed");
                    parts.push(format!("[{name} failed: {e}]"));
                }
                Err(e) => {
                    error!(agent = %name, error = %e, "delegated agent task panicked");
                    parts.push(format!("[{name} failed]"));
                }
            }
        }

        Ok(parts.join(" "))
    }
}
