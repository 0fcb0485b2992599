use std::sync::Arc;
use std::sync::OnceLock;

use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, instrument};

use finch_core::ids::SessionId;
use finch_core::messages::{Conversation, Message};
use finch_core::provider::{ChatProvider, ChatRequest, ToolChoice};
use finch_core::stream::StreamEvent;
use finch_core::tools::ToolResult;

use crate::dispatcher::ToolDispatcher;
use crate::error::EngineError;
use crate::reassembler::{CompleteToolCall, StreamReassembler, TurnItem};
use crate::registry::ToolRegistry;

/// One incoming turn as the caller sent it, before normalization.
#[derive(Clone, Debug, Deserialize)]
pub struct RawTurn {
    pub role: String,
    pub content: String,
}

/// What a chat turn emits: plain text fragments and structured UI payloads,
/// in emission order. Consumers distinguish the two by payload shape.
#[derive(Clone, Debug)]
pub enum OutputItem {
    Text(String),
    Payload(ToolResult),
}

/// Owns one conversation for the duration of one chat exchange and runs the
/// two-pass turn loop: stream with tools enabled, dispatch whatever calls
/// complete, then (only if a tool ran) stream a text-only follow-up informed
/// by the appended function turns.
pub struct ConversationSession {
    id: SessionId,
    provider: Arc<dyn ChatProvider>,
    registry: Arc<ToolRegistry>,
    dispatcher: ToolDispatcher,
    conversation: Conversation,
}

impl ConversationSession {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        registry: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            provider,
            dispatcher: ToolDispatcher::new(Arc::clone(&registry)),
            registry,
            conversation: Conversation::with_system(system_prompt),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Run one full turn. Returns a stream of output items; text reaches the
    /// consumer as fast as the model produces it. The session is consumed;
    /// history lives exactly as long as the exchange.
    ///
    /// An unexpected failure mid-turn is logged and closes the stream with
    /// no error frame: the caller-facing protocol never carries errors.
    pub fn run_turn(mut self, raw_history: Vec<RawTurn>) -> ReceiverStream<OutputItem> {
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            if let Err(e) = self.drive_turn(raw_history, &tx).await {
                error!(session = %self.id, error = %e, "chat turn aborted; closing stream");
            }
        });

        ReceiverStream::new(rx)
    }

    #[instrument(skip_all, fields(session = %self.id))]
    async fn drive_turn(
        &mut self,
        raw_history: Vec<RawTurn>,
        tx: &mpsc::Sender<OutputItem>,
    ) -> Result<(), EngineError> {
        self.append_history(raw_history);

        // Pass 1: the model may answer directly or call tools.
        let calls = self.stream_pass(ToolChoice::Auto, tx).await?;
        if calls.is_empty() {
            return Ok(());
        }

        let dispatched = self
            .dispatcher
            .dispatch(calls, &mut self.conversation)
            .await;

        for item in dispatched {
            if item.result.has_ui_payload() {
                tx.send(OutputItem::Payload(item.result))
                    .await
                    .map_err(|_| EngineError::OutputClosed)?;
            }
        }

        // Pass 2: force a text-only answer informed by the function turns.
        let leftover = self.stream_pass(ToolChoice::None, tx).await?;
        debug_assert!(leftover.is_empty(), "tool calls under tool_choice=none");
        Ok(())
    }

    /// Normalize and append the caller's history. Only the most recent two
    /// turns get markup stripped; older turns are trusted as already clean.
    fn append_history(&mut self, raw_history: Vec<RawTurn>) {
        let clean_from = raw_history.len().saturating_sub(2);
        for (i, turn) in raw_history.into_iter().enumerate() {
            let content = if i >= clean_from {
                strip_markup(&turn.content)
            } else {
                turn.content
            };
            let message = match turn.role.as_str() {
                "assistant" => Message::assistant(content),
                "system" => Message::system(content),
                _ => Message::user(content),
            };
            self.conversation.push(message);
        }
    }

    /// Stream one model pass, forwarding text immediately and collecting the
    /// tool calls that complete during reassembly.
    async fn stream_pass(
        &mut self,
        tool_choice: ToolChoice,
        tx: &mpsc::Sender<OutputItem>,
    ) -> Result<Vec<CompleteToolCall>, EngineError> {
        let request = ChatRequest::new(
            self.conversation.as_slice().to_vec(),
            self.registry.definitions(),
            tool_choice,
        );

        let mut stream = self.provider.stream(&request).await?;
        let mut reassembler = StreamReassembler::new();
        let mut calls = Vec::new();

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Error { error } => return Err(EngineError::Provider(error)),
                event => {
                    if let StreamEvent::Usage { total_tokens } = &event {
                        debug!(session = %self.id, total_tokens = *total_tokens, "pass token usage");
                    }
                    for item in reassembler.feed(event) {
                        self.forward(item, tx, &mut calls).await?;
                    }
                }
            }
        }
        for item in reassembler.finish() {
            self.forward(item, tx, &mut calls).await?;
        }

        Ok(calls)
    }

    async fn forward(
        &self,
        item: TurnItem,
        tx: &mpsc::Sender<OutputItem>,
        calls: &mut Vec<CompleteToolCall>,
    ) -> Result<(), EngineError> {
        match item {
            TurnItem::Text(text) => tx
                .send(OutputItem::Text(text))
                .await
                .map_err(|_| EngineError::OutputClosed),
            TurnItem::Call(call) => {
                calls.push(call);
                Ok(())
            }
        }
    }
}

/// Strip `<...>` markup; the front end can echo rich text back into the
/// most recent turns.
fn strip_markup(content: &str) -> String {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    let re = MARKUP.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"));
    re.replace_all(content, "").trim().to_string()
}
