use crate::errors::ProviderError;
use crate::ids::ToolCallId;

/// Events emitted during model streaming. Tool-call fragments are keyed by
/// stream index, the only correlation key stable across fragments (the call
/// id is only present on the start fragment). Ordering contract:
///
/// (Text | ToolCallStart → ToolCallDelta*)* → Usage? → End
///
/// Error can appear at any point and terminates the turn.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// A visible answer fragment. Forwarded downstream immediately.
    Text { delta: String },

    /// A new tool call opened under stream slot `index`.
    ToolCallStart {
        index: usize,
        id: ToolCallId,
        name: String,
    },

    /// An argument fragment for the call under `index`.
    ToolCallDelta { index: usize, fragment: String },

    /// Token accounting, delivered after all content.
    Usage { total_tokens: u32 },

    /// End of the model turn.
    End,

    Error { error: ProviderError },
}

impl StreamEvent {
    /// Terminal events finalize any still-pending tool calls.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Error { .. })
    }

    pub fn is_tool_fragment(&self) -> bool {
        matches!(self, Self::ToolCallStart { .. } | Self::ToolCallDelta { .. })
    }
}
