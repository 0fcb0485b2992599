use serde::Deserialize;
use serde_json::{json, Value};

use finch_core::ids::ToolCallId;
use finch_core::provider::{ChatRequest, ToolChoice};
use finch_core::stream::StreamEvent;

/// Build the chat-completions request body. Streaming is always on, as is
/// parallel tool calling, so the model may open several calls in one response.
pub fn build_request_body(request: &ChatRequest, model: &str) -> Value {
    let mut body = json!({
        "model": model,
        "messages": request.messages,
        "stream": true,
        "stream_options": {"include_usage": true},
    });

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_schema,
                    },
                })
            })
            .collect();
        body["tools"] = json!(tools);
        body["parallel_tool_calls"] = json!(true);
    }

    body["tool_choice"] = json!(match request.tool_choice {
        ToolChoice::Auto => "auto",
        ToolChoice::None => "none",
        ToolChoice::Required => "required",
    });

    body
}

// --- Deserialization types for streamed completion chunks ---

#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<ChunkUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallChunk>>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallChunk {
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionChunk>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionChunk {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkUsage {
    pub total_tokens: u32,
}

/// Map one parsed chunk to stream events. A tool-call fragment with a
/// function name opens the call; argument bytes ride along as deltas. The
/// trailing usage-only chunk (empty choices) becomes a Usage event.
pub fn chunk_events(chunk: &ChatChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if chunk.choices.is_empty() {
        if let Some(usage) = &chunk.usage {
            events.push(StreamEvent::Usage {
                total_tokens: usage.total_tokens,
            });
        }
        return events;
    }

    for choice in &chunk.choices {
        if let Some(content) = &choice.delta.content {
            if !content.is_empty() {
                events.push(StreamEvent::Text {
                    delta: content.clone(),
                });
            }
        }

        let Some(tool_calls) = &choice.delta.tool_calls else {
            continue;
        };
        for tc in tool_calls {
            let name = tc.function.as_ref().and_then(|f| f.name.as_deref());
            if let Some(name) = name {
                let id = tc
                    .id
                    .as_deref()
                    .map(ToolCallId::from_raw)
                    .unwrap_or_default();
                events.push(StreamEvent::ToolCallStart {
                    index: tc.index,
                    id,
                    name: name.to_string(),
                });
            }
            let arguments = tc.function.as_ref().and_then(|f| f.arguments.as_deref());
            if let Some(arguments) = arguments {
                if !arguments.is_empty() {
                    events.push(StreamEvent::ToolCallDelta {
                        index: tc.index,
                        fragment: arguments.to_string(),
                    });
                }
            }
        }
    }

    events
}

/// Parse one SSE data line. Returns None for non-data lines and chunks that
/// fail to deserialize (keep-alives, vendor extensions).
pub fn parse_data_line(line: &str) -> Option<DataFrame> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(DataFrame::Done);
    }
    serde_json::from_str::<ChatChunk>(data)
        .ok()
        .map(DataFrame::Chunk)
}

#[derive(Debug)]
pub enum DataFrame {
    Chunk(ChatChunk),
    Done,
}
