use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;

use finch_core::errors::ProviderError;
use finch_core::ids::ToolCallId;
use finch_core::provider::{ChatProvider, ChatRequest, EventStream};
use finch_core::stream::StreamEvent;

/// Pre-programmed responses for deterministic testing without API calls.
pub enum MockResponse {
    /// Yield a sequence of StreamEvents.
    Stream(Vec<StreamEvent>),
    /// Return an error from the stream() call itself.
    Error(ProviderError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    /// Convenience: a text-only response delivered as one delta.
    pub fn stream_text(text: &str) -> Self {
        Self::stream_text_chunks(&[text])
    }

    /// Convenience: a text-only response split into the given deltas.
    pub fn stream_text_chunks(chunks: &[&str]) -> Self {
        let mut events: Vec<StreamEvent> = chunks
            .iter()
            .map(|c| StreamEvent::Text { delta: (*c).to_string() })
            .collect();
        events.push(StreamEvent::End);
        Self::Stream(events)
    }

    /// Convenience: a response containing one complete tool call, its
    /// argument JSON split into the given fragments.
    pub fn stream_tool_call(id: &str, name: &str, fragments: &[&str]) -> Self {
        let mut events = vec![StreamEvent::ToolCallStart {
            index: 0,
            id: ToolCallId::from_raw(id),
            name: name.to_string(),
        }];
        events.extend(fragments.iter().map(|f| StreamEvent::ToolCallDelta {
            index: 0,
            fragment: (*f).to_string(),
        }));
        events.push(StreamEvent::End);
        Self::Stream(events)
    }

    /// Convenience: wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock provider that returns pre-programmed responses in sequence and
/// records every request it receives, so tests can assert on message
/// history and tool-choice policy per pass.
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// All requests received so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn stream(&self, request: &ChatRequest) -> Result<EventStream, ProviderError> {
        self.requests.lock().push(request.clone());

        let response = self.responses.lock().pop_front().ok_or_else(|| {
            ProviderError::InvalidRequest("MockProvider: no response configured for call".into())
        })?;

        resolve_response(response).await
    }
}

/// Resolve a MockResponse, handling Delay by sleeping first.
/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_response(response: MockResponse) -> Result<EventStream, ProviderError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Stream(events) => {
                return Ok(Box::pin(stream::iter(events)));
            }
            MockResponse::Error(e) => return Err(e),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}
