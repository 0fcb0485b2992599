use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Future, Stream};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use finch_core::errors::ProviderError;
use finch_core::provider::{ChatProvider, ChatRequest, EventStream};
use finch_core::stream::StreamEvent;

use crate::wire::{self, DataFrame};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const SSE_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Streaming client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: SecretString,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, tool_choice = ?request.tool_choice))]
    async fn stream(&self, request: &ChatRequest) -> Result<EventStream, ProviderError> {
        let body = wire::build_request_body(request, &self.model);

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .header("accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let byte_stream = resp.bytes_stream();
        Ok(Box::pin(SseStream::new(byte_stream)))
    }
}

/// Wraps a byte stream from reqwest and yields StreamEvents.
/// Includes an idle timeout: if no data arrives within `idle_duration`,
/// emits an error event.
struct SseStream {
    inner: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
    buffer: String,
    pending: Vec<StreamEvent>,
    done: bool,
    idle_deadline: Pin<Box<tokio::time::Sleep>>,
    idle_duration: Duration,
}

impl SseStream {
    fn new(
        byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self::with_idle_timeout(byte_stream, SSE_IDLE_TIMEOUT)
    }

    fn with_idle_timeout(
        byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: String::new(),
            pending: Vec::new(),
            done: false,
            idle_deadline: Box::pin(tokio::time::sleep(idle_timeout)),
            idle_duration: idle_timeout,
        }
    }

    fn drain_block(&mut self, block: &str) {
        if self.done {
            return;
        }
        for line in block.lines() {
            match wire::parse_data_line(line) {
                Some(DataFrame::Chunk(chunk)) => {
                    self.pending.extend(wire::chunk_events(&chunk));
                }
                Some(DataFrame::Done) => {
                    self.pending.push(StreamEvent::End);
                    self.done = true;
                    break;
                }
                None => {}
            }
        }
    }
}

impl Stream for SseStream {
    type Item = StreamEvent;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        // Return pending events first
        if !self.pending.is_empty() {
            return std::task::Poll::Ready(Some(self.pending.remove(0)));
        }
        if self.done {
            return std::task::Poll::Ready(None);
        }

        loop {
            match self.inner.as_mut().poll_next(cx) {
                std::task::Poll::Ready(Some(Ok(bytes))) => {
                    // Data received — reset idle timer
                    let new_deadline = tokio::time::Instant::now() + self.idle_duration;
                    self.idle_deadline.as_mut().reset(new_deadline);

                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    self.buffer.push_str(&text);

                    // Process complete SSE blocks from the buffer
                    while let Some(pos) = self.buffer.find("\n\n") {
                        let block = self.buffer[..pos].to_string();
                        self.buffer = self.buffer[pos + 2..].to_string();
                        self.drain_block(&block);
                    }

                    if !self.pending.is_empty() {
                        return std::task::Poll::Ready(Some(self.pending.remove(0)));
                    }
                    if self.done {
                        return std::task::Poll::Ready(None);
                    }
                }
                std::task::Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return std::task::Poll::Ready(Some(StreamEvent::Error {
                        error: ProviderError::StreamInterrupted(e.to_string()),
                    }));
                }
                std::task::Poll::Ready(None) => {
                    // Stream ended — process any trailing block without a blank line
                    if !self.buffer.is_empty() {
                        let remaining = std::mem::take(&mut self.buffer);
                        self.drain_block(&remaining);
                        if !self.pending.is_empty() {
                            return std::task::Poll::Ready(Some(self.pending.remove(0)));
                        }
                    }
                    return std::task::Poll::Ready(None);
                }
                std::task::Poll::Pending => {
                    // No data available — check idle timeout
                    if self.idle_deadline.as_mut().poll(cx).is_ready() {
                        self.done = true;
                        return std::task::Poll::Ready(Some(StreamEvent::Error {
                            error: ProviderError::StreamInterrupted(format!(
                                "idle timeout after {}s",
                                self.idle_duration.as_secs()
                            )),
                        }));
                    }
                    return std::task::Poll::Pending;
                }
            }
        }
    }
}
