use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::error;

use finch_core::provider::ChatProvider;
use finch_engine::{ConversationSession, OutputItem, RawTurn, ToolRegistry};

/// Shared state for the chat handlers. A session is built per request;
/// history lives exactly as long as one exchange.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ChatProvider>,
    pub registry: Arc<ToolRegistry>,
    pub system_prompt: String,
}

/// Incoming chat body: the full history, most recent turn last.
#[derive(Debug, Deserialize)]
pub struct ChatHistory {
    pub message: Vec<RawTurn>,
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "Welcome to the API"}))
}

async fn health() -> &'static str {
    "ok"
}

/// One continuous response channel: text fragments pass through verbatim,
/// structured tool payloads are JSON-encoded. Consumers distinguish the two
/// by payload shape.
async fn chat(State(state): State<AppState>, Json(history): Json<ChatHistory>) -> Response {
    if history.message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Message is required"})),
        )
            .into_response();
    }

    let session = ConversationSession::new(
        Arc::clone(&state.provider),
        Arc::clone(&state.registry),
        state.system_prompt.clone(),
    );
    let output = session.run_turn(history.message);

    let body = Body::from_stream(output.map(encode_item));
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap_or_else(|e| {
            error!(error = %e, "failed to build chat response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

fn encode_item(item: OutputItem) -> Result<Bytes, Infallible> {
    Ok(match item {
        OutputItem::Text(text) => Bytes::from(text),
        OutputItem::Payload(result) => match serde_json::to_vec(&result) {
            Ok(encoded) => Bytes::from(encoded),
            Err(e) => {
                error!(error = %e, "failed to encode tool payload");
                Bytes::new()
            }
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use finch_core::tools::{ToolResult, UiType};
    use serde_json::Value;

    #[test]
    fn text_encodes_verbatim() {
        let bytes = encode_item(OutputItem::Text("plain words".into())).unwrap();
        assert_eq!(&bytes[..], b"plain words");
    }

    #[test]
    fn payload_encodes_as_json_object() {
        let result = ToolResult::with_ui(
            UiType::Ticker,
            "Ticker: AAPL",
            json!("190.12"),
            "The current price of AAPL is: $190.12",
        );
        let bytes = encode_item(OutputItem::Payload(result)).unwrap();
        let decoded: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded["ui_type"], "ticker");
        assert_eq!(decoded["ui_title"], "Ticker: AAPL");
    }

    #[test]
    fn chat_history_deserializes_wire_shape() {
        let body: ChatHistory = serde_json::from_str(
            r#"{"message": [{"role": "user", "content": "What's the price of AAPL?"}]}"#,
        )
        .unwrap();
        assert_eq!(body.message.len(), 1);
        assert_eq!(body.message[0].role, "user");
    }
}
