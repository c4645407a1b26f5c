//! SSE transport.
//!
//! A client opens `GET {base}/sse`, receives an `endpoint` event naming its
//! message URL, then POSTs JSON-RPC payloads to `{base}/message?sessionId=..`.
//! Responses travel back on the event stream as `message` events.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::stream::Stream;
use logchef_mcp_runtime::context::ContextPipeline;
use logchef_mcp_runtime::{McpServer, RpcError, error_response};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

type Sessions = Arc<Mutex<HashMap<Uuid, mpsc::UnboundedSender<Value>>>>;

#[derive(Clone)]
struct SseState {
    server: McpServer,
    pipeline: Arc<ContextPipeline<HeaderMap>>,
    sessions: Sessions,
    base_path: String,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Removes its session from the table when the event stream is dropped.
struct SessionGuard {
    id: Uuid,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(&self.id);
        }
        tracing::info!(event = "mcp.sse.disconnected", session_id = %self.id, "SSE client disconnected");
    }
}

pub fn router(
    server: McpServer,
    pipeline: ContextPipeline<HeaderMap>,
    base_path: &str,
) -> Router {
    let base_path = match base_path.trim_matches('/') {
        "" => String::new(),
        trimmed => format!("/{trimmed}"),
    };
    let state = SseState {
        server,
        pipeline: Arc::new(pipeline),
        sessions: Arc::default(),
        base_path: base_path.clone(),
    };
    Router::new()
        .route(&format!("{base_path}/sse"), get(sse_handler))
        .route(&format!("{base_path}/message"), post(message_handler))
        .with_state(state)
}

async fn sse_handler(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    if let Ok(mut sessions) = state.sessions.lock() {
        sessions.insert(id, tx);
    }
    tracing::info!(event = "mcp.sse.connected", session_id = %id, "SSE client connected");

    let guard = SessionGuard {
        id,
        sessions: state.sessions.clone(),
    };
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}/message?sessionId={id}", state.base_path));

    let messages = UnboundedReceiverStream::new(rx).map(move |message: Value| {
        let _session = &guard;
        Ok(Event::default().event("message").data(message.to_string()))
    });
    let stream = tokio_stream::once(Ok(endpoint)).chain(messages);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn message_handler(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(session_id) = query.session_id.as_deref().and_then(|id| Uuid::parse_str(id).ok())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing or invalid sessionId" })),
        )
            .into_response();
    };
    let sender = state
        .sessions
        .lock()
        .ok()
        .and_then(|sessions| sessions.get(&session_id).cloned());
    let Some(sender) = sender else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "session not found" })),
        )
            .into_response();
    };

    let ctx = match state.pipeline.run(&headers) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::warn!(
                event = "mcp.sse.config_rejected",
                session_id = %session_id,
                error = %err,
                "could not resolve Logchef credentials for request"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(Value::Null, RpcError::configuration(&err))),
            )
                .into_response();
        }
    };

    let incoming: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(Value::Null, RpcError::parse_error("Parse error"))),
            )
                .into_response();
        }
    };

    let responses = state.server.handle_incoming_message(&ctx, incoming).await;
    for response in responses {
        if sender.send(response).is_err() {
            tracing::debug!(event = "mcp.sse.stream_gone", session_id = %session_id, "dropping response for closed stream");
            break;
        }
    }
    StatusCode::ACCEPTED.into_response()
}
