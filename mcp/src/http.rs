//! Stateless streamable HTTP transport: one JSON-RPC payload per POST.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use logchef_mcp_runtime::context::ContextPipeline;
use logchef_mcp_runtime::{McpServer, RpcError, error_response};
use serde_json::Value;

#[derive(Clone)]
struct HttpState {
    server: McpServer,
    pipeline: Arc<ContextPipeline<HeaderMap>>,
}

pub fn router(
    server: McpServer,
    pipeline: ContextPipeline<HeaderMap>,
    endpoint_path: &str,
) -> Router {
    let endpoint_path = format!("/{}", endpoint_path.trim_start_matches('/'));
    let state = HttpState {
        server,
        pipeline: Arc::new(pipeline),
    };
    Router::new()
        .route(&endpoint_path, post(mcp_post).get(mcp_get))
        .with_state(state)
}

async fn mcp_get() -> Response {
    StatusCode::METHOD_NOT_ALLOWED.into_response()
}

async fn mcp_post(State(state): State<HttpState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = match state.pipeline.run(&headers) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::warn!(
                event = "mcp.http.config_rejected",
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
                StatusCode::OK,
                Json(error_response(Value::Null, RpcError::parse_error("Parse error"))),
            )
                .into_response();
        }
    };

    let mut responses = state.server.handle_incoming_message(&ctx, incoming).await;

    match responses.len() {
        0 => StatusCode::ACCEPTED.into_response(),
        1 => (StatusCode::OK, Json(responses.remove(0))).into_response(),
        _ => (StatusCode::OK, Json(Value::Array(responses))).into_response(),
    }
}
