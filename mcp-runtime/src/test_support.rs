//! In-process fake Logchef backend for runtime tests.

use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get};
use axum::{Json, Router};
use logchef_core::{ClientConfig, LogchefClient};
use serde_json::{Value, json};

use crate::SessionContext;

#[derive(Clone, Default)]
struct Hits(Arc<Mutex<Vec<String>>>);

pub(crate) struct FakeLogchef {
    pub base_url: String,
    hits: Hits,
}

impl FakeLogchef {
    /// Profile with the given global role, two teams sharing source 20,
    /// and a deletable user 5.
    pub async fn start(role: &str) -> Self {
        Self::serve(standard_routes(role)).await
    }

    pub async fn serve(router: Router) -> Self {
        let hits = Hits::default();
        let router = router.layer(middleware::from_fn_with_state(hits.clone(), record));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    pub fn hits(&self, method: &str, path: &str) -> usize {
        let wanted = format!("{method} {path}");
        self.hits
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|hit| **hit == wanted)
            .count()
    }

    pub fn requests(&self) -> Vec<String> {
        self.hits.0.lock().unwrap().clone()
    }
}

async fn record(State(hits): State<Hits>, request: Request, next: Next) -> Response {
    hits.0
        .lock()
        .unwrap()
        .push(format!("{} {}", request.method(), request.uri().path()));
    next.run(request).await
}

pub(crate) fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "status": "success", "data": data }))
}

pub(crate) fn context_for(fake: &FakeLogchef) -> SessionContext {
    let client = LogchefClient::new(ClientConfig::new(&fake.base_url, "sk-test")).unwrap();
    SessionContext::default().with_client(client)
}

/// `/api/v1/me` answering with `role`, plus the public meta endpoint.
pub(crate) fn profile_routes(role: &str) -> Router {
    let role = role.to_string();
    Router::new()
        .route(
            "/api/v1/me",
            get(move || {
                let role = role.clone();
                async move {
                    envelope(json!({
                        "auth_method": "api_token",
                        "api_token": { "id": 3, "name": "ci", "prefix": "lc_3f" },
                        "user": { "id": 42, "email": "oncall@example.com", "full_name": "On Call", "role": role, "status": "active" }
                    }))
                }
            }),
        )
        .route(
            "/api/v1/meta",
            get(|| async { envelope(json!({ "version": "v1.2.0", "http_server_timeout": "30s" })) }),
        )
}

pub(crate) fn source(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "connection": { "host": "clickhouse:9000", "database": "logs", "table_name": name },
        "_meta_is_auto_created": false,
        "_meta_ts_field": "timestamp",
        "_meta_severity_field": "severity_text",
        "ttl_days": 30,
        "is_connected": true,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
}

fn standard_routes(role: &str) -> Router {
    profile_routes(role)
        .route(
            "/api/v1/me/teams",
            get(|| async {
                envelope(json!([
                    { "id": 1, "name": "platform", "role": "owner", "member_count": 4 },
                    { "id": 2, "name": "payments", "role": "member", "member_count": 9 }
                ]))
            }),
        )
        .route(
            "/api/v1/teams/1/sources",
            get(|| async { envelope(json!([source(10, "nginx"), source(20, "app")])) }),
        )
        .route(
            "/api/v1/teams/2/sources",
            get(|| async { envelope(json!([source(20, "app-renamed"), source(30, "billing")])) }),
        )
        .route(
            "/api/v1/admin/users/5",
            delete(|| async { Json(json!({ "status": "success" })) }),
        )
}
