use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::Envelope;
use crate::admin::{
    ApiToken, ApiTokenRequest, CreatedApiToken, Team, TeamMember, TeamMemberRequest, TeamRequest,
    TeamSourceRequest, TeamUpdateRequest, User, UserRequest, UserUpdateRequest,
};
use crate::error::ClientError;
use crate::logs::{
    Collection, CollectionRequest, Histogram, HistogramRequest, LogQueryRequest, LogQueryResult,
};
use crate::profile::{Profile, ServerMeta, UserTeam};
use crate::sources::{
    LogColumn, Source, SourceRequest, SourceStats, SourceValidationRequest,
    SourceValidationResult,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Inputs for building a [`LogchefClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Typed client for the Logchef REST API.
///
/// One instance is bound to exactly one base URL and API key. Every method maps
/// to a single HTTP request; nothing is cached or retried.
#[derive(Debug, Clone)]
pub struct LogchefClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl LogchefClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self {
            base_url: config.base_url,
            api_key: config.api_key,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    // ── Profile ──────────────────────────────────────────────

    pub async fn get_profile(&self) -> Result<Profile, ClientError> {
        let request = self.request(Method::GET, "/api/v1/me")?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn get_user_teams(&self) -> Result<Vec<UserTeam>, ClientError> {
        let request = self.request(Method::GET, "/api/v1/me/teams")?;
        self.fetch(request, StatusCode::OK).await
    }

    /// Server metadata. This endpoint is public, so no bearer token is sent.
    pub async fn get_meta(&self) -> Result<ServerMeta, ClientError> {
        let request = self.http.get(self.endpoint("/api/v1/meta")?);
        self.fetch(request, StatusCode::OK).await
    }

    // ── Sources ──────────────────────────────────────────────

    pub async fn get_team_sources(&self, team_id: i64) -> Result<Vec<Source>, ClientError> {
        let request = self.request(Method::GET, &format!("/api/v1/teams/{team_id}/sources"))?;
        self.fetch(request, StatusCode::OK).await
    }

    // ── Logs ─────────────────────────────────────────────────

    /// Runs a raw SQL query. The request is normalized first (row cap, default timeout).
    pub async fn query_logs(
        &self,
        team_id: i64,
        source_id: i64,
        query: LogQueryRequest,
    ) -> Result<LogQueryResult, ClientError> {
        let path = format!("{}/logs/query", source_path(team_id, source_id));
        let request = self
            .request(Method::POST, &path)?
            .json(&query.normalized());
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn get_source_schema(
        &self,
        team_id: i64,
        source_id: i64,
    ) -> Result<Vec<LogColumn>, ClientError> {
        let path = format!("{}/schema", source_path(team_id, source_id));
        let request = self.request(Method::GET, &path)?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn get_log_histogram(
        &self,
        team_id: i64,
        source_id: i64,
        histogram: &HistogramRequest,
    ) -> Result<Histogram, ClientError> {
        let path = format!("{}/logs/histogram", source_path(team_id, source_id));
        let request = self.request(Method::POST, &path)?.json(histogram);
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn get_source_stats(
        &self,
        team_id: i64,
        source_id: i64,
    ) -> Result<SourceStats, ClientError> {
        let path = format!("{}/stats", source_path(team_id, source_id));
        let request = self.request(Method::GET, &path)?;
        self.fetch(request, StatusCode::OK).await
    }

    // ── Collections ──────────────────────────────────────────

    pub async fn get_collections(
        &self,
        team_id: i64,
        source_id: i64,
    ) -> Result<Vec<Collection>, ClientError> {
        let path = format!("{}/collections", source_path(team_id, source_id));
        let request = self.request(Method::GET, &path)?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn create_collection(
        &self,
        team_id: i64,
        source_id: i64,
        collection: &CollectionRequest,
    ) -> Result<Collection, ClientError> {
        let path = format!("{}/collections", source_path(team_id, source_id));
        self.send_json(Method::POST, &path, collection, StatusCode::CREATED)
            .await
    }

    pub async fn get_collection(
        &self,
        team_id: i64,
        source_id: i64,
        collection_id: i64,
    ) -> Result<Collection, ClientError> {
        let path = collection_path(team_id, source_id, collection_id);
        let request = self.request(Method::GET, &path)?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn update_collection(
        &self,
        team_id: i64,
        source_id: i64,
        collection_id: i64,
        collection: &CollectionRequest,
    ) -> Result<Collection, ClientError> {
        let path = collection_path(team_id, source_id, collection_id);
        self.send_json(Method::PUT, &path, collection, StatusCode::OK)
            .await
    }

    pub async fn delete_collection(
        &self,
        team_id: i64,
        source_id: i64,
        collection_id: i64,
    ) -> Result<(), ClientError> {
        let path = collection_path(team_id, source_id, collection_id);
        let request = self.request(Method::DELETE, &path)?;
        self.execute(request, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    // ── Teams ────────────────────────────────────────────────

    pub async fn list_all_teams(&self) -> Result<Vec<Team>, ClientError> {
        let request = self.request(Method::GET, "/api/v1/admin/teams")?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn get_team(&self, team_id: i64) -> Result<Team, ClientError> {
        let request = self.request(Method::GET, &format!("/api/v1/teams/{team_id}"))?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn create_team(&self, team: &TeamRequest) -> Result<Team, ClientError> {
        self.send_json(Method::POST, "/api/v1/admin/teams", team, StatusCode::CREATED)
            .await
    }

    pub async fn update_team(
        &self,
        team_id: i64,
        update: &TeamUpdateRequest,
    ) -> Result<Team, ClientError> {
        let path = format!("/api/v1/teams/{team_id}");
        self.send_json(Method::PUT, &path, update, StatusCode::OK)
            .await
    }

    pub async fn delete_team(&self, team_id: i64) -> Result<(), ClientError> {
        self.send_empty(Method::DELETE, &format!("/api/v1/admin/teams/{team_id}"))
            .await
    }

    pub async fn list_team_members(&self, team_id: i64) -> Result<Vec<TeamMember>, ClientError> {
        let request = self.request(Method::GET, &format!("/api/v1/teams/{team_id}/members"))?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn add_team_member(
        &self,
        team_id: i64,
        member: &TeamMemberRequest,
    ) -> Result<(), ClientError> {
        let path = format!("/api/v1/teams/{team_id}/members");
        let request = self.request(Method::POST, &path)?.json(member);
        self.execute(request, StatusCode::OK).await?;
        Ok(())
    }

    pub async fn remove_team_member(&self, team_id: i64, user_id: i64) -> Result<(), ClientError> {
        self.send_empty(
            Method::DELETE,
            &format!("/api/v1/teams/{team_id}/members/{user_id}"),
        )
        .await
    }

    pub async fn link_source_to_team(
        &self,
        team_id: i64,
        link: &TeamSourceRequest,
    ) -> Result<(), ClientError> {
        let path = format!("/api/v1/teams/{team_id}/sources");
        let request = self.request(Method::POST, &path)?.json(link);
        self.execute(request, StatusCode::OK).await?;
        Ok(())
    }

    pub async fn unlink_source_from_team(
        &self,
        team_id: i64,
        source_id: i64,
    ) -> Result<(), ClientError> {
        self.send_empty(
            Method::DELETE,
            &format!("/api/v1/teams/{team_id}/sources/{source_id}"),
        )
        .await
    }

    // ── Users ────────────────────────────────────────────────

    pub async fn list_all_users(&self) -> Result<Vec<User>, ClientError> {
        let request = self.request(Method::GET, "/api/v1/admin/users")?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, ClientError> {
        let request = self.request(Method::GET, &format!("/api/v1/admin/users/{user_id}"))?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn create_user(&self, user: &UserRequest) -> Result<User, ClientError> {
        self.send_json(Method::POST, "/api/v1/admin/users", user, StatusCode::CREATED)
            .await
    }

    pub async fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdateRequest,
    ) -> Result<User, ClientError> {
        let path = format!("/api/v1/admin/users/{user_id}");
        self.send_json(Method::PUT, &path, update, StatusCode::OK)
            .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), ClientError> {
        self.send_empty(Method::DELETE, &format!("/api/v1/admin/users/{user_id}"))
            .await
    }

    // ── API tokens ───────────────────────────────────────────

    pub async fn list_api_tokens(&self) -> Result<Vec<ApiToken>, ClientError> {
        let request = self.request(Method::GET, "/api/v1/me/tokens")?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn create_api_token(
        &self,
        token: &ApiTokenRequest,
    ) -> Result<CreatedApiToken, ClientError> {
        self.send_json(Method::POST, "/api/v1/me/tokens", token, StatusCode::CREATED)
            .await
    }

    pub async fn delete_api_token(&self, token_id: i64) -> Result<(), ClientError> {
        self.send_empty(Method::DELETE, &format!("/api/v1/me/tokens/{token_id}"))
            .await
    }

    // ── Admin sources ────────────────────────────────────────

    pub async fn list_all_sources(&self) -> Result<Vec<Source>, ClientError> {
        let request = self.request(Method::GET, "/api/v1/admin/sources")?;
        self.fetch(request, StatusCode::OK).await
    }

    pub async fn create_source(&self, source: &SourceRequest) -> Result<Source, ClientError> {
        self.send_json(
            Method::POST,
            "/api/v1/admin/sources",
            source,
            StatusCode::CREATED,
        )
        .await
    }

    pub async fn validate_source_connection(
        &self,
        validation: &SourceValidationRequest,
    ) -> Result<SourceValidationResult, ClientError> {
        self.send_json(
            Method::POST,
            "/api/v1/admin/sources/validate",
            validation,
            StatusCode::OK,
        )
        .await
    }

    pub async fn delete_source(&self, source_id: i64) -> Result<(), ClientError> {
        self.send_empty(Method::DELETE, &format!("/api/v1/admin/sources/{source_id}"))
            .await
    }

    pub async fn get_admin_source_stats(&self, source_id: i64) -> Result<SourceStats, ClientError> {
        let path = format!("/api/v1/admin/sources/{source_id}/stats");
        let request = self.request(Method::GET, &path)?;
        self.fetch(request, StatusCode::OK).await
    }

    // ── Plumbing ─────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    /// Authenticated request builder.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self
            .http
            .request(method, self.endpoint(path)?)
            .bearer_auth(&self.api_key))
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        if status != expected {
            let body = response.text().await.map_err(ClientError::Body)?;
            tracing::debug!(
                event = "logchef.request.failed",
                status = status.as_u16(),
                expected = expected.as_u16(),
                "unexpected upstream status"
            );
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned + Default>(
        &self,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<T, ClientError> {
        let response = self.execute(request, expected).await?;
        let bytes = response.bytes().await.map_err(ClientError::Body)?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.data)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned + Default>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        expected: StatusCode,
    ) -> Result<T, ClientError> {
        let request = self.request(method, path)?.json(body);
        self.fetch(request, expected).await
    }

    /// Bodiless request whose success response carries nothing the caller needs.
    async fn send_empty(&self, method: Method, path: &str) -> Result<(), ClientError> {
        let request = self.request(method, path)?;
        self.execute(request, StatusCode::OK).await?;
        Ok(())
    }
}

fn source_path(team_id: i64, source_id: i64) -> String {
    format!("/api/v1/teams/{team_id}/sources/{source_id}")
}

fn collection_path(team_id: i64, source_id: i64, collection_id: i64) -> String {
    format!(
        "{}/collections/{collection_id}",
        source_path(team_id, source_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str, api_key: &str) -> LogchefClient {
        LogchefClient::new(ClientConfig::new(base_url, api_key)).unwrap()
    }

    fn auth_header(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn profile_request_sends_bearer_token_and_unwraps_envelope() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_route = seen.clone();
        let router = Router::new().route(
            "/api/v1/me",
            get(move |headers: HeaderMap| {
                let seen = seen_in_route.clone();
                async move {
                    *seen.lock().unwrap() = auth_header(&headers);
                    Json(json!({
                        "status": "success",
                        "data": {
                            "auth_method": "api_token",
                            "user": { "id": 7, "email": "ops@example.com", "role": "admin" }
                        }
                    }))
                }
            }),
        );
        let base = spawn(router).await;

        let profile = client(&base, "sk-test").get_profile().await.unwrap();
        assert_eq!(profile.user.email, "ops@example.com");
        assert!(profile.is_admin());
        assert_eq!(seen.lock().unwrap().as_deref(), Some("Bearer sk-test"));
    }

    #[tokio::test]
    async fn meta_request_omits_authorization_header() {
        let seen = Arc::new(Mutex::new(Some("unset".to_string())));
        let seen_in_route = seen.clone();
        let router = Router::new().route(
            "/api/v1/meta",
            get(move |headers: HeaderMap| {
                let seen = seen_in_route.clone();
                async move {
                    *seen.lock().unwrap() = auth_header(&headers);
                    Json(json!({
                        "status": "success",
                        "data": { "version": "v1.4.0", "http_server_timeout": "30s" }
                    }))
                }
            }),
        );
        let base = spawn(router).await;

        let meta = client(&base, "sk-test").get_meta().await.unwrap();
        assert_eq!(meta.version, "v1.4.0");
        assert!(seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn unexpected_status_carries_code_and_raw_body() {
        let router = Router::new().route(
            "/api/v1/me/teams",
            get(|| async { (AxumStatus::UNAUTHORIZED, "token revoked") }),
        );
        let base = spawn(router).await;

        let err = client(&base, "sk-test").get_user_teams().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(
            err.to_string(),
            "API request failed with status 401: token revoked"
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let router = Router::new().route(
            "/api/v1/me/teams",
            get(|| async { "<html>gateway</html>" }),
        );
        let base = spawn(router).await;

        let err = client(&base, "sk-test").get_user_teams().await.unwrap_err();
        assert_eq!(err.code(), "decode_error");
        assert!(err.status().is_none());
    }

    #[tokio::test]
    async fn null_list_payload_is_an_empty_list() {
        let router = Router::new()
            .route(
                "/api/v1/me/teams",
                get(|| async { Json(json!({ "status": "success", "data": null })) }),
            )
            .route(
                "/api/v1/teams/4/sources",
                get(|| async { Json(json!({ "status": "success", "data": null })) }),
            );
        let base = spawn(router).await;
        let client = client(&base, "sk-test");

        assert!(client.get_user_teams().await.unwrap().is_empty());
        assert!(client.get_team_sources(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collection_delete_expects_no_content() {
        let router = Router::new()
            .route(
                "/api/v1/teams/1/sources/2/collections/3",
                delete(|| async { AxumStatus::NO_CONTENT }),
            )
            .route(
                "/api/v1/teams/1/sources/2/collections/4",
                delete(|| async { Json(json!({ "status": "success" })) }),
            );
        let base = spawn(router).await;
        let client = client(&base, "sk-test");

        client.delete_collection(1, 2, 3).await.unwrap();
        let err = client.delete_collection(1, 2, 4).await.unwrap_err();
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn creation_requires_created_status() {
        let router = Router::new().route(
            "/api/v1/admin/teams",
            post(|Json(body): Json<Value>| async move {
                (
                    AxumStatus::CREATED,
                    Json(json!({
                        "status": "success",
                        "data": { "id": 11, "name": body["name"], "description": body["description"] }
                    })),
                )
            }),
        );
        let base = spawn(router).await;

        let team = client(&base, "sk-test")
            .create_team(&TeamRequest {
                name: "payments".to_string(),
                description: "payments on-call".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(team.id, 11);
        assert_eq!(team.name, "payments");
    }

    #[tokio::test]
    async fn query_logs_sends_normalized_limit_and_timeout() {
        let body_seen = Arc::new(Mutex::new(Value::Null));
        let body_in_route = body_seen.clone();
        let router = Router::new().route(
            "/api/v1/teams/1/sources/9/logs/query",
            post(move |Json(body): Json<Value>| {
                let seen = body_in_route.clone();
                async move {
                    *seen.lock().unwrap() = body;
                    Json(json!({
                        "status": "success",
                        "data": { "logs": [], "stats": { "execution_time_ms": 3, "rows_read": 0 }, "columns": [] }
                    }))
                }
            }),
        );
        let base = spawn(router).await;

        client(&base, "sk-test")
            .query_logs(
                1,
                9,
                LogQueryRequest {
                    raw_sql: "SELECT * FROM logs".to_string(),
                    limit: Some(1000),
                    query_timeout: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            *body_seen.lock().unwrap(),
            json!({ "raw_sql": "SELECT * FROM logs", "limit": 100, "query_timeout": 30 })
        );
    }

    #[tokio::test]
    async fn bodiless_mutations_issue_exactly_one_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_route = hits.clone();
        let router = Router::new().route(
            "/api/v1/admin/users/5",
            delete(move || {
                let hits = hits_in_route.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "status": "success" }))
                }
            }),
        );
        let base = spawn(router).await;

        client(&base, "sk-test").delete_user(5).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"), "")
            .get_profile()
            .await
            .unwrap_err();
        assert_eq!(err.code(), "connection_error");
        assert!(err.to_string().starts_with("make request: "));
    }

    #[tokio::test]
    async fn base_url_is_used_exactly_as_configured() {
        let client = client("http://logs.internal:5173/", "");
        assert_eq!(client.base_url(), "http://logs.internal:5173/");
        assert!(!client.has_api_key());
    }
}
