use std::sync::Arc;

use serde_json::{Map, Value, json};

pub mod categories;
pub mod config;
pub mod context;
pub mod stdio;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use categories::{ToolCategory, ToolCategoryEnablement};
pub use config::{ConfigError, EnvSnapshot};
pub use context::{ContextPipeline, SessionContext};
pub use tools::ToolRegistry;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "logchef-mcp";

const INSTRUCTIONS: &str = "Logchef log analytics. Start with get_teams and get_sources to find a team_id and source_id, call get_source_schema before writing SQL, then use query_logs or get_log_histogram. Queries return at most 100 rows.";

/// JSON-RPC level failure. Tool failures are not RPC errors; they travel
/// inside a successful `tools/call` result with `isError` set.
#[derive(Debug)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    /// Credentials for a request could not be resolved.
    pub fn configuration(err: &ConfigError) -> Self {
        Self {
            code: -32001,
            message: err.to_string(),
            data: Some(json!({ "error": err.code() })),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    pub field: Option<String>,
    pub docs_hint: Option<String>,
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.code,
            "message": self.message
        });
        if let Some(field) = &self.field {
            payload["field"] = Value::String(field.clone());
        }
        if let Some(docs_hint) = &self.docs_hint {
            payload["docs_hint"] = Value::String(docs_hint.clone());
        }
        if let Some(details) = &self.details {
            payload["details"] = details.clone();
        }
        payload
    }
}

/// Protocol front end shared by every transport.
///
/// The server itself holds only the immutable tool registry. Credentials and
/// the bound client arrive per call through the [`SessionContext`], so one
/// server value can serve requests for different Logchef tenants.
#[derive(Debug, Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(enablement: &ToolCategoryEnablement) -> Self {
        Self::with_registry(ToolRegistry::new(enablement))
    }

    pub fn with_registry(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handles one decoded JSON-RPC payload (single message or batch) and
    /// returns the responses to send back, which may be none.
    pub async fn handle_incoming_message(
        &self,
        ctx: &SessionContext,
        incoming: Value,
    ) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(ctx, item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(ctx, incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, ctx: &SessionContext, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A client response; this server never issues requests of its own.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(ctx, method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            handle_notification(method);
            None
        }
    }

    async fn handle_request(
        &self,
        ctx: &SessionContext,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(ctx, params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": INSTRUCTIONS
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .definitions()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(
        &self,
        ctx: &SessionContext,
        params: Value,
    ) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        tracing::debug!(event = "mcp.tool.call", tool = name, "calling tool");
        let result = match self.registry.get(name) {
            Some(definition) => tools::call_tool(ctx, definition, args).await,
            None => Err(tools::unknown_tool(name)),
        };

        Ok(match result {
            Ok(payload) => build_tool_call_response(payload, false),
            Err(err) => {
                tracing::info!(
                    event = "mcp.tool.failed",
                    tool = name,
                    code = %err.code,
                    error = %err.message,
                    "tool call failed"
                );
                build_tool_call_response(err.to_value(), true)
            }
        })
    }
}

fn handle_notification(method: &str) {
    match method {
        "notifications/initialized" => {
            tracing::debug!(event = "mcp.client.initialized", "client initialized");
        }
        // Cancellation is acted on by the transport that owns the running task.
        "notifications/cancelled" => {}
        other => {
            tracing::debug!(event = "mcp.notification.ignored", method = other, "ignoring notification");
        }
    }
}

fn build_tool_call_response(envelope: Value, is_error: bool) -> Value {
    let text = to_pretty_json(&envelope);
    let mut response = json!({
        "content": [{ "type": "text", "text": text }],
    });
    // structuredContent must be an object; list payloads only go out as text.
    if envelope.is_object() {
        response["structuredContent"] = envelope;
    }
    if is_error {
        response["isError"] = Value::Bool(true);
    }
    response
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeLogchef, context_for};
    use serde_json::json;

    fn server(enablement: ToolCategoryEnablement) -> McpServer {
        McpServer::new(&enablement)
    }

    async fn call(server: &McpServer, ctx: &SessionContext, message: Value) -> Value {
        let mut responses = server.handle_incoming_message(ctx, message).await;
        assert_eq!(responses.len(), 1);
        responses.remove(0)
    }

    fn listed_tool_names(response: &Value) -> Vec<String> {
        response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn initialize_reports_protocol_and_server_name() {
        let server = server(ToolCategoryEnablement::default());
        let response = call(
            &server,
            &SessionContext::default(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
        )
        .await;
        assert_eq!(response["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "logchef-mcp");
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn tools_list_only_advertises_active_categories() {
        let enablement = ToolCategoryEnablement::new("profile,logs", [ToolCategory::Logs]);
        let server = server(enablement);
        let response = call(
            &server,
            &SessionContext::default(),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
        )
        .await;
        assert_eq!(
            listed_tool_names(&response),
            vec!["get_profile", "get_teams", "get_meta"]
        );
    }

    #[tokio::test]
    async fn tools_of_inactive_categories_are_unknown() {
        let server = server(ToolCategoryEnablement::new("profile", []));
        let response = call(
            &server,
            &SessionContext::default(),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": { "name": "query_logs", "arguments": { "team_id": 1, "source_id": 2, "raw_sql": "SELECT 1" } }
            }),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["structuredContent"]["error"], "unknown_tool");
    }

    #[tokio::test]
    async fn tool_call_without_client_reports_client_missing() {
        let server = server(ToolCategoryEnablement::default());
        let response = call(
            &server,
            &SessionContext::default(),
            json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": { "name": "get_profile" }
            }),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["structuredContent"]["error"], "client_missing");
    }

    #[tokio::test]
    async fn successful_tool_call_returns_text_and_structured_content() {
        let fake = FakeLogchef::start("admin").await;
        let server = server(ToolCategoryEnablement::default());
        let response = call(
            &server,
            &context_for(&fake),
            json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": { "name": "get_meta", "arguments": {} }
            }),
        )
        .await;
        let result = &response["result"];
        assert!(result.get("isError").is_none());
        assert_eq!(result["structuredContent"]["version"], "v1.2.0");
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("\"version\": \"v1.2.0\""));
    }

    #[tokio::test]
    async fn list_results_are_sent_as_text_only() {
        let fake = FakeLogchef::start("member").await;
        let server = server(ToolCategoryEnablement::default());
        let response = call(
            &server,
            &context_for(&fake),
            json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "tools/call",
                "params": { "name": "get_teams" }
            }),
        )
        .await;
        let result = &response["result"];
        assert!(result.get("structuredContent").is_none());
        let teams: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(teams.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn protocol_errors_use_jsonrpc_codes() {
        let server = server(ToolCategoryEnablement::default());
        let ctx = SessionContext::default();

        let response = call(
            &server,
            &ctx,
            json!({ "jsonrpc": "2.0", "id": 7, "method": "resources/read" }),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);

        let response = call(
            &server,
            &ctx,
            json!({ "jsonrpc": "2.0", "id": 8, "method": "tools/call", "params": { "arguments": {} } }),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);

        let response = call(&server, &ctx, json!({ "jsonrpc": "1.0", "id": 9, "method": "ping" })).await;
        assert_eq!(response["error"]["code"], -32600);
        assert_eq!(response["id"], 9);
    }

    #[tokio::test]
    async fn batches_answer_requests_and_skip_notifications() {
        let server = server(ToolCategoryEnablement::default());
        let responses = server
            .handle_incoming_message(
                &SessionContext::default(),
                json!([
                    { "jsonrpc": "2.0", "method": "notifications/initialized" },
                    { "jsonrpc": "2.0", "id": "a", "method": "ping" },
                    { "jsonrpc": "2.0", "id": "b", "method": "prompts/list" }
                ]),
            )
            .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], "a");
        assert_eq!(responses[1]["result"], json!({ "prompts": [] }));

        let responses = server
            .handle_incoming_message(&SessionContext::default(), json!([]))
            .await;
        assert_eq!(responses[0]["error"]["code"], -32600);
    }

    #[test]
    fn configuration_errors_carry_their_code() {
        let err = crate::config::credentials_from_env(&EnvSnapshot {
            url: Some("no scheme here".to_string()),
            api_key: None,
        })
        .unwrap_err();
        let payload = error_response(Value::Null, RpcError::configuration(&err));
        assert_eq!(payload["error"]["code"], -32001);
        assert_eq!(payload["error"]["data"]["error"], "invalid_url");
    }
}
