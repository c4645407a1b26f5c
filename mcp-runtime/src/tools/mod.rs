//! Tool catalogue: definitions grouped by category, argument decoding, and
//! the dispatch table that routes a `tools/call` to its handler.

pub mod admin;
pub mod logs;
pub mod profile;
pub mod sources;

use logchef_core::ClientError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::categories::{ToolCategory, ToolCategoryEnablement};
use crate::context::SessionContext;
use crate::ToolError;

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub category: ToolCategory,
    pub description: &'static str,
    pub input_schema: Value,
    /// Runs the live admin-role check before the handler.
    pub admin_only: bool,
}

impl ToolDefinition {
    fn new(
        name: &'static str,
        category: ToolCategory,
        description: &'static str,
        input_schema: Value,
    ) -> Self {
        Self {
            name,
            category,
            description,
            input_schema,
            admin_only: false,
        }
    }

    fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }
}

/// Tools of the active categories, in registration order.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new(enablement: &ToolCategoryEnablement) -> Self {
        let mut tools = Vec::new();
        for category in enablement.active_categories() {
            tools.extend(definitions_for(category));
        }
        tracing::info!(
            event = "mcp.tools.registered",
            count = tools.len(),
            "registered tools"
        );
        Self { tools }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name).collect()
    }
}

fn definitions_for(category: ToolCategory) -> Vec<ToolDefinition> {
    match category {
        ToolCategory::Profile => profile::definitions(),
        ToolCategory::Sources => sources::definitions(),
        ToolCategory::Logs => logs::definitions(),
        ToolCategory::Admin => admin::definitions(),
    }
}

/// Runs a registered tool against the session's client.
pub async fn call_tool(
    ctx: &SessionContext,
    definition: &ToolDefinition,
    args: Map<String, Value>,
) -> Result<Value, ToolError> {
    let client = ctx.client()?;
    if definition.admin_only {
        admin::require_admin(client).await?;
    }
    let args = Value::Object(args);
    match definition.category {
        ToolCategory::Profile => profile::call(definition.name, client).await,
        ToolCategory::Sources => sources::call(definition.name, client, args).await,
        ToolCategory::Logs => logs::call(definition.name, client, args).await,
        ToolCategory::Admin => admin::call(definition.name, client, args).await,
    }
}

pub fn unknown_tool(name: &str) -> ToolError {
    ToolError::new("unknown_tool", format!("Unknown tool: {name}"))
        .with_field("name")
        .with_docs_hint("Call tools/list for the tools this server exposes.")
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args)
        .map_err(|e| ToolError::new("invalid_arguments", format!("invalid arguments: {e}")))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| {
        ToolError::new("serialization_error", format!("encode tool result: {e}"))
    })
}

/// Wraps a client failure with the logical operation that failed.
fn upstream(operation: &'static str) -> impl FnOnce(ClientError) -> ToolError {
    move |err| client_failure(operation, err)
}

fn client_failure(operation: &str, err: ClientError) -> ToolError {
    let tool_error = ToolError::new(err.code(), format!("{operation}: {err}"));
    match err.status() {
        Some(status) => tool_error.with_details(json!({ "status": status })),
        None => tool_error,
    }
}

fn done(message: &str) -> Value {
    json!({ "success": true, "message": message })
}

/// JSON schema of a tool's arguments object.
#[derive(Debug, Default)]
struct InputSchema {
    properties: Map<String, Value>,
    required: Vec<&'static str>,
}

impl InputSchema {
    fn new() -> Self {
        Self::default()
    }

    fn field(mut self, name: &'static str, kind: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": kind, "description": description }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    fn required_integer(self, name: &'static str, description: &str) -> Self {
        self.field(name, "integer", description, true)
    }

    fn optional_integer(self, name: &'static str, description: &str) -> Self {
        self.field(name, "integer", description, false)
    }

    fn required_string(self, name: &'static str, description: &str) -> Self {
        self.field(name, "string", description, true)
    }

    fn optional_string(self, name: &'static str, description: &str) -> Self {
        self.field(name, "string", description, false)
    }

    fn optional_boolean(self, name: &'static str, description: &str) -> Self {
        self.field(name, "boolean", description, false)
    }

    fn property(mut self, name: &'static str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name);
        }
        self
    }

    fn build(self) -> Value {
        let mut schema = json!({
            "type": "object",
            "properties": self.properties,
        });
        if !self.required.is_empty() {
            schema["required"] = json!(self.required);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ADMIN_ONLY: [&str; 13] = [
        "list_all_teams",
        "create_team",
        "delete_team",
        "list_all_users",
        "get_user",
        "create_user",
        "update_user",
        "delete_user",
        "list_all_sources",
        "create_source",
        "validate_source_connection",
        "delete_source",
        "get_admin_source_stats",
    ];

    #[test]
    fn every_category_registers_unique_names() {
        let registry = ToolRegistry::new(&ToolCategoryEnablement::default());
        let names = registry.names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names.len(), 3 + 2 + 9 + 23);
    }

    #[test]
    fn admin_check_covers_exactly_the_privileged_tools() {
        let registry = ToolRegistry::new(&ToolCategoryEnablement::default());
        let mut gated: Vec<_> = registry
            .definitions()
            .iter()
            .filter(|tool| tool.admin_only)
            .map(|tool| tool.name)
            .collect();
        gated.sort_unstable();
        let mut expected = ADMIN_ONLY.to_vec();
        expected.sort_unstable();
        assert_eq!(gated, expected);
    }

    #[test]
    fn disabled_category_is_not_registered() {
        let registry = ToolRegistry::new(&ToolCategoryEnablement::new(
            "profile,logs",
            [ToolCategory::Logs],
        ));
        assert_eq!(registry.names(), vec!["get_profile", "get_teams", "get_meta"]);
        assert!(registry.get("query_logs").is_none());
    }

    #[test]
    fn schemas_are_objects_listing_required_fields() {
        let registry = ToolRegistry::new(&ToolCategoryEnablement::default());
        let query = registry.get("query_logs").unwrap();
        assert_eq!(query.input_schema["type"], "object");
        assert_eq!(
            query.input_schema["required"],
            json!(["team_id", "source_id", "raw_sql"])
        );
        assert_eq!(query.input_schema["properties"]["limit"]["type"], "integer");

        let profile = registry.get("get_profile").unwrap();
        assert!(profile.input_schema.get("required").is_none());
    }

    #[test]
    fn argument_errors_name_the_problem() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Args {
            team_id: i64,
        }
        let err = parse_args::<Args>(json!({})).unwrap_err();
        assert_eq!(err.code, "invalid_arguments");
        assert!(err.message.contains("team_id"));

        let err = parse_args::<Args>(json!({ "team_id": "seven" })).unwrap_err();
        assert_eq!(err.code, "invalid_arguments");
    }

    #[test]
    fn upstream_errors_keep_operation_and_status() {
        let err = upstream("delete user")(ClientError::Status {
            status: 404,
            body: "user not found".to_string(),
        });
        assert_eq!(err.code, "upstream_status");
        assert_eq!(
            err.message,
            "delete user: API request failed with status 404: user not found"
        );
        assert_eq!(err.details, Some(json!({ "status": 404 })));
    }
}
