use logchef_core::LogchefClient;
use serde_json::Value;

use super::{InputSchema, ToolDefinition, to_value, unknown_tool, upstream};
use crate::ToolError;
use crate::categories::ToolCategory;

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_profile",
            ToolCategory::Profile,
            "Get the current user profile information from Logchef, including user details and API token information.",
            InputSchema::new().build(),
        ),
        ToolDefinition::new(
            "get_teams",
            ToolCategory::Profile,
            "Get the teams that the current user belongs to, including their role in each team and member count.",
            InputSchema::new().build(),
        ),
        ToolDefinition::new(
            "get_meta",
            ToolCategory::Profile,
            "Get server metadata including version information and configuration details.",
            InputSchema::new().build(),
        ),
    ]
}

pub(crate) async fn call(name: &str, client: &LogchefClient) -> Result<Value, ToolError> {
    match name {
        "get_profile" => {
            let profile = client.get_profile().await.map_err(upstream("get profile"))?;
            to_value(&profile)
        }
        "get_teams" => {
            let teams = client
                .get_user_teams()
                .await
                .map_err(upstream("get teams"))?;
            to_value(&teams)
        }
        "get_meta" => {
            let meta = client.get_meta().await.map_err(upstream("get meta"))?;
            to_value(&meta)
        }
        other => Err(unknown_tool(other)),
    }
}
