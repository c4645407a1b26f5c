use logchef_core::LogchefClient;
use logchef_core::admin::{
    ApiTokenRequest, TeamMemberRequest, TeamRequest, TeamSourceRequest, TeamUpdateRequest,
    UserRequest, UserUpdateRequest,
};
use logchef_core::sources::{LogColumn, SourceConnection, SourceRequest, SourceValidationRequest};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{InputSchema, ToolDefinition, done, parse_args, to_value, unknown_tool, upstream};
use crate::ToolError;
use crate::categories::ToolCategory;

/// Verifies, with a live profile lookup, that the caller holds the global
/// admin role. The backend enforces the same rule; this only fails faster and
/// with a clearer message.
pub async fn require_admin(client: &LogchefClient) -> Result<(), ToolError> {
    let profile = client.get_profile().await.map_err(|e| {
        ToolError::new(
            "profile_unavailable",
            format!("failed to get user profile: {e}"),
        )
    })?;
    if !profile.is_admin() {
        tracing::info!(
            event = "mcp.admin.denied",
            user_id = profile.user.id,
            role = %profile.user.role,
            "admin tool refused"
        );
        return Err(
            ToolError::new("access_denied", "access denied: admin role required")
                .with_details(json!({ "role": profile.user.role })),
        );
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct TeamIdArgs {
    team_id: i64,
}

#[derive(Debug, Deserialize)]
struct CreateTeamArgs {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct UpdateTeamArgs {
    team_id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddMemberArgs {
    team_id: i64,
    user_id: i64,
    role: String,
}

#[derive(Debug, Deserialize)]
struct MemberArgs {
    team_id: i64,
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct TeamSourceArgs {
    team_id: i64,
    source_id: i64,
}

#[derive(Debug, Deserialize)]
struct UserIdArgs {
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateUserArgs {
    user_id: i64,
    #[serde(flatten)]
    update: UserUpdateRequest,
}

#[derive(Debug, Deserialize)]
struct TokenIdArgs {
    token_id: i64,
}

#[derive(Debug, Deserialize)]
struct SourceIdArgs {
    source_id: i64,
}

#[derive(Debug, Deserialize)]
struct CreateSourceArgs {
    name: String,
    #[serde(default)]
    description: String,
    host: String,
    database: String,
    table_name: String,
    #[serde(rename = "_meta_is_auto_created", default)]
    meta_is_auto_created: bool,
    #[serde(rename = "_meta_ts_field")]
    meta_ts_field: String,
    #[serde(rename = "_meta_severity_field", default)]
    meta_severity_field: String,
    ttl_days: i64,
    #[serde(default)]
    schema: Option<Vec<LogColumn>>,
}

impl From<CreateSourceArgs> for SourceRequest {
    fn from(args: CreateSourceArgs) -> Self {
        SourceRequest {
            name: args.name,
            description: args.description,
            connection: SourceConnection {
                host: args.host,
                database: args.database,
                table_name: args.table_name,
            },
            meta_is_auto_created: args.meta_is_auto_created,
            meta_ts_field: args.meta_ts_field,
            meta_severity_field: args.meta_severity_field,
            ttl_days: args.ttl_days,
            schema: args.schema,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidateSourceArgs {
    host: String,
    database: String,
    table_name: String,
    #[serde(default)]
    timestamp_field: Option<String>,
    #[serde(default)]
    severity_field: Option<String>,
}

fn admin(name: &'static str, description: &'static str, schema: InputSchema) -> ToolDefinition {
    ToolDefinition::new(name, ToolCategory::Admin, description, schema.build())
}

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    let column = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "type": { "type": "string" }
        },
        "required": ["name", "type"]
    });

    vec![
        // Teams
        admin(
            "list_all_teams",
            "List all teams in the system with their member counts. Admin only.",
            InputSchema::new(),
        )
        .admin_only(),
        admin(
            "get_team",
            "Get details of a specific team by ID: name, description, member count and timestamps. Available to team members and admins.",
            InputSchema::new().required_integer("team_id", "The ID of the team to retrieve"),
        ),
        admin(
            "create_team",
            "Create a new team with a name and optional description. Admin only.",
            InputSchema::new()
                .required_string("name", "Name of the team")
                .optional_string("description", "Optional description of the team"),
        )
        .admin_only(),
        admin(
            "update_team",
            "Update a team's name and/or description. Requires team admin privileges or the global admin role.",
            InputSchema::new()
                .required_integer("team_id", "The ID of the team to update")
                .optional_string("name", "New name for the team")
                .optional_string("description", "New description for the team"),
        ),
        admin(
            "delete_team",
            "Delete a team permanently, removing all of its associations. This cannot be undone. Admin only.",
            InputSchema::new().required_integer("team_id", "The ID of the team to delete"),
        )
        .admin_only(),
        admin(
            "list_team_members",
            "List the members of a team with their roles and join dates. Available to team members and admins.",
            InputSchema::new().required_integer("team_id", "The ID of the team to list members for"),
        ),
        admin(
            "add_team_member",
            "Add a user to a team with a role (owner, admin, editor or member). Requires team admin privileges or the global admin role.",
            InputSchema::new()
                .required_integer("team_id", "The ID of the team to add the member to")
                .required_integer("user_id", "The ID of the user to add to the team")
                .required_string(
                    "role",
                    "The role to assign to the user in the team. Valid values: owner, admin, editor, member",
                ),
        ),
        admin(
            "remove_team_member",
            "Remove a user from a team, revoking their access to team resources. Requires team admin privileges or the global admin role.",
            InputSchema::new()
                .required_integer("team_id", "The ID of the team to remove the member from")
                .required_integer("user_id", "The ID of the user to remove from the team"),
        ),
        admin(
            "link_source_to_team",
            "Link a log source to a team so its members can query it. Requires team admin privileges or the global admin role.",
            InputSchema::new()
                .required_integer("team_id", "The ID of the team to link the source to")
                .required_integer("source_id", "The ID of the source to link to the team"),
        ),
        admin(
            "unlink_source_from_team",
            "Remove a log source from a team, revoking its members' access to it. Requires team admin privileges or the global admin role.",
            InputSchema::new()
                .required_integer("team_id", "The ID of the team to unlink the source from")
                .required_integer("source_id", "The ID of the source to unlink from the team"),
        ),
        // Users
        admin(
            "list_all_users",
            "List all users in the system with their roles, status and activity. Admin only.",
            InputSchema::new(),
        )
        .admin_only(),
        admin(
            "get_user",
            "Get a user by ID: email, role, status and timestamps. Admin only.",
            InputSchema::new().required_integer("user_id", "The ID of the user to retrieve"),
        )
        .admin_only(),
        admin(
            "create_user",
            "Create a new user with email, full name, role (admin/member) and status (active/inactive). Admin only.",
            InputSchema::new()
                .required_string("email", "Email address of the user")
                .required_string("full_name", "Full name of the user")
                .required_string("role", "Role of the user. Valid values: admin, member")
                .required_string("status", "Status of the user. Valid values: active, inactive"),
        )
        .admin_only(),
        admin(
            "update_user",
            "Update a user's email, full name, role or status. Only the fields provided are changed. Admin only.",
            InputSchema::new()
                .required_integer("user_id", "The ID of the user to update")
                .optional_string("email", "New email address for the user")
                .optional_string("full_name", "New full name for the user")
                .optional_string("role", "New role for the user. Valid values: admin, member")
                .optional_string("status", "New status for the user. Valid values: active, inactive"),
        )
        .admin_only(),
        admin(
            "delete_user",
            "Delete a user and all of their associations. This cannot be undone, and the last admin cannot be deleted. Admin only.",
            InputSchema::new().required_integer("user_id", "The ID of the user to delete"),
        )
        .admin_only(),
        // API tokens
        admin(
            "list_api_tokens",
            "List the current user's API tokens with names, prefixes, last use and expiry. Does not require admin privileges.",
            InputSchema::new(),
        ),
        admin(
            "create_api_token",
            "Create an API token for the current user. Returns the full token value, which is only shown once, and its metadata.",
            InputSchema::new()
                .required_string("name", "Name for the API token")
                .optional_string(
                    "expires_at",
                    "Optional expiration time in ISO 8601 format, e.g. '2025-12-31T23:59:59Z'",
                ),
        ),
        admin(
            "delete_api_token",
            "Delete one of the current user's API tokens, immediately revoking it. This cannot be undone.",
            InputSchema::new().required_integer("token_id", "The ID of the API token to delete"),
        ),
        // Sources
        admin(
            "list_all_sources",
            "List all log sources in the system with connection details, status and metadata. Admin only.",
            InputSchema::new(),
        )
        .admin_only(),
        admin(
            "create_source",
            "Create a log source from ClickHouse connection details, metadata fields and an optional table schema for auto-creation. Admin only.",
            InputSchema::new()
                .required_string("name", "Name of the source")
                .optional_string("description", "Optional description of the source")
                .required_string("host", "ClickHouse host")
                .required_string("database", "ClickHouse database name")
                .required_string("table_name", "ClickHouse table name")
                .optional_boolean(
                    "_meta_is_auto_created",
                    "Whether the table should be auto-created if it doesn't exist",
                )
                .required_string("_meta_ts_field", "Timestamp field name, usually 'timestamp'")
                .optional_string("_meta_severity_field", "Optional severity field name")
                .required_integer("ttl_days", "Time-to-live in days for log data")
                .property(
                    "schema",
                    json!({
                        "type": "array",
                        "description": "Optional table schema for auto-creation",
                        "items": column
                    }),
                    false,
                ),
        )
        .admin_only(),
        admin(
            "validate_source_connection",
            "Check ClickHouse connectivity and table existence before creating a source, optionally validating the timestamp and severity fields. Admin only.",
            InputSchema::new()
                .required_string("host", "ClickHouse host")
                .required_string("database", "ClickHouse database name")
                .required_string("table_name", "ClickHouse table name")
                .optional_string("timestamp_field", "Optional timestamp field to validate")
                .optional_string("severity_field", "Optional severity field to validate"),
        )
        .admin_only(),
        admin(
            "delete_source",
            "Delete a log source and its team associations. This cannot be undone. Admin only.",
            InputSchema::new().required_integer("source_id", "The ID of the source to delete"),
        )
        .admin_only(),
        admin(
            "get_admin_source_stats",
            "Get ClickHouse table statistics for any source: row count, compressed and uncompressed size, compression ratio, part count and column types. Admin only.",
            InputSchema::new()
                .required_integer("source_id", "The ID of the source to get statistics for"),
        )
        .admin_only(),
    ]
}

pub(crate) async fn call(
    name: &str,
    client: &LogchefClient,
    args: Value,
) -> Result<Value, ToolError> {
    match name {
        "list_all_teams" => {
            let teams = client
                .list_all_teams()
                .await
                .map_err(upstream("list all teams"))?;
            to_value(&teams)
        }
        "get_team" => {
            let args: TeamIdArgs = parse_args(args)?;
            let team = client
                .get_team(args.team_id)
                .await
                .map_err(upstream("get team"))?;
            to_value(&team)
        }
        "create_team" => {
            let args: CreateTeamArgs = parse_args(args)?;
            let team = client
                .create_team(&TeamRequest {
                    name: args.name,
                    description: args.description,
                })
                .await
                .map_err(upstream("create team"))?;
            to_value(&team)
        }
        "update_team" => {
            let args: UpdateTeamArgs = parse_args(args)?;
            let update = TeamUpdateRequest {
                name: args.name,
                description: args.description,
            };
            let team = client
                .update_team(args.team_id, &update)
                .await
                .map_err(upstream("update team"))?;
            to_value(&team)
        }
        "delete_team" => {
            let args: TeamIdArgs = parse_args(args)?;
            client
                .delete_team(args.team_id)
                .await
                .map_err(upstream("delete team"))?;
            Ok(done("Team deleted successfully"))
        }
        "list_team_members" => {
            let args: TeamIdArgs = parse_args(args)?;
            let members = client
                .list_team_members(args.team_id)
                .await
                .map_err(upstream("list team members"))?;
            to_value(&members)
        }
        "add_team_member" => {
            let args: AddMemberArgs = parse_args(args)?;
            let member = TeamMemberRequest {
                user_id: args.user_id,
                role: args.role,
            };
            client
                .add_team_member(args.team_id, &member)
                .await
                .map_err(upstream("add team member"))?;
            Ok(done("Team member added successfully"))
        }
        "remove_team_member" => {
            let args: MemberArgs = parse_args(args)?;
            client
                .remove_team_member(args.team_id, args.user_id)
                .await
                .map_err(upstream("remove team member"))?;
            Ok(done("Team member removed successfully"))
        }
        "link_source_to_team" => {
            let args: TeamSourceArgs = parse_args(args)?;
            let link = TeamSourceRequest {
                source_id: args.source_id,
            };
            client
                .link_source_to_team(args.team_id, &link)
                .await
                .map_err(upstream("link source to team"))?;
            Ok(done("Source linked to team successfully"))
        }
        "unlink_source_from_team" => {
            let args: TeamSourceArgs = parse_args(args)?;
            client
                .unlink_source_from_team(args.team_id, args.source_id)
                .await
                .map_err(upstream("unlink source from team"))?;
            Ok(done("Source unlinked from team successfully"))
        }
        "list_all_users" => {
            let users = client
                .list_all_users()
                .await
                .map_err(upstream("list all users"))?;
            to_value(&users)
        }
        "get_user" => {
            let args: UserIdArgs = parse_args(args)?;
            let user = client
                .get_user(args.user_id)
                .await
                .map_err(upstream("get user"))?;
            to_value(&user)
        }
        "create_user" => {
            let user: UserRequest = parse_args(args)?;
            let user = client
                .create_user(&user)
                .await
                .map_err(upstream("create user"))?;
            to_value(&user)
        }
        "update_user" => {
            let args: UpdateUserArgs = parse_args(args)?;
            let user = client
                .update_user(args.user_id, &args.update)
                .await
                .map_err(upstream("update user"))?;
            to_value(&user)
        }
        "delete_user" => {
            let args: UserIdArgs = parse_args(args)?;
            client
                .delete_user(args.user_id)
                .await
                .map_err(upstream("delete user"))?;
            Ok(done("User deleted successfully"))
        }
        "list_api_tokens" => {
            let tokens = client
                .list_api_tokens()
                .await
                .map_err(upstream("list API tokens"))?;
            to_value(&tokens)
        }
        "create_api_token" => {
            let mut token: ApiTokenRequest = parse_args(args)?;
            token.expires_at = token.expires_at.filter(|e| !e.is_empty());
            let created = client
                .create_api_token(&token)
                .await
                .map_err(upstream("create API token"))?;
            to_value(&created)
        }
        "delete_api_token" => {
            let args: TokenIdArgs = parse_args(args)?;
            client
                .delete_api_token(args.token_id)
                .await
                .map_err(upstream("delete API token"))?;
            Ok(done("API token deleted successfully"))
        }
        "list_all_sources" => {
            let sources = client
                .list_all_sources()
                .await
                .map_err(upstream("list all sources"))?;
            to_value(&sources)
        }
        "create_source" => {
            let args: CreateSourceArgs = parse_args(args)?;
            let source = client
                .create_source(&SourceRequest::from(args))
                .await
                .map_err(upstream("create source"))?;
            to_value(&source)
        }
        "validate_source_connection" => {
            let args: ValidateSourceArgs = parse_args(args)?;
            let validation = SourceValidationRequest {
                host: args.host,
                database: args.database,
                table_name: args.table_name,
                timestamp_field: args.timestamp_field.filter(|f| !f.is_empty()),
                severity_field: args.severity_field.filter(|f| !f.is_empty()),
            };
            let result = client
                .validate_source_connection(&validation)
                .await
                .map_err(upstream("validate source connection"))?;
            to_value(&result)
        }
        "delete_source" => {
            let args: SourceIdArgs = parse_args(args)?;
            client
                .delete_source(args.source_id)
                .await
                .map_err(upstream("delete source"))?;
            Ok(done("Source deleted successfully"))
        }
        "get_admin_source_stats" => {
            let args: SourceIdArgs = parse_args(args)?;
            let stats = client
                .get_admin_source_stats(args.source_id)
                .await
                .map_err(upstream("get admin source stats"))?;
            to_value(&stats)
        }
        other => Err(unknown_tool(other)),
    }
}
