use logchef_core::LogchefClient;
use logchef_core::logs::{CollectionRequest, HistogramRequest, LogQueryRequest};
use serde::Deserialize;
use serde_json::Value;

use super::{InputSchema, ToolDefinition, done, parse_args, to_value, unknown_tool, upstream};
use crate::ToolError;
use crate::categories::ToolCategory;

const TEAM_ACCESS: &str = "The ID of the team that has access to the source";

#[derive(Debug, Deserialize)]
struct SourceArgs {
    team_id: i64,
    source_id: i64,
}

#[derive(Debug, Deserialize)]
struct QueryLogsArgs {
    team_id: i64,
    source_id: i64,
    raw_sql: String,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    query_timeout: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct HistogramArgs {
    team_id: i64,
    source_id: i64,
    raw_sql: String,
    #[serde(default)]
    window: Option<String>,
    #[serde(default)]
    group_by: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    query_timeout: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CollectionArgs {
    team_id: i64,
    source_id: i64,
    collection_id: i64,
}

#[derive(Debug, Deserialize)]
struct SaveCollectionArgs {
    team_id: i64,
    source_id: i64,
    #[serde(default)]
    collection_id: Option<i64>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    query: String,
}

impl SaveCollectionArgs {
    fn request(&self) -> CollectionRequest {
        CollectionRequest {
            name: self.name.clone(),
            description: self.description.clone().filter(|d| !d.is_empty()),
            query: self.query.clone(),
        }
    }
}

fn source_schema(source_description: &str) -> InputSchema {
    InputSchema::new()
        .required_integer("team_id", TEAM_ACCESS)
        .required_integer("source_id", source_description)
}

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "query_logs",
            ToolCategory::Logs,
            "Execute a ClickHouse SQL query against a specific log source within a team. Before using this tool, use get_source_schema to understand the available columns and their types. The query should include WHERE clauses with timestamp filters, an ORDER BY clause and a LIMIT clause. Returns log entries with execution statistics and column metadata. Maximum 100 results per query.",
            source_schema("The ID of the source to query logs from")
                .required_string(
                    "raw_sql",
                    "The ClickHouse SQL query to execute. Example: SELECT * FROM default.logs WHERE timestamp BETWEEN toDateTime('2025-06-12 05:00:00') AND toDateTime('2025-06-12 17:00:00') ORDER BY timestamp DESC LIMIT 50",
                )
                .optional_integer(
                    "limit",
                    "Maximum number of log entries to return. Must be between 1 and 100. Defaults to 100 if not specified.",
                )
                .optional_integer(
                    "query_timeout",
                    "Query timeout in seconds. Defaults to 30 seconds if not specified.",
                )
                .build(),
        ),
        ToolDefinition::new(
            "get_source_schema",
            ToolCategory::Logs,
            "Get the ClickHouse table schema (column names and types) for a specific log source within a team. Use this before querying logs to learn which fields are available and how to construct SQL for them.",
            source_schema("The ID of the source to get the schema for").build(),
        ),
        ToolDefinition::new(
            "get_log_histogram",
            ToolCategory::Logs,
            "Generate time-based histogram data for a team source. Produces log volume per time window, optionally grouped by a field such as severity or service. Useful for spotting spikes and trends. Requires a SQL query with time filters.",
            source_schema("The ID of the source to generate histogram for")
                .required_string(
                    "raw_sql",
                    "The ClickHouse SQL query to analyze. Should include WHERE clauses with timestamp filters.",
                )
                .optional_string(
                    "window",
                    "Time window for histogram buckets, e.g. '1m', '5m', '1h', '1d'. Defaults to '1m' if not specified.",
                )
                .optional_string(
                    "group_by",
                    "Optional field to group histogram data by, e.g. 'severity_text' or 'service_name'.",
                )
                .optional_string(
                    "timezone",
                    "Timezone for histogram timestamps, e.g. 'UTC' or 'Europe/London'. Defaults to 'UTC' if not specified.",
                )
                .optional_integer(
                    "query_timeout",
                    "Query timeout in seconds. Defaults to 30 seconds if not specified.",
                )
                .build(),
        ),
        ToolDefinition::new(
            "get_source_stats",
            ToolCategory::Logs,
            "Get ClickHouse table statistics for a source within a team: row count, compressed and uncompressed size, compression ratio, part count and column types.",
            source_schema("The ID of the source to get statistics for").build(),
        ),
        ToolDefinition::new(
            "get_collections",
            ToolCategory::Logs,
            "Get all saved query collections for a specific team and source. Collections are saved queries that can be reused for common log analysis patterns.",
            source_schema("The ID of the source to get collections for").build(),
        ),
        ToolDefinition::new(
            "create_collection",
            ToolCategory::Logs,
            "Create a new saved query collection for a specific team and source. Provide a name, optional description, and the ClickHouse SQL query to save.",
            source_schema("The ID of the source to create the collection for")
                .required_string("name", "Name of the collection")
                .optional_string("description", "Optional description of the collection")
                .required_string("query", "The ClickHouse SQL query to save in the collection")
                .build(),
        ),
        ToolDefinition::new(
            "get_collection",
            ToolCategory::Logs,
            "Get a specific saved query collection by ID, including its name, description and query.",
            source_schema("The ID of the source that contains the collection")
                .required_integer("collection_id", "The ID of the collection to retrieve")
                .build(),
        ),
        ToolDefinition::new(
            "update_collection",
            ToolCategory::Logs,
            "Update an existing saved query collection. All fields are required; provide the current values for fields you don't want to change.",
            source_schema("The ID of the source that contains the collection")
                .required_integer("collection_id", "The ID of the collection to update")
                .required_string("name", "Name of the collection")
                .optional_string("description", "Optional description of the collection")
                .required_string("query", "The ClickHouse SQL query to save in the collection")
                .build(),
        ),
        ToolDefinition::new(
            "delete_collection",
            ToolCategory::Logs,
            "Delete a saved query collection by ID. This permanently removes the collection and cannot be undone.",
            source_schema("The ID of the source that contains the collection")
                .required_integer("collection_id", "The ID of the collection to delete")
                .build(),
        ),
    ]
}

pub(crate) async fn call(
    name: &str,
    client: &LogchefClient,
    args: Value,
) -> Result<Value, ToolError> {
    match name {
        "query_logs" => {
            let args: QueryLogsArgs = parse_args(args)?;
            let query = LogQueryRequest {
                raw_sql: args.raw_sql,
                limit: args.limit,
                query_timeout: args.query_timeout,
            };
            let result = client
                .query_logs(args.team_id, args.source_id, query)
                .await
                .map_err(upstream("query logs"))?;
            to_value(&result)
        }
        "get_source_schema" => {
            let args: SourceArgs = parse_args(args)?;
            let columns = client
                .get_source_schema(args.team_id, args.source_id)
                .await
                .map_err(upstream("get source schema"))?;
            to_value(&columns)
        }
        "get_log_histogram" => {
            let args: HistogramArgs = parse_args(args)?;
            let request = HistogramRequest {
                raw_sql: args.raw_sql,
                window: args.window.filter(|w| !w.is_empty()),
                group_by: args.group_by.filter(|g| !g.is_empty()),
                timezone: args.timezone.filter(|t| !t.is_empty()),
                query_timeout: args.query_timeout,
            };
            let histogram = client
                .get_log_histogram(args.team_id, args.source_id, &request)
                .await
                .map_err(upstream("get log histogram"))?;
            to_value(&histogram)
        }
        "get_source_stats" => {
            let args: SourceArgs = parse_args(args)?;
            let stats = client
                .get_source_stats(args.team_id, args.source_id)
                .await
                .map_err(upstream("get source stats"))?;
            to_value(&stats)
        }
        "get_collections" => {
            let args: SourceArgs = parse_args(args)?;
            let collections = client
                .get_collections(args.team_id, args.source_id)
                .await
                .map_err(upstream("get collections"))?;
            to_value(&collections)
        }
        "create_collection" => {
            let args: SaveCollectionArgs = parse_args(args)?;
            let collection = client
                .create_collection(args.team_id, args.source_id, &args.request())
                .await
                .map_err(upstream("create collection"))?;
            to_value(&collection)
        }
        "get_collection" => {
            let args: CollectionArgs = parse_args(args)?;
            let collection = client
                .get_collection(args.team_id, args.source_id, args.collection_id)
                .await
                .map_err(upstream("get collection"))?;
            to_value(&collection)
        }
        "update_collection" => {
            let args: SaveCollectionArgs = parse_args(args)?;
            let collection_id = args.collection_id.ok_or_else(|| {
                ToolError::new("invalid_arguments", "invalid arguments: missing field `collection_id`")
                    .with_field("collection_id")
            })?;
            let collection = client
                .update_collection(args.team_id, args.source_id, collection_id, &args.request())
                .await
                .map_err(upstream("update collection"))?;
            to_value(&collection)
        }
        "delete_collection" => {
            let args: CollectionArgs = parse_args(args)?;
            client
                .delete_collection(args.team_id, args.source_id, args.collection_id)
                .await
                .map_err(upstream("delete collection"))?;
            Ok(done("Collection deleted successfully"))
        }
        other => Err(unknown_tool(other)),
    }
}
