use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// ClickHouse coordinates backing a source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConnection {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub host: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub database: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub table_name: String,
}

/// A log source. The same shape is served by team-scoped and admin endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub connection: SourceConnection,
    #[serde(rename = "_meta_is_auto_created", default, deserialize_with = "crate::null_default")]
    pub meta_is_auto_created: bool,
    #[serde(rename = "_meta_ts_field", default, deserialize_with = "crate::null_default")]
    pub meta_ts_field: String,
    #[serde(rename = "_meta_severity_field", default, deserialize_with = "crate::null_default")]
    pub meta_severity_field: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub ttl_days: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub is_connected: bool,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub updated_at: String,
}

/// Column name and ClickHouse type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableStats {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub database: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub table: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub compressed: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub uncompressed: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub compr_rate: f64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub rows: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub part_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnStats {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "crate::null_default")]
    pub column_type: String,
}

/// Table and column statistics for a source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceStats {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub table_stats: TableStats,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub column_stats: Vec<ColumnStats>,
}

/// Body of `POST /api/v1/admin/sources`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRequest {
    pub name: String,
    pub description: String,
    pub connection: SourceConnection,
    #[serde(rename = "_meta_is_auto_created")]
    pub meta_is_auto_created: bool,
    #[serde(rename = "_meta_ts_field")]
    pub meta_ts_field: String,
    #[serde(rename = "_meta_severity_field")]
    pub meta_severity_field: String,
    pub ttl_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<LogColumn>>,
}

/// Body of `POST /api/v1/admin/sources/validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceValidationRequest {
    pub host: String,
    pub database: String,
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_field: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceValidationResult {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub is_valid: bool,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub message: String,
    #[serde(default, deserialize_with = "crate::null_default", skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<String>,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub table_exists: bool,
    #[serde(default, deserialize_with = "crate::null_default", skip_serializing_if = "BTreeMap::is_empty")]
    pub column_checks: BTreeMap<String, bool>,
}
