use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sources::LogColumn;

pub const QUERY_LIMIT_MAX: i64 = 100;
pub const QUERY_TIMEOUT_DEFAULT_SECS: i64 = 30;

/// Body of `POST .../logs/query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogQueryRequest {
    pub raw_sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<i64>,
}

impl LogQueryRequest {
    /// Applies the row cap and default timeout the backend contract expects.
    /// Absent or non-positive limits become the maximum.
    pub fn normalized(mut self) -> Self {
        let limit = match self.limit {
            Some(limit) if limit > 0 => limit.min(QUERY_LIMIT_MAX),
            _ => QUERY_LIMIT_MAX,
        };
        self.limit = Some(limit);
        self.query_timeout.get_or_insert(QUERY_TIMEOUT_DEFAULT_SECS);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogQueryStats {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub execution_time_ms: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub rows_read: i64,
}

/// Rows have a per-source schema, so each entry stays an untyped JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogQueryResult {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub logs: Vec<Map<String, Value>>,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub stats: LogQueryStats,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub columns: Vec<LogColumn>,
}

/// Body of `POST .../logs/histogram`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistogramRequest {
    pub raw_sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistogramPoint {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub bucket: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub log_count: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub group_value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Histogram {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub granularity: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub data: Vec<HistogramPoint>,
}

/// A saved query scoped to a team and source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub team_id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub source_id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub query: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(limit: Option<i64>, query_timeout: Option<i64>) -> LogQueryRequest {
        LogQueryRequest {
            raw_sql: "SELECT 1".to_string(),
            limit,
            query_timeout,
        }
    }

    #[test]
    fn normalized_defaults_missing_and_non_positive_limits_to_max() {
        assert_eq!(request(None, None).normalized().limit, Some(100));
        assert_eq!(request(Some(0), None).normalized().limit, Some(100));
        assert_eq!(request(Some(-5), None).normalized().limit, Some(100));
    }

    #[test]
    fn normalized_caps_limit_and_keeps_smaller_values() {
        assert_eq!(request(Some(500), None).normalized().limit, Some(100));
        assert_eq!(request(Some(25), None).normalized().limit, Some(25));
    }

    #[test]
    fn normalized_only_fills_timeout_when_absent() {
        assert_eq!(request(None, None).normalized().query_timeout, Some(30));
        assert_eq!(request(None, Some(90)).normalized().query_timeout, Some(90));
    }

    #[test]
    fn log_rows_keep_arbitrary_columns() {
        let result: LogQueryResult = serde_json::from_value(serde_json::json!({
            "logs": [{ "timestamp": "2025-06-12 05:00:00", "severity_text": "ERROR", "attempt": 3 }],
            "stats": { "execution_time_ms": 12, "rows_read": 4096 },
            "columns": [{ "name": "timestamp", "type": "DateTime64(3)" }]
        }))
        .unwrap();
        assert_eq!(result.logs[0]["attempt"], 3);
        assert_eq!(result.stats.rows_read, 4096);
        assert_eq!(result.columns[0].column_type, "DateTime64(3)");
    }
}
