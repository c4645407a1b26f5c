use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub member_count: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamRequest {
    pub name: String,
    pub description: String,
}

/// Partial update; omitted fields stay unchanged server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub team_id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub role: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamMemberRequest {
    pub user_id: i64,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamSourceRequest {
    pub source_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub full_name: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub role: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<String>,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRequest {
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Personal API token metadata. The secret itself is only ever returned on creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiTokenRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedApiToken {
    pub token: String,
    pub api_token: ApiToken,
}
