use serde::{Deserialize, Serialize};

/// Role string the backend assigns to global administrators.
pub const ADMIN_ROLE: &str = "admin";

/// Payload of `GET /api/v1/me`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub api_token: ProfileApiToken,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub auth_method: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub user: ProfileUser,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.user.role == ADMIN_ROLE
    }
}

/// The token that authenticated the current request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileApiToken {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub prefix: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub last_used_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUser {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub full_name: String,
    /// Global role: "admin" or "member"
    #[serde(default, deserialize_with = "crate::null_default")]
    pub role: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub status: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub last_login_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub updated_at: String,
}

/// A team the current user belongs to, as returned by `GET /api/v1/me/teams`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserTeam {
    pub id: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub name: String,
    /// The caller's role inside this team (owner, admin, editor, member)
    #[serde(default, deserialize_with = "crate::null_default")]
    pub role: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub member_count: i64,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub updated_at: String,
}

/// Server metadata from the unauthenticated `GET /api/v1/meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerMeta {
    #[serde(default, deserialize_with = "crate::null_default")]
    pub version: String,
    #[serde(default, deserialize_with = "crate::null_default")]
    pub http_server_timeout: String,
}
