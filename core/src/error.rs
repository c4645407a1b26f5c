use thiserror::Error;

/// Failure of a single Logchef API call.
///
/// The variants keep transport failures, unexpected statuses and undecodable
/// bodies apart so callers (and agents reading the message) can tell a dead
/// backend from a rejected request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint URL could not be built from the configured base URL.
    #[error("create request: {0}")]
    Url(#[from] url::ParseError),
    /// The request never produced a response (connect, TLS, timeout).
    #[error("make request: {0}")]
    Transport(#[source] reqwest::Error),
    /// The response arrived but its body could not be read.
    #[error("read response body: {0}")]
    Body(#[source] reqwest::Error),
    /// The backend answered with a status other than the endpoint's success status.
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// The body was not the JSON shape the endpoint documents.
    #[error("unmarshal response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Machine-readable code, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Url(_) => "invalid_url",
            ClientError::Transport(_) => "connection_error",
            ClientError::Body(_) => "response_error",
            ClientError::Status { .. } => "upstream_status",
            ClientError::Decode(_) => "decode_error",
        }
    }

    /// HTTP status when the backend answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
