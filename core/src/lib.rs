//! Logchef REST models and a typed HTTP client.

pub mod admin;
pub mod client;
pub mod error;
pub mod logs;
pub mod profile;
pub mod sources;

use serde::{Deserialize, Deserializer, Serialize};

pub use client::{ClientConfig, DEFAULT_TIMEOUT, LogchefClient};
pub use error::ClientError;

/// `{"status": "...", "data": ...}` wrapper around every Logchef JSON response.
///
/// A `null` payload decodes as the empty value, so list endpoints with nothing
/// to return yield an empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Envelope<T> {
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_default")]
    pub data: T,
}

/// Reads JSON `null` as `T::default()`.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
