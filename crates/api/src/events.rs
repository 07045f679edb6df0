//! Notifications broadcast by the API client

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a cart clear was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearSource {
    /// One of the backend endpoints accepted the request
    Remote,
    /// Every endpoint failed; only the local mirror was emptied
    StorageFallback,
    /// Every endpoint failed and the local mirror could not be written
    BestEffort,
}

impl ClearSource {
    pub fn message(&self) -> &'static str {
        match self {
            ClearSource::Remote => "Cart cleared",
            ClearSource::StorageFallback => "Cart cleared (storage fallback)",
            ClearSource::BestEffort => "Cart clearing attempted (best effort)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    CartCleared {
        source: ClearSource,
        timestamp: DateTime<Utc>,
    },
    /// A request came back 401; the stored session has been cleared and
    /// the user should be sent to `redirect_to`
    SessionExpired { redirect_to: String },
}
