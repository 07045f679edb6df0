//! Error handling for the storefront client

use opdrape_api::ApiError;
use opdrape_assistant::AssistantError;
use std::fmt;
use thiserror::Error;

/// Unified error type for the storefront client
#[derive(Error, Debug)]
pub enum Error {
    /// Backend API errors
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Shopping assistant errors
    #[error(transparent)]
    Assistant(#[from] AssistantError),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Message fit for showing to a shopper
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
