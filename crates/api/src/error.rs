use reqwest::StatusCode;
use thiserror::Error;

/// Result type used throughout the API client
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors produced while talking to the storefront backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 401 from the backend. The session has already been cleared when this
    /// comes out of [`crate::ApiClient`].
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// 422 from the backend
    #[error("Validation error: {0}")]
    Validation(String),

    /// Input rejected before any request was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response did not match the documented schema
    #[error("Unexpected response shape for {target}: {message}")]
    Decode { target: String, message: String },

    /// Every candidate of a fallback sequence failed
    #[error("All {attempts} endpoint attempts failed; last error: {last}")]
    Exhausted { attempts: usize, last: Box<ApiError> },

    #[error("Not logged in")]
    MissingSession,

    #[error("Local storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Build an error from a non-success HTTP response.
    ///
    /// The message is taken from the JSON body's `message` field, then its
    /// `error` field, then the raw body text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                body.to_string()
            }
        });

        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            405 => ApiError::MethodNotAllowed(message),
            409 => ApiError::Conflict(message),
            422 => ApiError::Validation(message),
            429 => ApiError::RateLimited(message),
            code if code >= 500 => ApiError::Server {
                status: code,
                message,
            },
            code => ApiError::Api {
                status: code,
                message,
            },
        }
    }

    pub fn invalid_input<T: std::fmt::Display>(msg: T) -> Self {
        ApiError::InvalidInput(msg.to_string())
    }

    pub fn storage<T: std::fmt::Display>(msg: T) -> Self {
        ApiError::Storage(msg.to_string())
    }

    pub fn decode<T: std::fmt::Display>(target: &str, msg: T) -> Self {
        ApiError::Decode {
            target: target.to_string(),
            message: msg.to_string(),
        }
    }

    /// HTTP status carried by this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::MethodNotAllowed(_) => Some(405),
            ApiError::Conflict(_) => Some(409),
            ApiError::Validation(_) => Some(422),
            ApiError::RateLimited(_) => Some(429),
            ApiError::Server { status, .. } | ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// 404 or 405: the route or method does not exist on this backend
    pub fn is_route_miss(&self) -> bool {
        matches!(self, ApiError::NotFound(_) | ApiError::MethodNotAllowed(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Message suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::MethodNotAllowed(m)
            | ApiError::Conflict(m)
            | ApiError::Validation(m)
            | ApiError::InvalidInput(m)
            | ApiError::RateLimited(m) => m.clone(),
            ApiError::Server { message, .. } | ApiError::Api { message, .. } => message.clone(),
            ApiError::Exhausted { last, .. } => last.user_message(),
            other => other.to_string(),
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(str::to_string)
        .or_else(|| {
            // field-level validation errors, e.g. `{"errors": [{"email": "taken"}]}`
            value
                .get("errors")
                .filter(|errors| !errors.is_null())
                .map(|errors| errors.to_string())
        })
}
