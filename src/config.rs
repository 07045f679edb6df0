//! Configuration options for the storefront client

use crate::error::{Error, Result};
use chrono::Duration as MirrorTtl;
use opdrape_api::ApiOptions;
use std::env;
use std::time::Duration;
use url::Url;

/// API root used when `STOREFRONT_API_URL` is not set
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Configuration options for the storefront client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Duration,

    /// Timeout for single image uploads
    pub upload_timeout: Duration,

    /// Timeout for multi-image uploads
    pub multi_upload_timeout: Duration,

    /// Local storage key holding the auth token
    pub auth_token_key: String,

    /// Serve generated listings when the catalog cannot be reached
    pub enable_mock_data: bool,

    /// Embed images as data URLs when every upload endpoint fails
    pub allow_upload_fallback: bool,

    /// Fall back to locally mirrored cart and wishlist when a refresh fails
    pub offline_mirror: bool,

    /// Oldest mirror still served while offline
    pub mirror_ttl: MirrorTtl,

    /// Where to send the user after the session expires
    pub login_redirect: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let api = ApiOptions::default();
        Self {
            request_timeout: api.request_timeout,
            upload_timeout: api.upload_timeout,
            multi_upload_timeout: api.multi_upload_timeout,
            auth_token_key: api.auth_token_key,
            enable_mock_data: api.enable_mock_data,
            allow_upload_fallback: api.allow_upload_fallback,
            offline_mirror: false,
            mirror_ttl: MirrorTtl::hours(24),
            login_redirect: api.login_redirect,
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the upload timeouts
    pub fn with_upload_timeouts(mut self, single: Duration, multiple: Duration) -> Self {
        self.upload_timeout = single;
        self.multi_upload_timeout = multiple;
        self
    }

    /// Set the auth token storage key
    pub fn with_auth_token_key(mut self, value: &str) -> Self {
        self.auth_token_key = value.to_string();
        self
    }

    pub fn with_mock_data(mut self, value: bool) -> Self {
        self.enable_mock_data = value;
        self
    }

    pub fn with_upload_fallback(mut self, value: bool) -> Self {
        self.allow_upload_fallback = value;
        self
    }

    /// Serve mirrors younger than `ttl` when a refresh fails
    pub fn with_offline_mirror(mut self, ttl: MirrorTtl) -> Self {
        self.offline_mirror = true;
        self.mirror_ttl = ttl;
        self
    }

    pub fn with_login_redirect(mut self, value: &str) -> Self {
        self.login_redirect = value.to_string();
        self
    }

    /// Options for the underlying API client
    pub fn to_api_options(&self) -> ApiOptions {
        ApiOptions {
            request_timeout: self.request_timeout,
            upload_timeout: self.upload_timeout,
            multi_upload_timeout: self.multi_upload_timeout,
            auth_token_key: self.auth_token_key.clone(),
            enable_mock_data: self.enable_mock_data,
            allow_upload_fallback: self.allow_upload_fallback,
            login_redirect: self.login_redirect.clone(),
        }
    }
}

/// Where the backend lives and how to talk to it
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub api_url: Url,
    pub options: ClientOptions,
}

impl StorefrontConfig {
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: Url::parse(api_url)?,
            options: ClientOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Read the configuration from `STOREFRONT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("STOREFRONT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&api_url)?;

        if let Some(raw) = lookup("STOREFRONT_API_TIMEOUT_MS") {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                Error::config(format!("STOREFRONT_API_TIMEOUT_MS is not a number: {}", raw))
            })?;
            config.options.request_timeout = Duration::from_millis(millis);
        }
        if let Some(key) = lookup("STOREFRONT_AUTH_TOKEN_NAME").filter(|k| !k.trim().is_empty()) {
            config.options.auth_token_key = key.trim().to_string();
        }
        if let Some(raw) = lookup("STOREFRONT_ENABLE_MOCK_DATA") {
            config.options.enable_mock_data = matches!(raw.trim(), "true" | "1");
        }

        Ok(config)
    }
}
