//! OpDrape storefront API client
//!
//! An authenticated HTTP client for the OpDrape backend. Every request
//! carries the stored bearer token; a 401 from any endpoint clears the
//! session and broadcasts [`ClientEvent::SessionExpired`]. Operations whose
//! route has moved around on the backend are expressed as
//! [`fallback::FallbackSequence`]s.
//!
//! ```no_run
//! use opdrape_api::ApiClient;
//!
//! # async fn run() -> opdrape_api::Result<()> {
//! let api = ApiClient::new("http://localhost:8000/api")?;
//! let page = api.products().list(&Default::default()).await?;
//! println!("{} products", page.total);
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod error;
pub mod events;
pub mod fallback;
pub mod fetch;
pub mod local;
pub mod orders;
pub mod products;
pub mod session;
pub mod types;
pub mod upload;
pub mod wishlist;

use log::{error, info};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;

pub use error::{ApiError, Result};
pub use events::{ClearSource, ClientEvent};
pub use fallback::{Candidate, FallbackSequence};
pub use fetch::{Fetch, FetchBuilder};
pub use local::{FileStore, LocalStore, MemoryStore};
pub use session::{Mirrored, SessionCache};
pub use types::*;

use crate::admin::AdminApi;
use crate::auth::AuthApi;
use crate::cart::CartApi;
use crate::orders::OrdersApi;
use crate::products::ProductsApi;
use crate::upload::UploadApi;
use crate::wishlist::WishlistApi;

const EVENT_CAPACITY: usize = 32;

/// Options for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Timeout applied to every ordinary request
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    pub multi_upload_timeout: Duration,
    /// Local storage key holding the auth token
    pub auth_token_key: String,
    /// Serve generated listings when the catalog cannot be reached
    pub enable_mock_data: bool,
    /// Embed images as data URLs when every upload endpoint fails
    pub allow_upload_fallback: bool,
    /// Where to send the user after a 401
    pub login_redirect: String,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(30),
            multi_upload_timeout: Duration::from_secs(60),
            auth_token_key: "token".to_string(),
            enable_mock_data: false,
            allow_upload_fallback: true,
            login_redirect: "/login?reason=session_expired".to_string(),
        }
    }
}

/// Client for the storefront backend
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: Client,
    session: SessionCache,
    events: broadcast::Sender<ClientEvent>,
    options: ApiOptions,
}

impl ApiClient {
    /// Client with default options and in-memory storage
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, ApiOptions::default(), Arc::new(MemoryStore::new()))
    }

    pub fn with_options(
        base_url: &str,
        options: ApiOptions,
        store: Arc<dyn LocalStore>,
    ) -> Result<Self> {
        Url::parse(base_url)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let session = SessionCache::new(store, &options.auth_token_key);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: Client::new(),
            session,
            events,
            options,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ApiOptions {
        &self.options
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Receive [`ClientEvent`]s sent after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn products(&self) -> ProductsApi<'_> {
        ProductsApi::new(self)
    }

    pub fn cart(&self) -> CartApi<'_> {
        CartApi::new(self)
    }

    pub fn wishlist(&self) -> WishlistApi<'_> {
        WishlistApi::new(self)
    }

    pub fn orders(&self) -> OrdersApi<'_> {
        OrdersApi::new(self)
    }

    pub fn admin(&self) -> AdminApi<'_> {
        AdminApi::new(self)
    }

    pub fn uploads(&self) -> UploadApi<'_> {
        UploadApi::new(self)
    }

    /// Absolute URL for a path relative to the API root
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Start a request carrying the stored token and the default timeout
    pub async fn request(&self, method: Method, path: &str) -> Result<FetchBuilder<'_>> {
        let mut builder = FetchBuilder::new(&self.http_client, &self.url(path), method)
            .header("X-Requested-With", "XMLHttpRequest")
            .timeout(self.options.request_timeout);

        if let Some(token) = self.session.token().await? {
            builder = builder.bearer_auth(&token);
        }

        Ok(builder)
    }

    /// Execute a request built by [`ApiClient::request`], applying the
    /// session-expiry side effect on 401
    pub async fn execute<T: DeserializeOwned>(&self, builder: FetchBuilder<'_>) -> Result<T> {
        let result = builder.execute().await;
        self.guard(result).await
    }

    pub async fn execute_unit(&self, builder: FetchBuilder<'_>) -> Result<()> {
        let result = builder.execute_unit().await;
        self.guard(result).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.request(Method::GET, path).await?;
        self.execute(builder).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let builder = self.request(Method::GET, path).await?.query(query);
        self.execute(builder).await
    }

    /// Send an optional JSON body and decode the response
    pub async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(method, path).await?;
        if let Some(body) = body {
            builder = builder.json(body)?;
        }
        self.execute(builder).await
    }

    /// Run `candidate` with an optional JSON body
    pub async fn call<T, B>(&self, candidate: &Candidate, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(candidate.method.clone(), &candidate.path, body).await
    }

    async fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_unauthorized() {
                self.expire_session().await;
            }
        }
        result
    }

    /// Clear the stored session and tell subscribers to show the login view
    pub async fn expire_session(&self) {
        info!("session expired, clearing stored credentials");
        if let Err(e) = self.session.clear_session().await {
            error!("failed to clear stored session: {}", e);
        }
        self.emit(ClientEvent::SessionExpired {
            redirect_to: self.options.login_redirect.clone(),
        });
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Reject blank identifiers before they end up in a path
pub(crate) fn require_id<'a>(id: &'a str, what: &str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::invalid_input(format!("{} is required", what)));
    }
    Ok(id)
}

/// Percent-encode a path segment
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
