//! OpDrape Storefront Client Library
//!
//! A Rust client for the OpDrape storefront, providing session-aware access
//! to the catalog, cart, wishlist, orders, admin panel and the AI shopping
//! assistant, together with an application state store.

pub mod config;
pub mod error;
pub mod store;

use std::sync::Arc;
use tokio::sync::broadcast;

pub use opdrape_api as api;
pub use opdrape_assistant as assistant;

use crate::config::{ClientOptions, StorefrontConfig};
use crate::error::Result;
use crate::store::AppStore;
use opdrape_api::{ApiClient, ClientEvent, LocalStore, MemoryStore};
use opdrape_assistant::AssistantClient;

/// The main entry point for the storefront client
#[derive(Clone)]
pub struct Storefront {
    /// The API root, e.g. `http://localhost:8000/api`
    pub url: String,
    /// Client options
    pub options: ClientOptions,
    api: ApiClient,
    store: Arc<AppStore>,
    assistant: AssistantClient,
}

impl Storefront {
    /// Create a new storefront client keeping its session in memory
    ///
    /// # Example
    ///
    /// ```
    /// use opdrape_storefront::Storefront;
    ///
    /// let storefront = Storefront::new("http://localhost:8000/api").unwrap();
    /// assert!(!storefront.store().state().is_authenticated);
    /// ```
    pub fn new(api_url: &str) -> Result<Self> {
        Self::new_with_options(api_url, ClientOptions::default())
    }

    /// Create a new storefront client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use opdrape_storefront::{Storefront, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_mock_data(true);
    /// let storefront = Storefront::new_with_options("http://localhost:8000/api", options).unwrap();
    /// ```
    pub fn new_with_options(api_url: &str, options: ClientOptions) -> Result<Self> {
        Self::with_storage(api_url, options, Arc::new(MemoryStore::new()))
    }

    /// Create a storefront client persisting its session in `storage`
    pub fn with_storage(
        api_url: &str,
        options: ClientOptions,
        storage: Arc<dyn LocalStore>,
    ) -> Result<Self> {
        let api = ApiClient::with_options(api_url, options.to_api_options(), storage)?;
        let assistant = AssistantClient::from_api(&api)?;

        let mut store = AppStore::new(api.clone());
        if options.offline_mirror {
            store = store.with_offline_mirror(options.mirror_ttl);
        }

        Ok(Self {
            url: api.base_url().to_string(),
            options,
            api,
            store: Arc::new(store),
            assistant,
        })
    }

    pub fn from_config(config: StorefrontConfig) -> Result<Self> {
        Self::new_with_options(config.api_url.as_str(), config.options)
    }

    /// The backend API client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The application state store
    pub fn store(&self) -> Arc<AppStore> {
        Arc::clone(&self.store)
    }

    /// The AI shopping assistant
    pub fn assistant(&self) -> &AssistantClient {
        &self.assistant
    }

    /// Client events such as session expiry and cart clearing
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.api.subscribe()
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("url", &self.url)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::{ClientOptions, StorefrontConfig};
    pub use crate::error::{Error, Result};
    pub use crate::store::{Action, ActionResult, AppState, AppStore};
    pub use crate::Storefront;
    pub use opdrape_api::{ApiClient, ClientEvent, Credentials, FileStore, LocalStore, MemoryStore};
    pub use opdrape_assistant::AssistantClient;
}
