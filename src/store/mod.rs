//! Application state store
//!
//! [`AppStore`] owns the single [`AppState`] of a storefront session. Every
//! change is an [`Action`] run through the pure [`reduce`] function, and each
//! resulting state is broadcast to subscribers. Store operations talk to the
//! backend through the injected [`ApiClient`]; background refreshes never fail
//! outwardly, and wishlist mutations report failures in an [`ActionResult`].

mod action;
mod state;

pub use action::{reduce, Action, ActionResult};
pub use state::AppState;

use crate::error::Result;
use chrono::Duration;
use log::{debug, info, warn};
use opdrape_api::{ApiClient, ApiError, Cart, Credentials, User, WishlistItem};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

const STATE_CAPACITY: usize = 64;

/// Holder of the application state
pub struct AppStore {
    api: ApiClient,
    state: RwLock<AppState>,
    updates: broadcast::Sender<AppState>,
    mirror_ttl: Option<Duration>,
}

impl AppStore {
    pub fn new(api: ApiClient) -> Self {
        let (updates, _) = broadcast::channel(STATE_CAPACITY);
        Self {
            api,
            state: RwLock::new(AppState::default()),
            updates,
            mirror_ttl: None,
        }
    }

    /// Serve cart and wishlist mirrors younger than `ttl` when a refresh fails
    pub fn with_offline_mirror(mut self, ttl: Duration) -> Self {
        self.mirror_ttl = Some(ttl);
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Current state
    pub fn state(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receive every state published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<AppState> {
        self.updates.subscribe()
    }

    /// Apply `action` and publish the resulting state
    pub fn dispatch(&self, action: Action) -> AppState {
        let next = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = reduce(&state, &action);
            state.clone()
        };
        debug!("dispatched {}", action.name());
        // No subscribers is fine
        let _ = self.updates.send(next.clone());
        next
    }

    /// Restore the session on startup.
    ///
    /// Without a stored token this resolves to the logged-out state without
    /// touching the network. Otherwise the token is validated by fetching the
    /// profile; if that fails the cached user is used, and if there is none
    /// the session is dropped.
    pub async fn bootstrap(&self) -> AppState {
        let token = self.api.session().token().await.unwrap_or_else(|e| {
            warn!("could not read stored token: {}", e);
            None
        });
        if token.is_none() {
            debug!("no stored token, starting logged out");
            return self.dispatch(Action::Logout);
        }

        self.dispatch(Action::Loading);
        let err = match self.api.auth().get_profile().await {
            Ok(user) => {
                self.login(user).await;
                return self.state();
            }
            Err(err) => err,
        };
        warn!("could not load profile: {}", err);

        match self.api.session().user().await {
            Ok(Some(user)) => {
                info!("restoring cached user {}", user.display_name());
                self.login(user).await;
                return self.state();
            }
            Ok(None) => {}
            Err(e) => warn!("could not read cached user: {}", e),
        }

        self.clear_stored_session().await;
        let message = match err.status() {
            Some(_) => err.user_message(),
            None => "Authentication failed".to_string(),
        };
        self.dispatch(Action::AuthError(message))
    }

    /// Enter the authenticated state as `user`, then refresh cart and
    /// wishlist together
    pub async fn login(&self, user: User) {
        let user = user.normalized();
        if let Err(e) = self.api.session().set_user(&user).await {
            warn!("could not cache user: {}", e);
        }
        self.dispatch(Action::LoginSuccess(user));

        tokio::join!(self.refresh_cart(), self.refresh_wishlist());
    }

    /// Log in with credentials and enter the authenticated state
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<User> {
        let session = self.api.auth().login(credentials).await?;
        self.login(session.user.clone()).await;
        Ok(session.user)
    }

    /// Drop the stored session and publish the logged-out state
    pub async fn logout(&self) -> AppState {
        self.clear_stored_session().await;
        self.dispatch(Action::Logout)
    }

    pub fn update_user(&self, user: User) -> AppState {
        self.dispatch(Action::UpdateUser(user))
    }

    pub fn update_cart(&self, cart: Cart) -> AppState {
        self.dispatch(Action::UpdateCart(cart))
    }

    pub fn update_wishlist(&self, items: Vec<WishlistItem>) -> AppState {
        self.dispatch(Action::UpdateWishlist(items))
    }

    /// Reload the cart. Failures degrade to an empty cart, or to a fresh
    /// enough mirror when offline mirroring is on.
    pub async fn refresh_cart(&self) {
        if !self.state().is_authenticated {
            return;
        }

        match self.api.cart().get().await {
            Ok(cart) => {
                if let Err(e) = self.api.session().mirror_cart(&cart).await {
                    warn!("could not mirror cart: {}", e);
                }
                self.dispatch(Action::UpdateCart(cart));
            }
            Err(err) if err.is_unauthorized() => {
                self.dispatch(Action::Logout);
            }
            Err(err) => {
                warn!("cart refresh failed: {}", err);
                let cart = self.cart_mirror().await.unwrap_or_default();
                self.dispatch(Action::UpdateCart(cart));
            }
        }
    }

    /// Reload the wishlist. Logged out, this publishes an empty wishlist.
    pub async fn refresh_wishlist(&self) {
        if !self.state().is_authenticated {
            self.dispatch(Action::UpdateWishlist(Vec::new()));
            return;
        }

        match self.api.wishlist().get().await {
            Ok(items) => {
                if let Err(e) = self.api.session().mirror_wishlist(&items).await {
                    warn!("could not mirror wishlist: {}", e);
                }
                self.dispatch(Action::UpdateWishlist(items));
            }
            Err(err) if err.is_unauthorized() => {
                self.dispatch(Action::Logout);
            }
            Err(err) => {
                warn!("wishlist refresh failed: {}", err);
                let items = self.wishlist_mirror().await.unwrap_or_default();
                self.dispatch(Action::UpdateWishlist(items));
            }
        }
    }

    pub async fn add_to_wishlist(&self, product_id: &str) -> ActionResult {
        if !self.state().is_authenticated {
            warn!("wishlist add attempted while logged out");
            return ActionResult::failure("Please log in to add items to wishlist");
        }

        match self.api.wishlist().add(product_id).await {
            Ok(data) => {
                self.refresh_wishlist().await;
                ActionResult::success("Added to wishlist", data)
            }
            Err(err) => self.failure(err, "Failed to add to wishlist"),
        }
    }

    pub async fn remove_from_wishlist(&self, product_id: &str) -> ActionResult {
        if !self.state().is_authenticated {
            warn!("wishlist removal attempted while logged out");
            return ActionResult::failure("Please log in");
        }

        match self.api.wishlist().remove(product_id).await {
            Ok(data) => {
                self.refresh_wishlist().await;
                ActionResult::success("Removed from wishlist", data)
            }
            Err(err) => self.failure(err, "Failed to remove from wishlist"),
        }
    }

    /// Remove the product if it is wishlisted, add it otherwise
    pub async fn toggle_wishlist(&self, product_id: &str) -> ActionResult {
        if !self.state().is_authenticated {
            return ActionResult::failure("Please log in");
        }

        if self.is_in_wishlist(product_id) {
            self.remove_from_wishlist(product_id).await
        } else {
            self.add_to_wishlist(product_id).await
        }
    }

    pub fn is_in_wishlist(&self, product_id: &str) -> bool {
        self.state().is_in_wishlist(product_id)
    }

    /// Admin rights of the current user, else of the cached user
    pub async fn is_admin(&self) -> bool {
        if self.state().is_admin() {
            return true;
        }
        match self.api.session().user().await {
            Ok(user) => user.map_or(false, |u| u.has_admin_rights()),
            Err(e) => {
                warn!("could not read cached user: {}", e);
                false
            }
        }
    }

    async fn clear_stored_session(&self) {
        if let Err(e) = self.api.session().clear_session().await {
            warn!("could not clear stored session: {}", e);
        }
    }

    async fn cart_mirror(&self) -> Option<Cart> {
        let ttl = self.mirror_ttl?;
        match self.api.session().cart_mirror(ttl).await {
            Ok(cart) => cart,
            Err(e) => {
                warn!("could not read cart mirror: {}", e);
                None
            }
        }
    }

    async fn wishlist_mirror(&self) -> Option<Vec<WishlistItem>> {
        let ttl = self.mirror_ttl?;
        match self.api.session().wishlist_mirror(ttl).await {
            Ok(items) => items,
            Err(e) => {
                warn!("could not read wishlist mirror: {}", e);
                None
            }
        }
    }

    fn failure(&self, err: ApiError, fallback: &str) -> ActionResult {
        warn!("{}: {}", fallback, err);
        if err.is_unauthorized() {
            self.dispatch(Action::Logout);
        }
        match err {
            ApiError::InvalidInput(message) => ActionResult::failure(message),
            err if err.status().is_some() => ActionResult::failure(err.user_message()),
            _ => ActionResult::failure(fallback),
        }
    }
}

impl std::fmt::Debug for AppStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStore")
            .field("api", &self.api)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
