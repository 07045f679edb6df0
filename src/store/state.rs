//! Application state published by [`AppStore`](super::AppStore)

use opdrape_api::{wishlist_contains, Cart, User, WishlistItem};
use serde::Serialize;

/// Snapshot of the session, cart and wishlist.
///
/// Cart and wishlist are only meaningful while `is_authenticated` is set;
/// they are empty whenever it is not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub loading: bool,
    pub cart: Cart,
    pub wishlist: Vec<WishlistItem>,
    pub error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            loading: true,
            cart: Cart::default(),
            wishlist: Vec::new(),
            error: None,
        }
    }
}

impl AppState {
    pub fn is_in_wishlist(&self, product_id: &str) -> bool {
        wishlist_contains(&self.wishlist, product_id)
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map_or(false, User::has_admin_rights)
    }

    /// Logged-out state with empty snapshots
    pub(crate) fn logged_out(error: Option<String>) -> Self {
        Self {
            loading: false,
            error,
            ..Self::default()
        }
    }
}
