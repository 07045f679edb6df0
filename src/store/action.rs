//! State transitions

use super::state::AppState;
use opdrape_api::{Cart, User, WishlistItem};
use serde::Serialize;
use serde_json::Value;

/// Every change to [`AppState`] goes through one of these
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Loading,
    LoginSuccess(User),
    Logout,
    AuthError(String),
    ClearError,
    UpdateUser(User),
    UpdateCart(Cart),
    UpdateWishlist(Vec<WishlistItem>),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Loading => "LOADING",
            Action::LoginSuccess(_) => "LOGIN_SUCCESS",
            Action::Logout => "LOGOUT",
            Action::AuthError(_) => "AUTH_ERROR",
            Action::ClearError => "CLEAR_ERROR",
            Action::UpdateUser(_) => "UPDATE_USER",
            Action::UpdateCart(_) => "UPDATE_CART",
            Action::UpdateWishlist(_) => "UPDATE_WISHLIST",
        }
    }
}

/// Compute the state following `action`. Snapshots are replaced whole,
/// never merged. Snapshot updates arriving while logged out leave the
/// snapshots empty.
pub fn reduce(state: &AppState, action: &Action) -> AppState {
    match action {
        Action::Loading => AppState {
            loading: true,
            ..state.clone()
        },
        Action::LoginSuccess(user) => AppState {
            user: Some(user.clone().normalized()),
            is_authenticated: true,
            loading: false,
            error: None,
            ..state.clone()
        },
        Action::Logout => AppState::logged_out(None),
        Action::AuthError(message) => AppState::logged_out(Some(message.clone())),
        Action::ClearError => AppState {
            error: None,
            ..state.clone()
        },
        Action::UpdateUser(user) => AppState {
            user: Some(user.clone().normalized()),
            loading: false,
            ..state.clone()
        },
        Action::UpdateCart(cart) => AppState {
            cart: if state.is_authenticated {
                cart.clone()
            } else {
                Cart::default()
            },
            loading: false,
            ..state.clone()
        },
        Action::UpdateWishlist(items) => AppState {
            wishlist: if state.is_authenticated {
                items.clone()
            } else {
                Vec::new()
            },
            loading: false,
            ..state.clone()
        },
    }
}

/// Outcome of a user-initiated store action. Failures are reported here
/// rather than returned as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionResult {
    pub fn success(message: &str, data: Value) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn failure<T: std::fmt::Display>(message: T) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            data: None,
        }
    }
}
