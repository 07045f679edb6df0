//! Typed view over the local store: the session (token, user, admin flag)
//! and the offline mirrors of the cart and wishlist.

use crate::error::Result;
use crate::local::LocalStore;
use crate::types::{Cart, User, WishlistItem};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

pub const USER_KEY: &str = "user";
pub const IS_ADMIN_KEY: &str = "isAdmin";
pub const CART_KEY: &str = "cart";
pub const WISHLIST_KEY: &str = "wishlist";

/// A locally stored copy of remote data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mirrored<T> {
    pub value: T,
    pub stored_at: DateTime<Utc>,
}

impl<T> Mirrored<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
        }
    }

    /// Whether the copy is younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.stored_at <= ttl
    }
}

/// Session and mirror storage
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn LocalStore>,
    token_key: String,
}

impl SessionCache {
    pub fn new(store: Arc<dyn LocalStore>, token_key: &str) -> Self {
        Self {
            store,
            token_key: token_key.to_string(),
        }
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    /// Stored token without any `Bearer ` prefix. Blank tokens read as absent.
    pub async fn token(&self) -> Result<Option<String>> {
        let raw = self.store.get(&self.token_key).await?;
        Ok(raw.and_then(|t| normalize_token(&t)))
    }

    pub async fn set_token(&self, token: &str) -> Result<()> {
        match normalize_token(token) {
            Some(token) => self.store.set(&self.token_key, token).await,
            None => self.store.remove(&self.token_key).await,
        }
    }

    pub async fn has_session(&self) -> bool {
        matches!(self.token().await, Ok(Some(_)))
    }

    /// Persist the user together with its admin flag
    pub async fn set_user(&self, user: &User) -> Result<()> {
        self.store
            .set(USER_KEY, serde_json::to_string(user)?)
            .await?;
        self.store
            .set(IS_ADMIN_KEY, user.has_admin_rights().to_string())
            .await
    }

    /// Cached user. An unreadable entry is treated as absent.
    pub async fn user(&self) -> Result<Option<User>> {
        self.read_json(USER_KEY).await
    }

    pub async fn is_admin_flag(&self) -> Result<bool> {
        Ok(self.store.get(IS_ADMIN_KEY).await?.as_deref() == Some("true"))
    }

    /// Remove the session together with its cart and wishlist mirrors
    pub async fn clear_session(&self) -> Result<()> {
        debug!("clearing stored session");
        self.store.remove(&self.token_key).await?;
        self.store.remove(USER_KEY).await?;
        self.store.remove(IS_ADMIN_KEY).await?;
        self.store.remove(CART_KEY).await?;
        self.store.remove(WISHLIST_KEY).await
    }

    /// Replace the cart mirror wholesale
    pub async fn mirror_cart(&self, cart: &Cart) -> Result<()> {
        self.write_json(CART_KEY, &Mirrored::new(cart)).await
    }

    pub async fn mirror_wishlist(&self, items: &[WishlistItem]) -> Result<()> {
        self.write_json(WISHLIST_KEY, &Mirrored::new(items)).await
    }

    /// Cart mirror, if younger than `ttl`
    pub async fn cart_mirror(&self, ttl: Duration) -> Result<Option<Cart>> {
        let mirrored: Option<Mirrored<Cart>> = self.read_json(CART_KEY).await?;
        Ok(mirrored.filter(|m| m.is_fresh(ttl)).map(|m| m.value))
    }

    pub async fn wishlist_mirror(&self, ttl: Duration) -> Result<Option<Vec<WishlistItem>>> {
        let mirrored: Option<Mirrored<Vec<WishlistItem>>> = self.read_json(WISHLIST_KEY).await?;
        Ok(mirrored.filter(|m| m.is_fresh(ttl)).map(|m| m.value))
    }

    /// Store an empty cart as the mirror
    pub async fn clear_cart_mirror(&self) -> Result<()> {
        self.mirror_cart(&Cart::default()).await
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.store.set(key, serde_json::to_string(value)?).await
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("ignoring unreadable '{}' entry in local store: {}", key, e);
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("token_key", &self.token_key)
            .finish_non_exhaustive()
    }
}

fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryStore;

    fn cache() -> (Arc<MemoryStore>, SessionCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = SessionCache::new(store.clone(), "token");
        (store, cache)
    }

    #[tokio::test]
    async fn test_token_is_normalized() {
        let (store, cache) = cache();
        store.set("token", "  Bearer abc.def  ".into()).await.unwrap();
        assert_eq!(cache.token().await.unwrap(), Some("abc.def".to_string()));

        store.set("token", "Bearer ".into()).await.unwrap();
        assert_eq!(cache.token().await.unwrap(), None);
        assert!(!cache.has_session().await);
    }

    #[tokio::test]
    async fn test_clear_session_drops_mirrors() {
        let (_store, cache) = cache();
        cache.set_token("abc").await.unwrap();
        cache
            .set_user(&User {
                role: Some("admin".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        cache.mirror_wishlist(&[WishlistItem::for_product("p1")]).await.unwrap();
        cache
            .mirror_cart(&Cart {
                total_items: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(cache.is_admin_flag().await.unwrap());

        cache.clear_session().await.unwrap();

        assert_eq!(cache.token().await.unwrap(), None);
        assert_eq!(cache.user().await.unwrap(), None);
        assert!(!cache.is_admin_flag().await.unwrap());
        assert_eq!(cache.wishlist_mirror(Duration::hours(1)).await.unwrap(), None);
        assert_eq!(cache.cart_mirror(Duration::hours(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stale_mirror_is_ignored() {
        let (store, cache) = cache();
        let stale = Mirrored {
            value: Cart {
                total_items: 3,
                ..Default::default()
            },
            stored_at: Utc::now() - Duration::hours(25),
        };
        store
            .set(CART_KEY, serde_json::to_string(&stale).unwrap())
            .await
            .unwrap();

        assert_eq!(cache.cart_mirror(Duration::hours(24)).await.unwrap(), None);
        assert!(cache.cart_mirror(Duration::hours(48)).await.unwrap().is_some());

        cache.clear_cart_mirror().await.unwrap();
        assert_eq!(
            cache.cart_mirror(Duration::hours(24)).await.unwrap(),
            Some(Cart::default())
        );
    }

    #[tokio::test]
    async fn test_corrupt_user_reads_as_absent() {
        let (store, cache) = cache();
        store.set(USER_KEY, "{not json".into()).await.unwrap();
        assert_eq!(cache.user().await.unwrap(), None);
    }
}
