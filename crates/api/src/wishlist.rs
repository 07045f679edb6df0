//! Wishlist endpoints

use crate::error::{ApiError, Result};
use crate::types::{Envelope, WishlistData, WishlistItem};
use crate::{require_id, segment, ApiClient};
use reqwest::Method;
use serde_json::Value;

pub struct WishlistApi<'a> {
    api: &'a ApiClient,
}

impl<'a> WishlistApi<'a> {
    pub(crate) fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// `GET /users/wishlist`, answered as
    /// `{ "success": true, "data": { "wishlist": [...], "count": n } }`
    pub async fn get(&self) -> Result<Vec<WishlistItem>> {
        let envelope: Envelope<WishlistData> = self.api.get("/users/wishlist").await?;
        if !envelope.success {
            return Err(ApiError::Api {
                status: 200,
                message: envelope
                    .message
                    .unwrap_or_else(|| "Failed to load wishlist".to_string()),
            });
        }
        Ok(envelope.data.wishlist)
    }

    pub async fn add(&self, product_id: &str) -> Result<Value> {
        let product_id = require_id(product_id, "Product ID")?;
        self.api
            .send::<_, ()>(
                Method::POST,
                &format!("/users/wishlist/{}", segment(product_id)),
                None,
            )
            .await
    }

    pub async fn remove(&self, product_id: &str) -> Result<Value> {
        let product_id = require_id(product_id, "Product ID")?;
        self.api
            .send::<_, ()>(
                Method::DELETE,
                &format!("/users/wishlist/{}", segment(product_id)),
                None,
            )
            .await
    }
}
