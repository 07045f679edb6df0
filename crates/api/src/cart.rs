//! Server-side cart

use crate::error::Result;
use crate::events::{ClearSource, ClientEvent};
use crate::fallback::{Candidate, FallbackSequence};
use crate::types::{Cart, NewCartItem};
use crate::{require_id, segment, ApiClient};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use reqwest::Method;
use serde_json::{json, Value};

/// What [`CartApi::clear`] managed to do
#[derive(Debug, Clone, PartialEq)]
pub struct ClearCartOutcome {
    pub source: ClearSource,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

pub struct CartApi<'a> {
    api: &'a ApiClient,
}

impl<'a> CartApi<'a> {
    pub(crate) fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn get(&self) -> Result<Cart> {
        self.api.get("/users/cart").await
    }

    pub async fn add(&self, item: &NewCartItem) -> Result<Cart> {
        require_id(&item.product_id, "Product ID")?;
        self.api
            .send(Method::POST, "/users/cart", Some(item))
            .await
    }

    pub async fn update_item(&self, product_id: &str, quantity: u32) -> Result<Cart> {
        let product_id = require_id(product_id, "Product ID")?;
        self.api
            .send(
                Method::PUT,
                &format!("/users/cart/{}", segment(product_id)),
                Some(&json!({ "quantity": quantity })),
            )
            .await
    }

    pub async fn remove(&self, product_id: &str) -> Result<Cart> {
        let product_id = require_id(product_id, "Product ID")?;
        self.api
            .send::<_, ()>(
                Method::DELETE,
                &format!("/users/cart/{}", segment(product_id)),
                None,
            )
            .await
    }

    /// Empty the cart. This never fails.
    ///
    /// The known clearing endpoints are tried in order, moving on only when
    /// a route is missing. If the sequence stops without a success the local
    /// cart mirror is emptied instead. Subscribers receive
    /// [`ClientEvent::CartCleared`] whatever the outcome.
    pub async fn clear(&self) -> ClearCartOutcome {
        let sequence = FallbackSequence::new(
            "clear_cart",
            vec![
                Candidate::delete("/users/cart"),
                Candidate::delete("/cart"),
                Candidate::delete("/users/profile/cart"),
                Candidate::put("/users/cart"),
            ],
        );

        let api = self.api;
        let empty = json!({ "items": [] });
        let result = sequence
            .run(|candidate| {
                let candidate = candidate.clone();
                let body = (candidate.method == Method::PUT).then_some(&empty);
                async move { api.call::<Value, _>(&candidate, body).await }
            })
            .await;

        let source = match result {
            Ok(attempted) => {
                info!("cart cleared via {}", sequence.candidates()[attempted.index]);
                if let Err(e) = api.session().clear_cart_mirror().await {
                    warn!("cart cleared remotely but local mirror kept: {}", e);
                }
                ClearSource::Remote
            }
            Err(err) => {
                warn!("remote cart clearing failed: {}", err);
                match api.session().clear_cart_mirror().await {
                    Ok(()) => ClearSource::StorageFallback,
                    Err(e) => {
                        error!("could not clear cart from local storage: {}", e);
                        ClearSource::BestEffort
                    }
                }
            }
        };

        let timestamp = Utc::now();
        api.emit(ClientEvent::CartCleared { source, timestamp });

        ClearCartOutcome {
            source,
            message: source.message().to_string(),
            timestamp,
        }
    }
}
