//! Checkout and order history

use crate::error::{ApiError, Result};
use crate::types::{Checkout, Order, OrderLine, OrderRequest, PaymentDetails};
use crate::{require_id, segment, ApiClient};
use log::warn;
use reqwest::Method;

pub struct OrdersApi<'a> {
    api: &'a ApiClient,
}

impl<'a> OrdersApi<'a> {
    pub(crate) fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Place an order
    pub async fn create(&self, checkout: &Checkout) -> Result<Order> {
        let request = build_order_request(checkout)?;
        self.api
            .send(Method::POST, "/orders", Some(&request))
            .await
    }

    /// Orders of the logged-in user. Failures other than an expired session
    /// read as no orders.
    pub async fn mine(&self) -> Result<Vec<Order>> {
        match self.api.get("/orders").await {
            Err(err) if !err.is_unauthorized() => {
                warn!("could not load orders, showing none: {}", err);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Order> {
        let id = require_id(id, "Order ID")?;
        self.api.get(&format!("/orders/{}", segment(id))).await
    }
}

/// Normalize checkout lines into the body of `POST /orders`
pub fn build_order_request(checkout: &Checkout) -> Result<OrderRequest> {
    if checkout.items.is_empty() {
        return Err(ApiError::invalid_input("Order has no items"));
    }

    let items = checkout
        .items
        .iter()
        .map(OrderLine::from_checkout)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ApiError::invalid_input("Some items are missing product information"))?;

    // payment number and transaction id only apply to bKash/Nagad
    let payment_details = if checkout.payment_method.is_mobile() {
        checkout.payment_details.clone().unwrap_or_default()
    } else {
        PaymentDetails::default()
    };

    Ok(OrderRequest {
        items,
        shipping_address: checkout.shipping_address.clone(),
        payment_method: checkout.payment_method,
        payment_details,
    })
}
