//! Checkout and order types

use super::cart::{ColorSelection, SizeSelection};
use super::product::Color;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Card,
    Bkash,
    Nagad,
}

impl PaymentMethod {
    /// bKash and Nagad need a payment number and transaction id
    pub fn is_mobile(&self) -> bool {
        matches!(self, PaymentMethod::Bkash | PaymentMethod::Nagad)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// Checkout line as collected from the cart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutItem {
    pub product_id: Option<String>,
    pub color: Option<Color>,
    pub size: Option<String>,
    /// Sizes offered by the product, used when no size was picked
    pub available_sizes: Vec<String>,
    pub quantity: Option<u32>,
}

/// Order being placed
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub items: Vec<CheckoutItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_details: Option<PaymentDetails>,
}

/// Order line in the shape `POST /orders` expects
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: String,
    pub color_variant: ColorSelection,
    pub size: SizeSelection,
}

impl OrderLine {
    pub const DEFAULT_SIZE: &'static str = "M";

    /// Normalize a checkout line. `None` when the product id is missing.
    pub fn from_checkout(item: &CheckoutItem) -> Option<Self> {
        let product = item
            .product_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())?
            .to_string();

        let size = item
            .size
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| item.available_sizes.first().map(String::as_str))
            .unwrap_or(Self::DEFAULT_SIZE)
            .to_string();

        Some(Self {
            product,
            color_variant: ColorSelection {
                color: item.color.clone().unwrap_or_default(),
            },
            size: SizeSelection {
                name: size,
                quantity: item.quantity.filter(|q| *q > 0).unwrap_or(1),
            },
        })
    }
}

/// Body of `POST /orders`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub items: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().or(self.object_id.as_deref())
    }
}
