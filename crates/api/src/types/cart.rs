//! Cart and wishlist snapshots

use super::product::{Color, Product};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A product reference that is either a bare id or a populated product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(String),
    Product(Box<Product>),
}

impl ProductRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            ProductRef::Id(id) => Some(id.as_str()),
            ProductRef::Product(product) => product.id(),
        }
    }

    pub fn product(&self) -> Option<&Product> {
        match self {
            ProductRef::Product(product) => Some(product),
            ProductRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSelection {
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeSelection {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_variant: Option<ColorSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl CartItem {
    pub fn product_id(&self) -> Option<&str> {
        self.product.as_ref().and_then(ProductRef::id)
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
            .or_else(|| self.size.as_ref().map(|s| s.quantity))
            .unwrap_or(1)
    }
}

/// Server-side cart as returned by `GET /users/cart`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_items: u32,
    #[serde(default)]
    pub total_price: f64,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Item added with `POST /users/cart`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub product_id: String,
    pub color_variant: ColorSelection,
    pub size: SizeSelection,
}

impl NewCartItem {
    pub fn new(product_id: &str, color: Color, size: &str, quantity: u32) -> Self {
        Self {
            product_id: product_id.to_string(),
            color_variant: ColorSelection { color },
            size: SizeSelection {
                name: size.to_string(),
                quantity: quantity.max(1),
            },
        }
    }
}

/// Entry of the wishlist. Depending on how the backend populated it, the
/// product id sits in a different field; [`WishlistItem::product_id`]
/// resolves it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WishlistItem {
    /// Referenced product id: `id`, `_id`, `productId`, then the nested
    /// product
    pub fn product_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.object_id.as_deref())
            .or(self.product_id.as_deref())
            .or_else(|| self.product.as_ref().and_then(ProductRef::id))
            .filter(|id| !id.is_empty())
    }

    pub fn for_product(product_id: &str) -> Self {
        Self {
            id: Some(product_id.to_string()),
            ..Default::default()
        }
    }
}

/// Whether `items` contains `product_id`
pub fn wishlist_contains(items: &[WishlistItem], product_id: &str) -> bool {
    items
        .iter()
        .any(|item| item.product_id() == Some(product_id))
}

/// Standard `{ success, data, message }` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WishlistData {
    #[serde(default)]
    pub wishlist: Vec<WishlistItem>,
    #[serde(default)]
    pub count: usize,
}
