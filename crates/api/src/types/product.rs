//! Catalog types

use serde::{Deserialize, Serialize};

/// Image reference. The backend sends either a bare URL or an object
/// carrying one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object {
        url: String,
        #[serde(rename = "publicId", default, skip_serializing_if = "Option::is_none")]
        public_id: Option<String>,
    },
}

impl ImageRef {
    pub fn url(&self) -> &str {
        match self {
            ImageRef::Url(url) => url,
            ImageRef::Object { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub name: String,
    #[serde(default)]
    pub hex_code: String,
}

impl Color {
    pub fn new(name: &str, hex_code: &str) -> Self {
        Self {
            name: name.to_string(),
            hex_code: hex_code.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeStock {
    pub name: String,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// One colour of a product with its sizes and pictures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorVariant {
    pub color: Color,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub reserved: i64,
}

impl Inventory {
    pub fn available(&self) -> i64 {
        self.total - self.reserved
    }
}

/// Product as returned by the catalog endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    /// Percentage off the list price
    #[serde(default)]
    pub discount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub color_variants: Vec<ColorVariant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Inventory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub out_of_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Product {
    /// `id`, falling back to `_id`
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().or(self.object_id.as_deref())
    }

    /// First available picture: `image`, then `images`, then the first
    /// colour variant's pictures
    pub fn primary_image(&self) -> Option<&str> {
        self.image
            .as_ref()
            .or_else(|| self.images.first())
            .or_else(|| {
                self.color_variants
                    .iter()
                    .find_map(|variant| variant.images.first())
            })
            .map(ImageRef::url)
    }

    /// Price before any reduction
    pub fn list_price(&self) -> f64 {
        self.price.or(self.base_price).unwrap_or(0.0)
    }

    /// Price the customer pays. A percentage discount wins over a sale
    /// price; a sale price only counts when it is below the list price.
    pub fn effective_price(&self) -> f64 {
        let list = self.list_price();
        if self.discount > 0.0 {
            return round_cents(list * (1.0 - self.discount / 100.0));
        }
        match self.sale_price {
            Some(sale) if sale > 0.0 && sale < list => sale,
            _ => list,
        }
    }

    pub fn has_discount(&self) -> bool {
        self.effective_price() < self.list_price()
    }

    pub fn in_stock(&self) -> bool {
        if self.out_of_stock {
            return false;
        }
        if let Some(stock) = self.stock {
            return stock > 0;
        }
        if let Some(inventory) = &self.inventory {
            return inventory.available() > 0;
        }
        if !self.color_variants.is_empty() {
            return self
                .color_variants
                .iter()
                .flat_map(|variant| variant.sizes.iter())
                .any(|size| size.in_stock);
        }
        true
    }

    /// Size names across every colour variant, first occurrence order
    pub fn size_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for size in self.color_variants.iter().flat_map(|v| v.sizes.iter()) {
            if !names.contains(&size.name) {
                names.push(size.name.clone());
            }
        }
        names
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One page of a product listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total_pages: u32,
    /// Set when the page was generated locally instead of fetched
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mock: bool,
}

impl ProductPage {
    pub const DEFAULT_LIMIT: u32 = 12;

    /// Fill in paging fields the backend left out, using the query that
    /// produced this page
    pub fn normalize(mut self, query: &ProductQuery) -> Self {
        if self.total == 0 {
            self.total = self.products.len() as u64;
        }
        if self.page == 0 {
            self.page = query.page.unwrap_or(1).max(1);
        }
        if self.limit == 0 {
            self.limit = query.limit.unwrap_or(Self::DEFAULT_LIMIT).max(1);
        }
        self.total_pages = total_pages(self.total, self.limit);
        self
    }
}

/// `ceil(total / limit)`
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    ((total + limit as u64 - 1) / limit as u64) as u32
}

/// Listing filters, sent as query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }

    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("sort".to_string(), sort.to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("category".to_string(), category.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("q".to_string(), search.to_string()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice".to_string(), min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice".to_string(), max.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
}

/// Customer review of a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Review {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().or(self.object_id.as_deref())
    }
}

/// New review submitted by a customer
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub comment: String,
}

/// Mean rating rounded to one decimal; `None` without reviews
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: f64 = reviews.iter().map(|r| r.rating).sum();
    Some((sum / reviews.len() as f64 * 10.0).round() / 10.0)
}
