//! Catalog endpoints

use crate::error::{ApiError, Result};
use crate::types::{
    Category, Color, ColorVariant, ImageRef, Inventory, NewReview, Product, ProductPage,
    ProductQuery, Review, SizeStock,
};
use crate::{require_id, segment, ApiClient};
use log::warn;
use reqwest::Method;

/// Categories offered by the storefront. The backend has no endpoint for
/// them.
pub const CATEGORIES: [&str; 4] = ["men", "women", "kids", "accessories"];

pub struct ProductsApi<'a> {
    api: &'a ApiClient,
}

impl<'a> ProductsApi<'a> {
    pub(crate) fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// `GET /products`
    pub async fn list(&self, query: &ProductQuery) -> Result<ProductPage> {
        let result = self.page("/products", query).await;
        self.or_mock(result, query, mock::catalog)
    }

    /// A single product. The id must be a 24 character hex object id.
    pub async fn get(&self, id: &str) -> Result<Product> {
        let id = require_id(id, "Product ID")?;
        if !is_object_id(id) {
            return Err(ApiError::invalid_input(format!(
                "Invalid product ID format: {}",
                id
            )));
        }
        self.api.get(&format!("/products/{}", id)).await
    }

    pub async fn by_category(&self, category: &str, query: &ProductQuery) -> Result<ProductPage> {
        let category = require_id(category, "Category")?;
        let result = self
            .page(&format!("/products/category/{}", segment(category)), query)
            .await;
        self.or_mock(result, query, |_| mock::for_category(category, 8))
    }

    /// Products carrying a banner tag such as `new-arrivals`
    pub async fn by_tag(&self, tag: &str, query: &ProductQuery) -> Result<ProductPage> {
        let tag = require_id(tag, "Tag")?;
        let result = self
            .page(&format!("/products/banner/{}", segment(tag)), query)
            .await;
        self.or_mock(result, query, |_| mock::for_tag(tag, 8))
    }

    pub async fn search(&self, query: &ProductQuery) -> Result<ProductPage> {
        self.page("/products/search", query).await
    }

    pub async fn related(&self, id: &str) -> Result<Vec<Product>> {
        let id = require_id(id, "Product ID")?;
        self.api
            .get(&format!("/products/related/{}", segment(id)))
            .await
    }

    pub async fn reviews(&self, id: &str) -> Result<Vec<Review>> {
        let id = require_id(id, "Product ID")?;
        self.api
            .get(&format!("/products/{}/reviews", segment(id)))
            .await
    }

    pub async fn add_review(&self, id: &str, review: &NewReview) -> Result<Review> {
        let id = require_id(id, "Product ID")?;
        if !(1..=5).contains(&review.rating) {
            return Err(ApiError::invalid_input("Rating must be between 1 and 5"));
        }
        self.api
            .send(
                Method::POST,
                &format!("/products/{}/reviews", segment(id)),
                Some(review),
            )
            .await
    }

    /// The fixed category list. No request is made.
    pub fn categories(&self) -> Vec<Category> {
        CATEGORIES
            .iter()
            .map(|slug| Category {
                id: slug.to_string(),
                name: capitalize(slug),
                slug: slug.to_string(),
            })
            .collect()
    }

    async fn page(&self, path: &str, query: &ProductQuery) -> Result<ProductPage> {
        let page: ProductPage = self
            .api
            .get_with_query(path, query.to_query_pairs())
            .await?;
        Ok(page.normalize(query))
    }

    fn or_mock<F>(
        &self,
        result: Result<ProductPage>,
        query: &ProductQuery,
        generate: F,
    ) -> Result<ProductPage>
    where
        F: FnOnce(&ProductQuery) -> Vec<Product>,
    {
        match result {
            Err(err) if self.api.options().enable_mock_data && !err.is_unauthorized() => {
                warn!("catalog unavailable ({}), serving generated products", err);
                let products = generate(query);
                let page = ProductPage {
                    products,
                    mock: true,
                    ..Default::default()
                };
                Ok(page.normalize(query))
            }
            other => other,
        }
    }
}

/// 24 hexadecimal characters
pub fn is_object_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Generated listings served when `enable_mock_data` is set
mod mock {
    use super::*;

    fn object_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..24].to_string()
    }

    fn variant(color: Color, sizes: &[(&str, bool)], image: String) -> ColorVariant {
        ColorVariant {
            color,
            sizes: sizes
                .iter()
                .map(|(name, in_stock)| SizeStock {
                    name: name.to_string(),
                    in_stock: *in_stock,
                    quantity: None,
                })
                .collect(),
            images: vec![ImageRef::Url(image)],
        }
    }

    pub(super) fn catalog(_query: &ProductQuery) -> Vec<Product> {
        [
            ("Premium Cotton T-Shirt", "High quality cotton t-shirt", 1299.0, "clothing", 50),
            ("Denim Jacket", "Classic denim jacket", 2499.0, "clothing", 35),
            ("Silk Scarf", "Elegant silk scarf", 1999.0, "accessories", 20),
        ]
        .iter()
        .map(|(name, description, price, category, stock)| Product {
            object_id: Some(object_id()),
            name: name.to_string(),
            description: Some(description.to_string()),
            price: Some(*price),
            image: Some(ImageRef::Url("https://via.placeholder.com/300x400".to_string())),
            category: Some(category.to_string()),
            stock: Some(*stock),
            ..Default::default()
        })
        .collect()
    }

    fn generated(id: String, name: String, category: &str, i: usize, image_hint: &str) -> Product {
        let price = 29.99 + i as f64 * 10.0;
        Product {
            object_id: Some(id),
            name,
            price: Some(price),
            sale_price: Some((price * 0.8 * 100.0).round() / 100.0),
            category: Some(category.to_string()),
            inventory: Some(Inventory {
                total: 50,
                reserved: 0,
            }),
            rating: Some(4.5),
            review_count: 10,
            color_variants: vec![
                variant(
                    Color::new("Black", "#000000"),
                    &[("S", true), ("M", true), ("L", true)],
                    format!("https://source.unsplash.com/random/400x500/?{},fashion,{}", image_hint, i),
                ),
                variant(
                    Color::new("Blue", "#0047c2"),
                    &[("S", true), ("M", true), ("L", false)],
                    format!("https://source.unsplash.com/random/400x500/?{},blue,{}", image_hint, i),
                ),
            ],
            is_featured: i <= 2,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub(super) fn for_category(category: &str, count: usize) -> Vec<Product> {
        let label = capitalize(category);
        (1..=count)
            .map(|i| {
                let mut product = generated(
                    format!("fallback-{}-{}", category, i),
                    format!("{} Product {}", label, i),
                    category,
                    i,
                    category,
                );
                product.description = Some(format!(
                    "This is a fallback product for the {} category.",
                    label
                ));
                product
            })
            .collect()
    }

    pub(super) fn for_tag(tag: &str, count: usize) -> Vec<Product> {
        let label = capitalize(tag);
        (1..=count)
            .map(|i| {
                let category = CATEGORIES[i % CATEGORIES.len()];
                let mut product = generated(
                    format!("fallback-tag-{}-{}", tag, i),
                    format!("{} {} Item {}", label, capitalize(category), i),
                    category,
                    i,
                    tag,
                );
                product.description = Some(format!("This is a product tagged with \"{}\".", label));
                product.tags = vec![tag.to_string(), category.to_string()];
                product
            })
            .collect()
    }
}
