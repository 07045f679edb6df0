//! Admin panel endpoints: catalog, orders, users and review moderation

use crate::error::Result;
use crate::fallback::{any_but_unauthorized, Candidate, FallbackSequence};
use crate::types::{Order, Product, ProductPage, ProductQuery, Review, User};
use crate::{require_id, segment, ApiClient};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};

/// Paging and filtering for admin listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("status".to_string(), status.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.to_string()));
        }
        pairs
    }
}

/// Moderation changes to a review
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_response: Option<String>,
}

/// Review moderation is recorded by the backend as an activity on a
/// product entity
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductActivity<'a, T: Serialize> {
    #[serde(flatten)]
    data: &'a T,
    entity_type: &'static str,
}

const ENTITY_TYPE: &str = "product";

pub struct AdminApi<'a> {
    api: &'a ApiClient,
}

impl<'a> AdminApi<'a> {
    pub(crate) fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Admin catalog view, falling back to the public listing
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let sequence = FallbackSequence::new(
            "admin_products",
            vec![Candidate::get("/admin/products"), Candidate::get("/products")],
        )
        .advance_on(any_but_unauthorized);

        let page: ProductPage = self.list(&sequence, query.to_query_pairs()).await?;
        Ok(page.normalize(query))
    }

    pub async fn create_product<B: Serialize + ?Sized>(&self, product: &B) -> Result<Product> {
        self.api
            .send(Method::POST, "/products", Some(product))
            .await
    }

    pub async fn update_product<B: Serialize + ?Sized>(
        &self,
        id: &str,
        product: &B,
    ) -> Result<Product> {
        let id = require_id(id, "Product ID")?;
        self.api
            .send(Method::PATCH, &format!("/products/{}", segment(id)), Some(product))
            .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<Value> {
        let id = require_id(id, "Product ID")?;
        self.api
            .send::<_, ()>(Method::DELETE, &format!("/products/{}", segment(id)), None)
            .await
    }

    /// All orders, falling back to the caller's own orders
    pub async fn orders(&self, query: &ListQuery) -> Result<Vec<Order>> {
        let sequence = FallbackSequence::new(
            "admin_orders",
            vec![Candidate::get("/admin/orders"), Candidate::get("/orders")],
        )
        .advance_on(any_but_unauthorized);

        self.list(&sequence, query.to_query_pairs()).await
    }

    pub async fn order(&self, id: &str) -> Result<Order> {
        let id = segment(require_id(id, "Order ID")?);
        let sequence = FallbackSequence::new(
            "admin_order",
            vec![
                Candidate::get(format!("/admin/orders/{}", id)),
                Candidate::get(format!("/orders/{}", id)),
            ],
        )
        .advance_on(any_but_unauthorized);

        self.list(&sequence, Vec::new()).await
    }

    pub async fn update_order_status(&self, id: &str, status: &str) -> Result<Order> {
        let id = segment(require_id(id, "Order ID")?);
        let sequence = FallbackSequence::new(
            "update_order_status",
            vec![
                Candidate::patch(format!("/admin/orders/{}/status", id)),
                Candidate::patch(format!("/api/admin/orders/{}/status", id)),
            ],
        )
        .advance_on(any_but_unauthorized);

        let api = self.api;
        let body = json!({ "status": status });
        let attempted = sequence
            .run(|candidate| {
                let candidate = candidate.clone();
                let body = &body;
                async move { api.call::<Order, _>(&candidate, Some(body)).await }
            })
            .await?;
        Ok(attempted.value)
    }

    pub async fn users(&self, query: &ListQuery) -> Result<Vec<User>> {
        self.api
            .get_with_query("/admin/users", query.to_query_pairs())
            .await
    }

    pub async fn user(&self, id: &str) -> Result<User> {
        let id = require_id(id, "User ID")?;
        self.api
            .get(&format!("/admin/users/{}", segment(id)))
            .await
    }

    /// Update a user with `PATCH`, or `PUT` where `PATCH` is not routed
    pub async fn update_user<B: Serialize + ?Sized>(&self, id: &str, data: &B) -> Result<User> {
        let path = format!("/admin/users/{}", segment(require_id(id, "User ID")?));
        let sequence = FallbackSequence::new(
            "update_user",
            vec![Candidate::patch(path.clone()), Candidate::put(path)],
        );

        let api = self.api;
        let attempted = sequence
            .run(|candidate| {
                let candidate = candidate.clone();
                async move { api.call::<User, _>(&candidate, Some(data)).await }
            })
            .await?;
        Ok(attempted.value)
    }

    pub async fn delete_user(&self, id: &str) -> Result<Value> {
        let id = require_id(id, "User ID")?;
        self.api
            .send::<_, ()>(Method::DELETE, &format!("/admin/users/{}", segment(id)), None)
            .await
    }

    pub async fn user_orders(&self, id: &str) -> Result<Vec<Order>> {
        let id = require_id(id, "User ID")?;
        self.api
            .get(&format!("/admin/users/{}/orders", segment(id)))
            .await
    }

    /// Reviews awaiting or past moderation
    pub async fn reviews(&self, query: &ListQuery) -> Result<Value> {
        self.api
            .get_with_query("/admin/reviews", query.to_query_pairs())
            .await
    }

    pub async fn review(&self, product_id: &str, review_id: &str) -> Result<Review> {
        self.api.get(&review_path(product_id, review_id)?).await
    }

    pub async fn update_review(
        &self,
        product_id: &str,
        review_id: &str,
        update: &ReviewUpdate,
    ) -> Result<Value> {
        let body = ProductActivity {
            data: update,
            entity_type: ENTITY_TYPE,
        };
        self.api
            .send(Method::PATCH, &review_path(product_id, review_id)?, Some(&body))
            .await
    }

    pub async fn delete_review(&self, product_id: &str, review_id: &str) -> Result<Value> {
        let builder = self
            .api
            .request(Method::DELETE, &review_path(product_id, review_id)?)
            .await?
            .query_pair("entityType", ENTITY_TYPE);
        self.api.execute(builder).await
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        sequence: &FallbackSequence,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let api = self.api;
        let query = &query;
        let attempted = sequence
            .run(|candidate| {
                let candidate = candidate.clone();
                async move {
                    let builder = api
                        .request(candidate.method.clone(), &candidate.path)
                        .await?
                        .query(query.clone());
                    api.execute::<T>(builder).await
                }
            })
            .await?;
        Ok(attempted.value)
    }
}

fn review_path(product_id: &str, review_id: &str) -> Result<String> {
    Ok(format!(
        "/admin/products/{}/reviews/{}",
        segment(require_id(product_id, "Product ID")?),
        segment(require_id(review_id, "Review ID")?)
    ))
}
