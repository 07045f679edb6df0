//! OpDrape AI shopping assistant client
//!
//! Talks to the assistant endpoints under `{api}/ai` using the session token
//! stored by [`opdrape_api::ApiClient`]. Unlike the main API client, a 401
//! here leaves the session alone: the assistant just reports that a login is
//! required.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use opdrape_api::{ApiClient, ImageRef, SessionCache};
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Longest message the assistant accepts, in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Messages of context sent with each chat request
pub const HISTORY_LIMIT: usize = 10;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("{0}")]
    InvalidMessage(String),

    /// The service answered with an error status
    #[error("{message}")]
    Service { status: u16, message: String },

    /// The service answered `success: false`
    #[error("{0}")]
    Rejected(String),

    #[error("Unable to connect to AI service. Please check your internet connection.")]
    Connection(#[source] reqwest::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session error: {0}")]
    Session(#[from] opdrape_api::ApiError),
}

pub type Result<T> = std::result::Result<T, AssistantError>;

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
    System,
}

/// A message as shown in the chat window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self {
            sender: Sender::User,
            text: text.to_string(),
        }
    }

    pub fn ai(text: &str) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the context sent with a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Keep the last [`HISTORY_LIMIT`] user and assistant messages, in the
/// shape the chat endpoint expects
pub fn format_history(messages: &[ChatMessage]) -> Vec<HistoryEntry> {
    let entries: Vec<HistoryEntry> = messages
        .iter()
        .filter_map(|message| {
            let role = match message.sender {
                Sender::User => Role::User,
                Sender::Ai => Role::Assistant,
                Sender::System => return None,
            };
            Some(HistoryEntry {
                role,
                content: message.text.clone(),
            })
        })
        .collect();

    let skip = entries.len().saturating_sub(HISTORY_LIMIT);
    entries.into_iter().skip(skip).collect()
}

/// Product as presented inside a chat reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: Option<u32>,
    #[serde(default)]
    pub primary_image: Option<ImageRef>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductCard {
    pub fn image_url(&self) -> Option<&str> {
        self.primary_image
            .as_ref()
            .or_else(|| self.images.first())
            .map(ImageRef::url)
    }

    /// Sale price when set, else the list price
    pub fn display_price(&self) -> Option<f64> {
        self.sale_price.filter(|p| *p > 0.0).or(self.price)
    }

    pub fn has_discount(&self) -> bool {
        matches!((self.sale_price, self.price), (Some(sale), Some(price)) if sale > 0.0 && sale < price)
    }
}

/// Assistant answer. Product cards may arrive as `products`, `cards` or
/// both; they are merged in that order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawChatReply")]
pub struct ChatReply {
    pub message: String,
    pub timestamp: Option<String>,
    pub conversation_id: Option<String>,
    pub data_used: Option<Value>,
    pub products: Vec<ProductCard>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChatReply {
    message: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    data_used: Option<Value>,
    #[serde(default)]
    products: Vec<ProductCard>,
    #[serde(default)]
    cards: Vec<ProductCard>,
}

impl From<RawChatReply> for ChatReply {
    fn from(raw: RawChatReply) -> Self {
        Self {
            message: raw.message,
            timestamp: raw.timestamp,
            conversation_id: raw.conversation_id,
            data_used: raw.data_used,
            products: merge_cards(raw.products, raw.cards),
        }
    }
}

fn merge_cards(mut products: Vec<ProductCard>, cards: Vec<ProductCard>) -> Vec<ProductCard> {
    products.extend(cards);
    products
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicData {
    #[serde(default)]
    pub categories_available: u32,
    #[serde(default)]
    pub best_sellers_available: u32,
    #[serde(default)]
    pub new_arrivals_available: u32,
    #[serde(default)]
    pub user_has_orders: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    pub suggestions: Vec<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub dynamic_data: DynamicData,
}

impl Suggestions {
    const FALLBACK: [&'static str; 6] = [
        "What are your best-selling products?",
        "Show me new arrivals",
        "What categories do you have?",
        "How can I track my order?",
        "What is your return policy?",
        "Do you offer international shipping?",
    ];

    /// Offered when the service cannot be reached
    pub fn fallback() -> Self {
        Self {
            suggestions: Self::FALLBACK.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc::now(),
            dynamic_data: DynamicData::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub api_key_configured: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl Health {
    pub fn unavailable(error: &AssistantError) -> Self {
        Self {
            status: "AI service is not available".to_string(),
            timestamp: Utc::now(),
            api_key_configured: false,
            error: Some(error.to_string()),
        }
    }
}

/// Filters for [`AssistantClient::search_products`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSearch {
    pub query: String,
    pub category: String,
    pub sub_category: String,
    pub limit: u32,
}

impl Default for ProductSearch {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: String::new(),
            sub_category: String::new(),
            limit: 6,
        }
    }
}

impl ProductSearch {
    fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.query.is_empty() {
            pairs.push(("q", self.query.clone()));
        }
        if !self.category.is_empty() {
            pairs.push(("category", self.category.clone()));
        }
        if !self.sub_category.is_empty() {
            pairs.push(("subCategory", self.sub_category.clone()));
        }
        if self.limit > 0 {
            pairs.push(("limit", self.limit.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawProductResults")]
pub struct ProductResults {
    pub count: usize,
    pub products: Vec<ProductCard>,
}

#[derive(Deserialize)]
struct RawProductResults {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    products: Vec<ProductCard>,
    #[serde(default)]
    cards: Vec<ProductCard>,
}

impl From<RawProductResults> for ProductResults {
    fn from(raw: RawProductResults) -> Self {
        Self {
            count: raw.count,
            products: merge_cards(raw.products, raw.cards),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

pub fn welcome_message() -> &'static str {
    "Welcome to OpDrape! I'm your AI assistant, here to help you with product questions, orders, and any other inquiries. How can I assist you today?"
}

/// Quick actions offered while the assistant is unavailable
pub fn fallback_quick_actions() -> Vec<&'static str> {
    vec![
        "What are your best-selling products?",
        "Show me new arrivals",
        "Help with sizing",
        "Track my order",
        "Return policy",
        "Contact support",
    ]
}

/// Client for the assistant endpoints
#[derive(Clone)]
pub struct AssistantClient {
    base_url: String,
    http_client: Client,
    session: SessionCache,
    timeout: Duration,
}

impl AssistantClient {
    /// Create a client for the assistant under `api_url`
    pub fn new(api_url: &str, http_client: Client, session: SessionCache) -> Result<Self> {
        Url::parse(api_url)?;
        Ok(Self {
            base_url: format!("{}/ai", api_url.trim_end_matches('/')),
            http_client,
            session,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Share the HTTP client and session storage of `api`
    pub fn from_api(api: &ApiClient) -> Result<Self> {
        let client = Self::new(api.base_url(), api.http_client().clone(), api.session().clone())?;
        Ok(client.with_timeout(api.options().request_timeout))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a chat message with its conversation context
    pub async fn send_message(&self, message: &str, history: &[HistoryEntry]) -> Result<ChatReply> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(AssistantError::InvalidMessage(
                "Message is required and cannot be empty".to_string(),
            ));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AssistantError::InvalidMessage(format!(
                "Message is too long. Please keep it under {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let body = json!({
            "message": trimmed,
            "conversationHistory": history,
        });
        let request = self.request(Method::POST, "/chat").await?.json(&body);

        self.fetch(request, "Failed to get AI response")
            .await
            .map_err(chat_error)
    }

    /// Suggested questions. Falls back to a fixed list on any failure.
    pub async fn suggestions(&self) -> Suggestions {
        let result: Result<Suggestions> = match self.request(Method::GET, "/suggestions").await {
            Ok(request) => self.fetch(request, "Failed to get suggestions").await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!("assistant suggestions unavailable: {}", e);
            Suggestions::fallback()
        })
    }

    /// Service health. Never fails; an unreachable service is reported in
    /// the returned status.
    pub async fn health(&self) -> Health {
        let result: Result<Health> = match self.request(Method::GET, "/health").await {
            Ok(request) => self.fetch(request, "AI service health check failed").await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!("assistant health check failed: {}", e);
            Health::unavailable(&e)
        })
    }

    pub async fn search_products(&self, search: &ProductSearch) -> Result<ProductResults> {
        let request = self
            .request(Method::GET, "/products/search")
            .await?
            .query(&search.to_query_pairs());
        self.fetch(request, "Failed to search products").await
    }

    pub async fn product(&self, id: &str) -> Result<ProductCard> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AssistantError::InvalidMessage("Product ID is required".to_string()));
        }
        let path = format!("/products/{}", id);
        let request = self.request(Method::GET, &path).await?;
        self.fetch(request, "Failed to get product").await
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http_client
            .request(method, &url)
            .header("Accept", "application/json")
            .timeout(self.timeout);

        if let Some(token) = self.session.token().await? {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    /// Send `request` and unwrap the `{ success, data, message }` envelope
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                AssistantError::Connection(e)
            } else {
                AssistantError::Request(e)
            }
        })?;

        let status = response.status();
        let text = response.text().await?;
        debug!("assistant responded {}", status);

        if !status.is_success() {
            return Err(AssistantError::Service {
                status: status.as_u16(),
                message: backend_message(&text).unwrap_or_else(|| fallback.to_string()),
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)?;
        match envelope {
            Envelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope { message, .. } => Err(AssistantError::Rejected(
                message.unwrap_or_else(|| fallback.to_string()),
            )),
        }
    }
}

impl std::fmt::Debug for AssistantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn backend_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}

/// User-facing wording of chat failures
fn chat_error(err: AssistantError) -> AssistantError {
    let (status, message) = match err {
        AssistantError::Service { status, message } => (status, message),
        other => return other,
    };
    let message = match status {
        400 if message == "Failed to get AI response" => "Invalid request".to_string(),
        400 => message,
        401 => {
            "Authentication required. Please log in to use the chat feature.".to_string()
        }
        429 => {
            "AI service is temporarily unavailable due to high usage. Please try again later."
                .to_string()
        }
        500 => "Failed to process your message. Please try again.".to_string(),
        _ => message,
    };
    AssistantError::Service { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_history_keeps_last_ten() {
        let mut messages = vec![ChatMessage {
            sender: Sender::System,
            text: "connected".into(),
        }];
        for i in 0..12 {
            messages.push(ChatMessage::user(&format!("question {}", i)));
            messages.push(ChatMessage::ai(&format!("answer {}", i)));
        }

        let history = format_history(&messages);
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].content, "question 7");
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[9].content, "answer 11");
        assert_eq!(history[9].role, Role::Assistant);
    }

    #[test]
    fn test_format_history_serializes_roles() {
        let history = format_history(&[ChatMessage::ai("hi")]);
        assert_eq!(
            serde_json::to_value(&history).unwrap(),
            json!([{ "role": "assistant", "content": "hi" }])
        );
    }

    #[test]
    fn test_chat_error_wording() {
        let err = chat_error(AssistantError::Service {
            status: 429,
            message: "slow down".into(),
        });
        assert_eq!(
            err.to_string(),
            "AI service is temporarily unavailable due to high usage. Please try again later."
        );

        let err = chat_error(AssistantError::Service {
            status: 400,
            message: "Message contains blocked content".into(),
        });
        assert_eq!(err.to_string(), "Message contains blocked content");
    }

    #[test]
    fn test_product_card_price() {
        let card: ProductCard = serde_json::from_value(json!({
            "id": "p1",
            "name": "Fatua",
            "price": 30.0,
            "salePrice": 24.0,
            "primaryImage": { "url": "https://cdn.test/fatua.jpg" }
        }))
        .unwrap();
        assert_eq!(card.display_price(), Some(24.0));
        assert!(card.has_discount());
        assert_eq!(card.image_url(), Some("https://cdn.test/fatua.jpg"));
    }

    #[test]
    fn test_reply_merges_products_and_cards() {
        let reply: ChatReply = serde_json::from_value(json!({
            "message": "Two picks for you",
            "products": [{ "id": "p1", "name": "Fatua" }],
            "cards": [{ "id": "p2", "name": "Kurta" }]
        }))
        .unwrap();
        let names: Vec<_> = reply.products.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Fatua", "Kurta"]);

        let reply: ChatReply =
            serde_json::from_value(json!({ "message": "hi", "cards": [{ "name": "Kurta" }] }))
                .unwrap();
        assert_eq!(reply.products.len(), 1);
        assert_eq!(reply.conversation_id, None);
    }

    #[test]
    fn test_product_results_merges_products_and_cards() {
        let results: ProductResults = serde_json::from_value(json!({
            "count": 2,
            "products": [{ "name": "Fatua" }],
            "cards": [{ "name": "Kurta" }]
        }))
        .unwrap();
        assert_eq!(results.count, 2);
        assert_eq!(results.products.len(), 2);
    }
}
