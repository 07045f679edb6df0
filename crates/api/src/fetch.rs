//! HTTP request builder shared by every endpoint group

use crate::error::{ApiError, Result};
use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    multipart::Form,
    Client, Method, RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

enum Body {
    Json(Vec<u8>),
    Multipart(Form),
}

/// Helper for building and executing a single HTTP request
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: String,
    method: Method,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    body: Option<Body>,
    timeout: Option<Duration>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, url: &str, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        Self {
            client,
            url: url.to_string(),
            method,
            headers,
            query_params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Add a header to the request. Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add bearer token authentication to the request
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {}", token))
    }

    /// Append a query parameter
    pub fn query_pair(mut self, key: &str, value: &str) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    /// Append several query parameters
    pub fn query(mut self, params: Vec<(String, String)>) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body)?;
        self.body = Some(Body::Json(json));
        Ok(self)
    }

    /// Add a multipart form body to the request
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = Some(Body::Multipart(form));
        self
    }

    /// Per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build(self) -> Result<RequestBuilder> {
        let mut url = Url::parse(&self.url)?;

        if !self.query_params.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                query_pairs.append_pair(key, value);
            }
        }

        let mut req = self.client.request(self.method, url.as_str());
        req = req.headers(self.headers);

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        match self.body {
            Some(Body::Json(bytes)) => {
                req = req.header("Content-Type", "application/json").body(bytes);
            }
            Some(Body::Multipart(form)) => {
                req = req.multipart(form);
            }
            None => {}
        }

        Ok(req)
    }

    /// Execute the request and return the raw response. Non-success statuses
    /// are turned into [`ApiError`]s.
    pub async fn send(self) -> Result<reqwest::Response> {
        debug!("{} {}", self.method, self.url);
        let response = self.build()?.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            debug!("request failed with status {}: {}", status, text);
            return Err(ApiError::from_response(status, &text));
        }

        Ok(response)
    }

    /// Execute the request and decode the response body as `T`
    pub async fn execute<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.send().await?;
        let text = response.text().await?;
        decode_body(&text)
    }

    /// Execute the request and discard the response body
    pub async fn execute_unit(self) -> Result<()> {
        self.send().await?;
        Ok(())
    }
}

/// Shorthand constructors for [`FetchBuilder`]
pub struct Fetch;

impl Fetch {
    pub fn get<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::GET)
    }

    pub fn post<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::POST)
    }

    pub fn put<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::PUT)
    }

    pub fn patch<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::PATCH)
    }

    pub fn delete<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::DELETE)
    }
}

/// Decode a response body, reporting shape mismatches as [`ApiError::Decode`].
/// An empty body decodes as JSON `null`.
pub fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T> {
    let source = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str::<T>(source)
        .map_err(|e| ApiError::decode(std::any::type_name::<T>(), e))
}
