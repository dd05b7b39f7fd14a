use std::future::Future;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, ClientBuilder
};
use serde::Serialize;
use serde_json::Value;

use crate::api::{config::ApiConfig, error::ApiError};

/// A GraphQL POST body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: Value
}

impl GraphQlRequest {
    /// The operation name, e.g. `EventEntrants` for `query EventEntrants(...)`.
    pub fn operation_name(&self) -> Option<&str> {
        let rest = self.query.trim_start().strip_prefix("query")?.trim_start();
        let end = rest.find(|c: char| c == '(' || c == '{' || c.is_whitespace())?;
        Some(&rest[..end])
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> RawResponse {
        RawResponse {
            status: 200,
            body: body.into()
        }
    }

    pub fn status(status: u16) -> RawResponse {
        RawResponse {
            status,
            body: String::new()
        }
    }
}

/// Failures below HTTP, split the way the retry policy treats them
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    Timeout,
    Connect(String),
    Other(String)
}

/// A single round-trip to the GraphQL endpoint. No retrying happens here.
pub trait Transport {
    fn post(&self, request: &GraphQlRequest) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

pub struct HttpTransport {
    client: Client,
    url: String
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<HttpTransport, ApiError> {
        let client = ClientBuilder::new()
            .default_headers(authorized_headers(&config.key)?)
            .timeout(config.timeout)
            .build()?;

        Ok(HttpTransport {
            client,
            url: config.url.clone()
        })
    }
}

fn authorized_headers(token: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let auth_value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ApiError::Transport("API key is not a valid header value".to_string()))?;
    headers.insert(AUTHORIZATION, auth_value);

    Ok(headers)
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

impl Transport for HttpTransport {
    async fn post(&self, request: &GraphQlRequest) -> Result<RawResponse, TransportError> {
        let response = self.client.post(&self.url).json(request).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(RawResponse { status, body })
    }
}
