//! SolSplit backend REST client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP via `reqwest`; multipart for product uploads
//! - The backend is the source of truth for products, carts and transactions
//! - The public product listing is cached in memory via `moka`
//! - Authenticated calls carry the session token as a bearer header
//!
//! # Example
//!
//! ```rust,ignore
//! use solsplit_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config)?;
//! let products = client.products().await?;
//! ```

mod admin;
mod auth;
mod cache;
mod cart;
mod catalog;
mod transactions;

pub use admin::{ProductDraft, ProductImage, ProductUpdate};
pub use auth::{LoginCredentials, LoginResponse, SignupData};
pub use cart::CartApiItem;

use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::StorefrontConfig;

use cache::{CacheKey, CacheValue};

/// Maximum number of response-body characters kept in errors and logs.
const BODY_EXCERPT_CHARS: usize = 200;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (network, DNS, connection refused).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with an unexpected status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether the failure lies outside the customer's control.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) => true,
            Self::Status { status, .. } => *status >= 500,
        }
    }

    /// Message suitable for showing to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Network error occurred".to_string(),
            Self::Status { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Status { status, .. } => format!("Request failed with status {status}"),
            Self::Parse(_) => "Unexpected response from the server".to_string(),
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the SolSplit backend.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the catalog
/// cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let cache = config.catalog_cache_ttl.map(|ttl| {
            Cache::builder()
                .max_capacity(16)
                .time_to_live(ttl)
                .build()
        });

        let client = reqwest::Client::builder()
            .user_agent(concat!("solsplit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    fn cache(&self) -> Option<&Cache<CacheKey, CacheValue>> {
        self.inner.cache.as_ref()
    }
}

/// Add the bearer token to a request.
fn bearer(request: reqwest::RequestBuilder, token: &SecretString) -> reqwest::RequestBuilder {
    request.header(
        reqwest::header::AUTHORIZATION,
        format!("Bearer {}", token.expose_secret()),
    )
}

/// Turn a non-success response into [`ApiError::Status`].
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(status_error(response).await)
}

/// Require one exact status code (the auth endpoints answer 200/201).
async fn ensure_status(
    response: reqwest::Response,
    expected: reqwest::StatusCode,
) -> Result<reqwest::Response, ApiError> {
    if response.status() == expected {
        return Ok(response);
    }
    Err(status_error(response).await)
}

async fn status_error(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        status = %status,
        body = %excerpt(&body),
        "Backend returned non-success status"
    );
    ApiError::Status {
        status: status.as_u16(),
        message: excerpt(&body),
    }
}

/// Read a JSON body, logging the payload on parse failure.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %excerpt(&text),
            "Failed to parse backend response"
        );
        ApiError::Parse(e.to_string())
    })
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
