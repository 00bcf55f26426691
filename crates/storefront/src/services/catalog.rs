//! Public product browsing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use solsplit_core::{Product, ProductId};
use tracing::instrument;

use crate::api::ApiClient;
use crate::error::StorefrontError;

/// Read-only view over the public product listing.
pub struct CatalogService<'a> {
    api: &'a ApiClient,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Available products, optionally narrowed by a search term.
    ///
    /// # Errors
    ///
    /// Returns error if the listing cannot be fetched.
    #[instrument(skip(self))]
    pub async fn browse(&self, search: Option<&str>) -> Result<Vec<Product>, StorefrontError> {
        let products = self.api.products().await?;
        Ok(filter_listing(&products, search))
    }

    /// Look up a single product in the public listing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no product has this id, or the fetch error.
    #[instrument(skip(self))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, StorefrontError> {
        self.api
            .products()
            .await?
            .iter()
            .find(|product| &product.id == id)
            .cloned()
            .ok_or_else(|| StorefrontError::NotFound(format!("Product {id}")))
    }
}

/// Keep available products matching `search`, in listing order.
#[must_use]
pub fn filter_listing(products: &[Product], search: Option<&str>) -> Vec<Product> {
    products
        .iter()
        .filter(|product| product.available)
        .filter(|product| search.is_none_or(|term| product.matches_search(term)))
        .cloned()
        .collect()
}

/// Decode a product's base64 image payload.
///
/// A `data:` URL prefix is accepted and skipped.
///
/// # Errors
///
/// Returns `Validation` if the payload is empty or not valid base64.
pub fn decode_image(product: &Product) -> Result<Vec<u8>, StorefrontError> {
    let payload = product.image_data.trim();
    let payload = payload
        .split_once(";base64,")
        .map_or(payload, |(_, data)| data);

    if payload.is_empty() {
        return Err(StorefrontError::Validation(format!(
            "{} has no image.",
            product.product_name
        )));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| StorefrontError::Validation(format!("Invalid image data: {e}")))
}
