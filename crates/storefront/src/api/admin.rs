//! Admin product management endpoints.

use secrecy::SecretString;
use serde::Serialize;
use solsplit_core::{Price, Product, ProductId};
use tracing::instrument;

use super::{ApiClient, ApiError, bearer, ensure_success, read_json, status_error};

/// Image uploaded alongside a new product.
#[derive(Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ProductImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A validated new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub product_name: String,
    pub description: String,
    pub price: Price,
    pub product_type: String,
    pub available: bool,
    pub stock_quantity: Option<u32>,
    pub image: ProductImage,
}

/// A validated partial product update.
///
/// `available` is always sent; every other field only when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
    pub available: bool,
}

impl ApiClient {
    /// Full product listing, including unavailable products.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token lacks admin rights.
    #[instrument(skip(self, token))]
    pub async fn admin_products(&self, token: &SecretString) -> Result<Vec<Product>, ApiError> {
        let response = bearer(self.http().get(self.endpoint("/api/admin/")), token)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        read_json(response).await
    }

    /// Create a product from a multipart form carrying the image file.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects the product.
    #[instrument(skip(self, draft, token), fields(product_name = %draft.product_name))]
    pub async fn add_product(
        &self,
        draft: &ProductDraft,
        token: &SecretString,
    ) -> Result<(), ApiError> {
        let file = reqwest::multipart::Part::bytes(draft.image.bytes.clone())
            .file_name(draft.image.file_name.clone())
            .mime_str(&draft.image.content_type)?;

        let form = reqwest::multipart::Form::new()
            .text("productName", draft.product_name.clone())
            .text("description", draft.description.clone())
            .text("price", draft.price.amount().to_string())
            .text("productType", draft.product_type.clone())
            .text("available", draft.available.to_string())
            .text(
                "stockQuantity",
                draft.stock_quantity.map(|q| q.to_string()).unwrap_or_default(),
            )
            .part("file", file);

        let request = self
            .http()
            .post(self.endpoint("/api/admin/addProduct"))
            .multipart(form);

        let response = bearer(request, token).send().await?;
        ensure_success(response).await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    /// Apply a partial update to an existing product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails; a 404 carries "Product not found".
    #[instrument(skip(self, update, token), fields(product_id = %update.id))]
    pub async fn update_product(
        &self,
        update: &ProductUpdate,
        token: &SecretString,
    ) -> Result<(), ApiError> {
        let request = self.http().put(self.endpoint("/api/admin/update")).json(update);

        let response = bearer(request, token).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::Status {
                status: 404,
                message: "Product not found".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        self.invalidate_catalog().await;
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip(self, token))]
    pub async fn remove_product(
        &self,
        product_id: &ProductId,
        token: &SecretString,
    ) -> Result<(), ApiError> {
        let form =
            reqwest::multipart::Form::new().text("productId", product_id.as_str().to_string());
        let request = self
            .http()
            .delete(self.endpoint("/api/admin/remove"))
            .multipart(form);

        let response = bearer(request, token).send().await?;
        ensure_success(response).await?;
        self.invalidate_catalog().await;
        Ok(())
    }
}
