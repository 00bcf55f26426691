//! Remote cart endpoints, keyed by customer email.

use secrecy::SecretString;
use serde::Serialize;
use solsplit_core::{CartLine, ProductId};
use tracing::instrument;

use super::{ApiClient, ApiError, bearer, ensure_success, read_json};

/// Request method the backend routes `/api/cart/addCart` under.
///
/// The route reads a JSON body despite being a GET.
pub const ADD_TO_CART_METHOD: reqwest::Method = reqwest::Method::GET;

/// Cart line as the backend's mutation endpoints expect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartApiItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub email: String,
}

impl ApiClient {
    /// Fetch the customer's remote cart.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not a cart.
    #[instrument(skip(self, token))]
    pub async fn fetch_cart(
        &self,
        email: &str,
        token: &SecretString,
    ) -> Result<Vec<CartLine>, ApiError> {
        let url = format!(
            "{}?email={}",
            self.endpoint("/api/cart/"),
            urlencoding::encode(email)
        );

        let response = bearer(self.http().get(&url), token).send().await?;
        let response = ensure_success(response).await?;
        read_json(response).await
    }

    /// Add `item.quantity` units to the remote cart.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(
        skip(self, token),
        fields(product_id = %item.product_id, quantity = item.quantity)
    )]
    pub async fn add_to_cart(
        &self,
        item: &CartApiItem,
        token: &SecretString,
    ) -> Result<(), ApiError> {
        let request = self
            .http()
            .request(ADD_TO_CART_METHOD, self.endpoint("/api/cart/addCart"))
            .json(item);

        let response = bearer(request, token).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Overwrite the quantity of a remote cart line.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(
        skip(self, token),
        fields(product_id = %item.product_id, quantity = item.quantity)
    )]
    pub async fn update_cart_item(
        &self,
        item: &CartApiItem,
        token: &SecretString,
    ) -> Result<(), ApiError> {
        let request = self.http().put(self.endpoint("/api/cart/update")).json(item);

        let response = bearer(request, token).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Remove a product from the remote cart.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip(self, token))]
    pub async fn remove_from_cart(
        &self,
        email: &str,
        product_id: &ProductId,
        token: &SecretString,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "email": email,
            "productId": product_id,
        });
        let request = self.http().delete(self.endpoint("/api/cart/remove")).json(&body);

        let response = bearer(request, token).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Empty the remote cart.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(&self, email: &str, token: &SecretString) -> Result<(), ApiError> {
        let body = serde_json::json!({ "email": email });
        let request = self.http().delete(self.endpoint("/api/cart/clear")).json(&body);

        let response = bearer(request, token).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}
