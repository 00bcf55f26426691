//! Public product listing.

use std::sync::Arc;

use solsplit_core::Product;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{ApiClient, ApiError, ensure_success, read_json};

impl ApiClient {
    /// Fetch the public product listing.
    ///
    /// Served from the catalog cache when it is enabled and warm.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not a product list.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<[Product]>, ApiError> {
        if let Some(cache) = self.cache()
            && let Some(CacheValue::Products(products)) = cache.get(&CacheKey::Products).await
        {
            debug!(count = products.len(), "Cache hit for product listing");
            return Ok(products);
        }

        let response = self.http().get(self.endpoint("/api/products")).send().await?;
        let response = ensure_success(response).await?;
        let products: Arc<[Product]> = read_json::<Vec<Product>>(response).await?.into();

        if let Some(cache) = self.cache() {
            cache
                .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
                .await;
        }

        Ok(products)
    }

    /// Drop the cached product listing.
    pub async fn invalidate_catalog(&self) {
        if let Some(cache) = self.cache() {
            cache.invalidate(&CacheKey::Products).await;
            debug!("Invalidated product listing cache");
        }
    }
}
