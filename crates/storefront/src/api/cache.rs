//! Cache types for backend responses.

use std::sync::Arc;

use solsplit_core::Product;

/// Cache key for public catalog data.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<[Product]>),
}
