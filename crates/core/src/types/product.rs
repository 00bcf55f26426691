//! Catalog product as served by the backend.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A catalog product.
///
/// `stock_quantity` is advisory: when the backend omits it, no stock cap is
/// enforced anywhere. It is unsigned, so a tracked stock is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    /// Base64 encoded image payload.
    #[serde(default)]
    pub image_data: String,
    /// Free-form category string.
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
}

impl Product {
    /// True when stock is tracked and exhausted.
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        matches!(self.stock_quantity, Some(0))
    }

    /// Case-insensitive substring match over name, description and category.
    ///
    /// A blank term matches everything.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.product_name, &self.description, &self.product_type]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn lamp() -> Product {
        Product {
            id: ProductId::new("lamp"),
            product_name: "Desk Lamp".to_owned(),
            description: "Warm LED light".to_owned(),
            price: Price::new(Decimal::from(30)),
            image_data: String::new(),
            product_type: "Lighting".to_owned(),
            available: true,
            stock_quantity: Some(4),
        }
    }

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{
            "id": "p1",
            "productName": "Mug",
            "description": "Ceramic",
            "price": 12.5,
            "imageData": "aGVsbG8=",
            "productType": "Kitchen",
            "available": true
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.price.amount(), Decimal::new(125, 1));
        assert_eq!(product.stock_quantity, None);
        assert!(!product.is_out_of_stock());
    }

    #[test]
    fn test_out_of_stock_only_when_tracked_zero() {
        let mut product = lamp();
        assert!(!product.is_out_of_stock());
        product.stock_quantity = Some(0);
        assert!(product.is_out_of_stock());
        product.stock_quantity = None;
        assert!(!product.is_out_of_stock());
    }

    #[test]
    fn test_matches_search_fields() {
        let product = lamp();
        assert!(product.matches_search("desk"));
        assert!(product.matches_search("led"));
        assert!(product.matches_search("LIGHTING"));
        assert!(product.matches_search("  "));
        assert!(!product.matches_search("sofa"));
    }
}
