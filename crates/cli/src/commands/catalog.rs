//! Catalog commands.
//!
//! # Usage
//!
//! ```bash
//! solsplit products
//! solsplit products --search mug
//! solsplit product 64f1c2 --save-image mug.png
//! ```

use std::path::Path;

use solsplit_core::{Product, ProductId};
use solsplit_storefront::{Storefront, services::catalog::decode_image};

use super::CliError;

/// List available products, optionally filtered.
pub async fn products(storefront: &Storefront, search: Option<&str>) -> Result<(), CliError> {
    let products = storefront.catalog().browse(search).await?;

    if products.is_empty() {
        tracing::info!("No products found");
        return Ok(());
    }

    for product in &products {
        tracing::info!("{}", listing_line(product));
    }
    tracing::info!("{} product(s)", products.len());
    Ok(())
}

/// Show one product, optionally saving its image.
pub async fn product(
    storefront: &Storefront,
    id: &str,
    save_image: Option<&Path>,
) -> Result<(), CliError> {
    let product = storefront.catalog().product(&ProductId::new(id)).await?;

    tracing::info!("{}", listing_line(&product));
    if !product.description.is_empty() {
        tracing::info!("  {}", product.description);
    }

    if let Some(path) = save_image {
        let bytes = decode_image(&product)?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| CliError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!("Saved image ({} bytes) to {}", bytes.len(), path.display());
    }
    Ok(())
}

fn listing_line(product: &Product) -> String {
    let stock = match product.stock_quantity {
        Some(0) => "out of stock".to_string(),
        Some(n) => format!("{n} in stock"),
        None => "in stock".to_string(),
    };
    format!(
        "{}  {}  {}  [{}]  {stock}",
        product.id, product.product_name, product.price, product.product_type
    )
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use solsplit_core::Price;

    use super::*;

    fn product(stock: Option<u32>) -> Product {
        Product {
            id: ProductId::new("p1"),
            product_name: "Mug".to_string(),
            description: String::new(),
            price: Price::new(Decimal::new(1250, 2)),
            image_data: String::new(),
            product_type: "kitchen".to_string(),
            available: true,
            stock_quantity: stock,
        }
    }

    #[test]
    fn test_listing_line_shows_stock() {
        assert_eq!(
            listing_line(&product(Some(3))),
            "p1  Mug  $12.50  [kitchen]  3 in stock"
        );
        assert!(listing_line(&product(Some(0))).ends_with("out of stock"));
        assert!(listing_line(&product(None)).ends_with("in stock"));
    }
}
