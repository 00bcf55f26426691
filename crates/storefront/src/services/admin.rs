//! Admin console: product and transaction management.
//!
//! Every operation requires an identity carrying the admin role.

use std::path::Path;

use secrecy::SecretString;
use solsplit_core::{Price, Product, ProductId, TransactionSummary};
use tracing::{info, instrument};

use crate::api::{ApiClient, ProductDraft, ProductImage, ProductUpdate};
use crate::error::{StorefrontError, add_breadcrumb};
use crate::notify::{Notice, Notifier};
use crate::session::Identity;

/// New-product form as entered.
#[derive(Debug, Clone, Default)]
pub struct NewProductForm {
    pub product_name: String,
    pub description: String,
    pub price: String,
    pub product_type: String,
    pub available: bool,
    pub stock_quantity: Option<u32>,
    pub image: Option<ProductImage>,
}

impl NewProductForm {
    /// Check required fields, the image and the price.
    ///
    /// # Errors
    ///
    /// Returns `Validation` describing the first problem found.
    pub fn validate(self) -> Result<ProductDraft, StorefrontError> {
        let required = [
            &self.product_name,
            &self.description,
            &self.price,
            &self.product_type,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(invalid("Please fill in all required fields."));
        }
        let Some(image) = self.image else {
            return Err(invalid("Please select an image for the product."));
        };
        let price =
            Price::parse_positive(&self.price).map_err(|_| invalid("Please enter a valid price."))?;

        Ok(ProductDraft {
            product_name: self.product_name.trim().to_string(),
            description: self.description.trim().to_string(),
            price,
            product_type: self.product_type.trim().to_string(),
            available: self.available,
            stock_quantity: self.stock_quantity,
            image,
        })
    }
}

/// Product-update form as entered. Blank fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdateForm {
    pub id: String,
    pub product_name: String,
    pub description: String,
    pub product_type: String,
    pub price: String,
    pub stock_quantity: Option<u32>,
    pub available: bool,
}

impl ProductUpdateForm {
    /// Build a partial update from the non-blank fields.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without an id, without any field to change
    /// (`available` alone does not count) or with a non-positive price.
    pub fn validate(self) -> Result<ProductUpdate, StorefrontError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(invalid("Please enter a product ID."));
        }

        let price = non_blank(&self.price)
            .map(|raw| {
                Price::parse_positive(&raw).map_err(|_| invalid("Please enter a valid price."))
            })
            .transpose()?;

        let update = ProductUpdate {
            id: ProductId::new(id),
            product_name: non_blank(&self.product_name),
            description: non_blank(&self.description),
            product_type: non_blank(&self.product_type),
            price,
            stock_quantity: self.stock_quantity,
            available: self.available,
        };

        let changes_something = update.product_name.is_some()
            || update.description.is_some()
            || update.product_type.is_some()
            || update.price.is_some()
            || update.stock_quantity.is_some();
        if !changes_something {
            return Err(invalid("Please fill at least one field to update."));
        }
        Ok(update)
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn invalid(message: &str) -> StorefrontError {
    StorefrontError::Validation(message.to_string())
}

/// Read a product image from disk, guessing its type from the extension.
///
/// # Errors
///
/// Returns `Validation` if the file cannot be read.
pub async fn load_image(path: &Path) -> Result<ProductImage, StorefrontError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StorefrontError::Validation(format!("Cannot read {}: {e}", path.display())))?;

    let content_type = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    Ok(ProductImage {
        file_name: path
            .file_name()
            .map_or_else(|| "image".to_string(), |name| name.to_string_lossy().into_owned()),
        content_type: content_type.to_string(),
        bytes,
    })
}

/// Admin product and transaction management.
pub struct AdminService<'a> {
    api: &'a ApiClient,
    notifier: &'a dyn Notifier,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient, notifier: &'a dyn Notifier) -> Self {
        Self { api, notifier }
    }

    /// Every product, including unavailable ones.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired`/`NotAuthorized` without an admin
    /// identity, or the API error.
    pub async fn list_products(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<Product>, StorefrontError> {
        let token = require_admin(identity)?;
        Ok(self.api.admin_products(token).await?)
    }

    /// Validate and create a product.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an invalid form, admin errors, or the API
    /// error.
    #[instrument(skip_all)]
    pub async fn add_product(
        &self,
        identity: Option<&Identity>,
        form: NewProductForm,
    ) -> Result<(), StorefrontError> {
        let token = require_admin(identity)?;
        let draft = form.validate()?;

        self.api.add_product(&draft, token).await?;

        add_breadcrumb("admin", "Added product", Some(&[("name", draft.product_name.as_str())]));
        info!(product_name = %draft.product_name, "Product added");
        self.notifier
            .notify(Notice::info("Success", "Product has been added successfully."));
        Ok(())
    }

    /// Validate and apply a partial product update.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an invalid form, admin errors, or the API
    /// error ("Product not found" on 404).
    #[instrument(skip_all)]
    pub async fn update_product(
        &self,
        identity: Option<&Identity>,
        form: ProductUpdateForm,
    ) -> Result<(), StorefrontError> {
        let token = require_admin(identity)?;
        let update = form.validate()?;

        self.api.update_product(&update, token).await?;

        add_breadcrumb("admin", "Updated product", Some(&[("product_id", update.id.as_str())]));
        info!(product_id = %update.id, "Product updated");
        self.notifier
            .notify(Notice::info("Success", "Product has been updated successfully."));
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank id, admin errors, or the API error.
    #[instrument(skip(self, identity))]
    pub async fn remove_product(
        &self,
        identity: Option<&Identity>,
        product_id: &str,
    ) -> Result<(), StorefrontError> {
        let token = require_admin(identity)?;
        let product_id = non_blank(product_id)
            .map(ProductId::new)
            .ok_or_else(|| invalid("Please enter a product ID."))?;

        self.api.remove_product(&product_id, token).await?;

        add_breadcrumb("admin", "Removed product", Some(&[("product_id", product_id.as_str())]));
        info!(product_id = %product_id, "Product removed");
        self.notifier
            .notify(Notice::info("Success", "Product has been removed successfully."));
        Ok(())
    }

    /// Every recorded transaction.
    ///
    /// # Errors
    ///
    /// Returns admin errors or the API error.
    pub async fn list_transactions(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<TransactionSummary>, StorefrontError> {
        let token = require_admin(identity)?;
        Ok(self.api.transactions(token).await?)
    }
}

/// The admin's token, or the reason access is refused.
fn require_admin(identity: Option<&Identity>) -> Result<&SecretString, StorefrontError> {
    let identity = identity.ok_or(StorefrontError::AuthenticationRequired)?;
    if !identity.is_admin() {
        return Err(StorefrontError::NotAuthorized);
    }
    Ok(&identity.token)
}
