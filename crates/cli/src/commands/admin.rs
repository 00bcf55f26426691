//! Admin console commands.
//!
//! All commands require a logged-in account with the admin role.
//!
//! # Usage
//!
//! ```bash
//! solsplit admin products
//! solsplit admin add --name Mug --description "Blue mug" --price 12.50 \
//!     --product-type kitchen --stock 20 --image mug.png
//! solsplit admin update 64f1c2 --price 10 --stock 15
//! solsplit admin remove 64f1c2
//! solsplit admin transactions
//! ```

use std::path::PathBuf;

use clap::Args;
use solsplit_storefront::Storefront;
use solsplit_storefront::services::admin::{NewProductForm, ProductUpdateForm, load_image};

use super::CliError;

/// New product fields.
#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: String,

    #[arg(long)]
    pub price: String,

    #[arg(long)]
    pub product_type: String,

    /// Units in stock (untracked when omitted)
    #[arg(long)]
    pub stock: Option<u32>,

    /// Hide the product from the public catalog
    #[arg(long)]
    pub unavailable: bool,

    /// Product image file
    #[arg(long)]
    pub image: Option<PathBuf>,
}

/// Product update fields. Omitted fields are left unchanged.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Product ID
    pub id: String,

    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "")]
    pub product_type: String,

    #[arg(long, default_value = "")]
    pub price: String,

    #[arg(long)]
    pub stock: Option<u32>,

    /// Hide the product from the public catalog
    #[arg(long)]
    pub unavailable: bool,
}

impl From<UpdateArgs> for ProductUpdateForm {
    fn from(args: UpdateArgs) -> Self {
        Self {
            id: args.id,
            product_name: args.name,
            description: args.description,
            product_type: args.product_type,
            price: args.price,
            stock_quantity: args.stock,
            available: !args.unavailable,
        }
    }
}

/// List every product.
pub async fn products(storefront: &Storefront) -> Result<(), CliError> {
    let products = storefront.admin().list_products(storefront.identity()).await?;

    for product in &products {
        let stock = product
            .stock_quantity
            .map_or_else(|| "untracked".to_string(), |n| n.to_string());
        tracing::info!(
            "{}  {}  {}  available={}  stock={stock}",
            product.id,
            product.product_name,
            product.price,
            product.available
        );
    }
    tracing::info!("{} product(s)", products.len());
    Ok(())
}

/// Create a product.
pub async fn add(storefront: &Storefront, args: AddArgs) -> Result<(), CliError> {
    let image = match &args.image {
        Some(path) => Some(load_image(path).await?),
        None => None,
    };

    let form = NewProductForm {
        product_name: args.name,
        description: args.description,
        price: args.price,
        product_type: args.product_type,
        available: !args.unavailable,
        stock_quantity: args.stock,
        image,
    };
    storefront
        .admin()
        .add_product(storefront.identity(), form)
        .await?;
    Ok(())
}

/// Update a product.
pub async fn update(storefront: &Storefront, args: UpdateArgs) -> Result<(), CliError> {
    storefront
        .admin()
        .update_product(storefront.identity(), args.into())
        .await?;
    Ok(())
}

/// Delete a product.
pub async fn remove(storefront: &Storefront, id: &str) -> Result<(), CliError> {
    storefront
        .admin()
        .remove_product(storefront.identity(), id)
        .await?;
    Ok(())
}

/// List completed transactions.
pub async fn transactions(storefront: &Storefront) -> Result<(), CliError> {
    let transactions = storefront
        .admin()
        .list_transactions(storefront.identity())
        .await?;

    for tx in &transactions {
        tracing::info!(
            "{}  {}  {}  ${:.2}  product={}  wallet={}",
            tx.trans_date,
            tx.trans_id,
            tx.email,
            tx.amount,
            tx.product_id,
            tx.wallet_address
        );
    }
    tracing::info!("{} transaction(s)", transactions.len());
    Ok(())
}
