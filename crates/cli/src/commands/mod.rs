//! Command implementations.
//!
//! Each command talks to a [`solsplit_storefront::Storefront`] and reports
//! results through `tracing`. Failures surface as [`CliError`].

use std::path::PathBuf;

use solsplit_storefront::StorefrontError;
use thiserror::Error;

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod wallet;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Storefront operation failed.
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    /// Output file could not be written.
    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
