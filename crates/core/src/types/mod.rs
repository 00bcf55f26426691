//! Core types for SolSplit.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! wire shapes exchanged with the backend.

pub mod address;
pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod role;
pub mod transaction;
pub mod wallet;

pub use address::ShippingAddress;
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use product::Product;
pub use role::Role;
pub use transaction::{TransactionRecord, TransactionSummary};
pub use wallet::{WalletAddress, WalletAddressError, WalletAssessment};
