//! SolSplit Core - Domain types and rules.
//!
//! This crate provides the types and business rules shared by the SolSplit
//! components:
//! - `storefront` - REST client, session, cart sync, wallet and checkout services
//! - `cli` - Command-line storefront and admin console
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no persisted state. The cart ledger and the BNPL eligibility rule
//! live here so they can be tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers and wire types (IDs, emails, prices, products, wallets)
//! - [`cart`] - Stock-aware cart ledger
//! - [`order`] - Order summary and payment method

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod types;

pub use cart::{AddOutcome, CartLedger, CartLine, QuantityOutcome};
pub use order::{OrderSummary, PaymentMethod};
pub use types::*;
