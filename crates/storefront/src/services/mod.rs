//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Login, signup and logout against the backend
//! - `catalog` - Public product browsing and image decoding
//! - `cart` - Local-first cart mirrored to the backend
//! - `wallet` - Wallet connection and pay-later eligibility
//! - `checkout` - Order placement with stubbed payment and KYC
//! - `admin` - Product and transaction management for admins
//!
//! Remote collaborators sit behind `async_trait` seams so each service can be
//! driven by in-memory fakes.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod wallet;
