//! SolSplit storefront library.
//!
//! Client side of the SolSplit store: talks to the backend REST API, keeps
//! the customer session, mirrors the cart, gates buy-now-pay-later on wallet
//! history and places orders.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`api`] - Backend REST client
//! - [`session`] - Persisted customer identity
//! - [`services`] - Catalog, auth, cart sync, wallet, checkout and admin
//! - [`notify`] - Customer-facing notices
//! - [`error`] - Error taxonomy and Sentry helpers
//! - [`state`] - The [`Storefront`] context tying it together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod services;
pub mod session;
pub mod state;

pub use config::StorefrontConfig;
pub use error::StorefrontError;
pub use notify::{Notice, Notifier, RecordingNotifier, Severity, TracingNotifier};
pub use state::Storefront;
