//! Unified error handling with Sentry integration.
//!
//! Provides a unified `StorefrontError` type. Every variant maps to a
//! customer-facing [`Notice`]; server-side failures are also captured to
//! Sentry before the notice is shown. Nothing here is fatal.

use thiserror::Error;

use crate::api::ApiError;
use crate::notify::Notice;
use crate::services::checkout::{KycError, PaymentError};
use crate::session::SessionError;

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Backend unreachable or answered with a non-success status.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Client-side validation failed before anything was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Product has no stock left.
    #[error("{product} is out of stock")]
    OutOfStock { product: String },

    /// Requested quantity exceeds the tracked stock.
    #[error("only {available} units of {product} available")]
    StockLimit { product: String, available: u32 },

    /// The action needs a logged-in customer.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The action needs the admin role.
    #[error("Admin access required")]
    NotAuthorized,

    /// No wallet provider is available.
    #[error("Wallet not installed")]
    WalletNotInstalled,

    /// The wallet does not meet the pay-later thresholds.
    #[error("Wallet not eligible: {age_days} days old, {tx_count} transactions")]
    WalletIneligible { age_days: u32, tx_count: u64 },

    /// The wallet could not be assessed.
    #[error("Wallet could not be verified")]
    WalletUnverifiable,

    /// Payment did not go through.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Identity verification did not go through.
    #[error("KYC error: {0}")]
    Kyc(#[from] KycError),

    /// Persisted session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl StorefrontError {
    /// Whether this failure should be captured to Sentry.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Api(err) => err.is_server_side(),
            Self::Session(_) => true,
            _ => false,
        }
    }

    /// The notice shown to the customer for this error.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Api(err) => Notice::destructive("Error", err.user_message()),
            Self::Validation(message) => Notice::destructive("Error", message.clone()),
            Self::NotFound(what) => Notice::destructive("Not Found", format!("{what} not found.")),
            Self::OutOfStock { .. } => {
                Notice::destructive("Out of Stock", "This product is currently out of stock.")
            }
            Self::StockLimit { available, .. } => Notice::destructive(
                "Stock Limit Reached",
                format!("Sorry, only {available} units available."),
            ),
            Self::AuthenticationRequired => Notice::destructive(
                "Authentication required",
                "Please log in to continue.",
            ),
            Self::NotAuthorized => Notice::destructive(
                "Access Denied",
                "You don't have permission to access this page.",
            ),
            Self::WalletNotInstalled => Notice::destructive(
                "Wallet Not Found",
                "Please install a Solana wallet first.",
            ),
            Self::WalletIneligible { .. } => Notice::destructive(
                "Wallet Verification Failed",
                "Your wallet doesn't meet our requirements for BNPL. Please use another payment method.",
            ),
            Self::WalletUnverifiable => Notice::destructive(
                "Connection Failed",
                "Failed to verify your wallet. Please try again later.",
            ),
            Self::Payment(err) => Notice::destructive("Payment Failed", err.to_string()),
            Self::Kyc(err) => Notice::destructive("Missing Documents", err.to_string()),
            Self::Session(_) => Notice::destructive(
                "Error",
                "Your saved session is unavailable. Please log in again.",
            ),
        }
    }

    /// Capture server-side failures to Sentry and return the notice.
    pub fn report(&self) -> Notice {
        if self.is_server_side() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Storefront action rejected");
        }
        self.notice()
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from the customer email.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(email.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
