//! Order summary shown before payment.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartLedger;

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Buy now, pay later through a connected wallet (gated by eligibility).
    #[default]
    #[serde(rename = "later")]
    PayLater,
    /// Immediate payment.
    #[serde(rename = "now")]
    PayNow,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayLater => f.write_str("later"),
            Self::PayNow => f.write_str("now"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "later" | "bnpl" => Ok(Self::PayLater),
            "now" => Ok(Self::PayNow),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Subtotal, tax and total for the current cart. Shipping is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    /// Flat sales tax applied to the subtotal (10%).
    pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

    /// Summarize a cart.
    #[must_use]
    pub fn for_cart(cart: &CartLedger) -> Self {
        Self::for_subtotal(cart.total())
    }

    #[must_use]
    pub fn for_subtotal(subtotal: Decimal) -> Self {
        let tax = subtotal * Self::TAX_RATE;
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

impl fmt::Display for OrderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subtotal ${:.2}, tax ${:.2}, shipping free, total ${:.2}",
            self.subtotal, self.tax, self.total
        )
    }
}
