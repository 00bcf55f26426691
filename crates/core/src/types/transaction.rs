//! Transaction records exchanged with the backend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ProductId, TransactionId};

/// Record of a completed payment, submitted once and never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_hash: TransactionId,
    /// Empty when the order was paid without a connected wallet.
    pub wallet_address: String,
    pub email: String,
    pub product_id: ProductId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: DateTime<Utc>,
}

/// Transaction row as listed in the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub trans_id: String,
    pub email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    pub trans_date: String,
    pub product_id: String,
}
