//! Wallet addresses and the buy-now-pay-later eligibility rule.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base58 alphabet used by Solana public keys.
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Errors that can occur when parsing a [`WalletAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletAddressError {
    #[error("wallet address must be {min}-{max} characters (got {len})")]
    Length { min: usize, max: usize, len: usize },
    #[error("wallet address contains non-base58 character {0:?}")]
    InvalidCharacter(char),
}

/// A base58 encoded wallet public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub const MIN_LENGTH: usize = 32;
    pub const MAX_LENGTH: usize = 44;

    /// Parse and validate a wallet address.
    ///
    /// # Errors
    ///
    /// Returns [`WalletAddressError`] if the length is out of range or a
    /// character is outside the base58 alphabet.
    pub fn parse(input: &str) -> Result<Self, WalletAddressError> {
        let s = input.trim();
        let len = s.chars().count();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&len) {
            return Err(WalletAddressError::Length {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
                len,
            });
        }
        if let Some(bad) = s.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(WalletAddressError::InvalidCharacter(bad));
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = WalletAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Age and activity of a wallet, derived from its visible history.
///
/// Computed once per checkout attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAssessment {
    pub wallet_address: WalletAddress,
    pub age_days: u32,
    pub tx_count: u64,
}

impl WalletAssessment {
    /// A wallet must be strictly older than this many days.
    pub const MIN_AGE_DAYS: u32 = 30;
    /// A wallet must have strictly more than this many transactions.
    pub const MIN_TX_COUNT: u64 = 5;

    /// Build an assessment from the timestamps of the visible transactions.
    ///
    /// Age is measured from the oldest timestamp to `now` in whole days. An
    /// empty history has age zero.
    #[must_use]
    pub fn from_history(
        wallet_address: WalletAddress,
        timestamps: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> Self {
        let oldest = timestamps.iter().min().copied().unwrap_or(now);
        let age_days = u32::try_from((now - oldest).num_days().max(0)).unwrap_or(u32::MAX);

        Self {
            wallet_address,
            age_days,
            tx_count: timestamps.len() as u64,
        }
    }

    /// Whether the wallet qualifies for buy-now-pay-later.
    ///
    /// Both thresholds are strict: 30 days or 5 transactions is not enough.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.age_days > Self::MIN_AGE_DAYS && self.tx_count > Self::MIN_TX_COUNT
    }
}
