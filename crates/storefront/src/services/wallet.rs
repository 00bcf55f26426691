//! Wallet connection and pay-later eligibility.
//!
//! A wallet qualifies for buy-now-pay-later when its visible history is old
//! and busy enough (see [`WalletAssessment::is_eligible`]). History comes
//! from a blockchain indexer; when the indexer cannot be reached the wallet
//! simply gets no assessment.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use solsplit_core::{WalletAddress, WalletAssessment};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::IndexerConfig;
use crate::error::StorefrontError;

/// Errors that can occur when querying the indexer.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// No API key is configured.
    #[error("indexer API key not configured")]
    NotConfigured,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Indexer answered with a non-success status.
    #[error("indexer error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of a wallet's transaction history.
#[async_trait]
pub trait WalletIndexer: Send + Sync {
    /// Timestamps of the wallet's visible transactions.
    async fn transaction_times(
        &self,
        address: &WalletAddress,
    ) -> Result<Vec<DateTime<Utc>>, IndexerError>;
}

#[async_trait]
impl<T: WalletIndexer + ?Sized> WalletIndexer for Arc<T> {
    async fn transaction_times(
        &self,
        address: &WalletAddress,
    ) -> Result<Vec<DateTime<Utc>>, IndexerError> {
        (**self).transaction_times(address).await
    }
}

// =============================================================================
// HeliusIndexer
// =============================================================================

/// Helius transaction history API client.
#[derive(Clone)]
pub struct HeliusIndexer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

/// History payload: either a bare list or wrapped in `transactions`.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryResponse {
    List(Vec<IndexedTransaction>),
    Wrapped { transactions: Vec<IndexedTransaction> },
}

#[derive(Deserialize)]
struct IndexedTransaction {
    /// Unix seconds.
    timestamp: i64,
}

impl HistoryResponse {
    fn into_times(self) -> Vec<DateTime<Utc>> {
        let transactions = match self {
            Self::List(transactions) | Self::Wrapped { transactions } => transactions,
        };
        transactions
            .into_iter()
            .filter_map(|tx| DateTime::from_timestamp(tx.timestamp, 0))
            .collect()
    }
}

impl HeliusIndexer {
    /// Create a new indexer client.
    #[must_use]
    pub fn new(config: &IndexerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl WalletIndexer for HeliusIndexer {
    #[instrument(skip(self), fields(address = %address))]
    async fn transaction_times(
        &self,
        address: &WalletAddress,
    ) -> Result<Vec<DateTime<Utc>>, IndexerError> {
        let api_key = self.api_key.as_ref().ok_or(IndexerError::NotConfigured)?;

        let url = format!(
            "{}/v0/addresses/{}/transactions?api-key={}",
            self.base_url,
            urlencoding::encode(address.as_str()),
            urlencoding::encode(api_key.expose_secret())
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexerError::Status {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let text = response.text().await?;
        let history: HistoryResponse =
            serde_json::from_str(&text).map_err(|e| IndexerError::Parse(e.to_string()))?;
        let times = history.into_times();

        debug!(count = times.len(), "Fetched wallet history");
        Ok(times)
    }
}

// =============================================================================
// Wallet provider
// =============================================================================

/// Wallet the customer pays from.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Connect and return the wallet's public address.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotInstalled` when no wallet is available.
    async fn connect(&self) -> Result<WalletAddress, StorefrontError>;
}

/// Wallet whose address comes from configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredWallet {
    address: Option<WalletAddress>,
}

impl ConfiguredWallet {
    #[must_use]
    pub const fn new(address: Option<WalletAddress>) -> Self {
        Self { address }
    }
}

#[async_trait]
impl WalletProvider for ConfiguredWallet {
    async fn connect(&self) -> Result<WalletAddress, StorefrontError> {
        self.address
            .clone()
            .ok_or(StorefrontError::WalletNotInstalled)
    }
}

// =============================================================================
// Eligibility
// =============================================================================

/// Result of a pay-later eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible(WalletAssessment),
    Ineligible(WalletAssessment),
    /// The wallet could not be assessed; treated as ineligible.
    Unavailable,
}

impl Eligibility {
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible(_))
    }

    #[must_use]
    pub const fn assessment(&self) -> Option<&WalletAssessment> {
        match self {
            Self::Eligible(assessment) | Self::Ineligible(assessment) => Some(assessment),
            Self::Unavailable => None,
        }
    }

    /// The assessment when eligible, the matching error otherwise.
    ///
    /// # Errors
    ///
    /// Returns `WalletIneligible` or `WalletUnverifiable`.
    pub fn into_eligible(self) -> Result<WalletAssessment, StorefrontError> {
        match self {
            Self::Eligible(assessment) => Ok(assessment),
            Self::Ineligible(assessment) => Err(StorefrontError::WalletIneligible {
                age_days: assessment.age_days,
                tx_count: assessment.tx_count,
            }),
            Self::Unavailable => Err(StorefrontError::WalletUnverifiable),
        }
    }
}

/// Applies the pay-later rule to indexer history.
pub struct EligibilityChecker<I> {
    indexer: I,
}

impl<I: WalletIndexer> EligibilityChecker<I> {
    pub const fn new(indexer: I) -> Self {
        Self { indexer }
    }

    /// Assess `address` as of now.
    pub async fn check(&self, address: &WalletAddress) -> Eligibility {
        self.check_at(address, Utc::now()).await
    }

    /// Assess `address` as of `now`.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn check_at(&self, address: &WalletAddress, now: DateTime<Utc>) -> Eligibility {
        let times = match self.indexer.transaction_times(address).await {
            Ok(times) => times,
            Err(IndexerError::NotConfigured) => {
                debug!("Indexer not configured, skipping wallet assessment");
                return Eligibility::Unavailable;
            }
            Err(err) => {
                warn!(error = %err, "Wallet assessment failed");
                sentry::capture_error(&err);
                return Eligibility::Unavailable;
            }
        };

        let assessment = WalletAssessment::from_history(address.clone(), &times, now);
        debug!(
            age_days = assessment.age_days,
            tx_count = assessment.tx_count,
            eligible = assessment.is_eligible(),
            "Wallet assessed"
        );

        if assessment.is_eligible() {
            Eligibility::Eligible(assessment)
        } else {
            Eligibility::Ineligible(assessment)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    const ADDRESS: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    struct FixedHistory(Result<Vec<DateTime<Utc>>, ()>);

    #[async_trait]
    impl WalletIndexer for FixedHistory {
        async fn transaction_times(
            &self,
            _address: &WalletAddress,
        ) -> Result<Vec<DateTime<Utc>>, IndexerError> {
            self.0.clone().map_err(|()| IndexerError::Status {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn history(age_days: i64, count: usize) -> Vec<DateTime<Utc>> {
        (0..count)
            .map(|i| {
                now() - Duration::days(age_days) + Duration::minutes(i64::try_from(i).unwrap())
            })
            .collect()
    }

    fn address() -> WalletAddress {
        WalletAddress::parse(ADDRESS).unwrap()
    }

    #[tokio::test]
    async fn test_old_busy_wallet_is_eligible() {
        let checker = EligibilityChecker::new(FixedHistory(Ok(history(31, 6))));
        let result = checker.check_at(&address(), now()).await;
        assert!(result.is_eligible());
        assert_eq!(result.assessment().unwrap().age_days, 31);
    }

    #[tokio::test]
    async fn test_boundaries_are_excluded() {
        let checker = EligibilityChecker::new(FixedHistory(Ok(history(30, 6))));
        assert!(matches!(
            checker.check_at(&address(), now()).await,
            Eligibility::Ineligible(_)
        ));

        let checker = EligibilityChecker::new(FixedHistory(Ok(history(31, 5))));
        let err = checker
            .check_at(&address(), now())
            .await
            .into_eligible()
            .unwrap_err();
        assert!(matches!(
            err,
            StorefrontError::WalletIneligible { tx_count: 5, .. }
        ));
    }

    #[tokio::test]
    async fn test_indexer_failure_is_unavailable() {
        let checker = EligibilityChecker::new(FixedHistory(Err(())));
        let result = checker.check_at(&address(), now()).await;
        assert_eq!(result, Eligibility::Unavailable);
        assert!(matches!(
            result.into_eligible(),
            Err(StorefrontError::WalletUnverifiable)
        ));
    }

    #[tokio::test]
    async fn test_configured_wallet() {
        assert!(matches!(
            ConfiguredWallet::default().connect().await,
            Err(StorefrontError::WalletNotInstalled)
        ));
        let wallet = ConfiguredWallet::new(Some(address()));
        assert_eq!(wallet.connect().await.unwrap(), address());
    }

    #[test]
    fn test_history_accepts_both_shapes() {
        let bare: HistoryResponse =
            serde_json::from_str(r#"[{"timestamp": 1700000000, "signature": "abc"}]"#).unwrap();
        assert_eq!(bare.into_times().len(), 1);

        let wrapped: HistoryResponse = serde_json::from_str(
            r#"{"transactions": [{"timestamp": 1700000000}, {"timestamp": 1600000000}]}"#,
        )
        .unwrap();
        let times = wrapped.into_times();
        assert_eq!(times.len(), 2);
        assert_eq!(times.iter().min().unwrap().timestamp(), 1_600_000_000);
    }

    #[tokio::test]
    async fn test_helius_without_key_is_not_configured() {
        let config = IndexerConfig {
            base_url: url::Url::parse("https://api.helius.xyz").unwrap(),
            api_key: None,
        };
        let indexer = HeliusIndexer::new(&config);
        assert!(matches!(
            indexer.transaction_times(&address()).await,
            Err(IndexerError::NotConfigured)
        ));
    }
}
