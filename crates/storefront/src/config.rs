//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `SOLSPLIT_API_URL` - Backend REST base URL
//!   (default: `http://solsplit.eu-north-1.elasticbeanstalk.com`)
//! - `SOLSPLIT_SESSION_PATH` - File backing the persisted session
//!   (default: `.solsplit/session.json`)
//! - `SOLSPLIT_CATALOG_CACHE_TTL_SECS` - Public catalog cache TTL, `0` disables (default: 60)
//! - `SOLSPLIT_PAYMENT_DELAY_MS` - Simulated wallet confirmation delay (default: 2000)
//! - `SOLSPLIT_KYC_DELAY_MS` - Simulated KYC verification delay (default: 2000)
//! - `SOLSPLIT_WALLET_ADDRESS` - Address the wallet provider connects to
//!   (unset means no wallet is installed)
//! - `HELIUS_API_URL` - Blockchain indexer base URL (default: `https://api.helius.xyz`)
//! - `HELIUS_API_KEY` - Indexer API key (unset disables wallet assessment)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use solsplit_core::WalletAddress;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://solsplit.eu-north-1.elasticbeanstalk.com";
const DEFAULT_INDEXER_URL: &str = "https://api.helius.xyz";
const DEFAULT_SESSION_PATH: &str = ".solsplit/session.json";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend REST base URL
    pub api_url: Url,
    /// File backing the persisted session store
    pub session_path: PathBuf,
    /// Public catalog cache TTL (`None` disables the cache)
    pub catalog_cache_ttl: Option<Duration>,
    /// Wallet indexer configuration
    pub indexer: IndexerConfig,
    /// Stubbed payment and KYC behaviour
    pub simulation: SimulationConfig,
    /// Address the wallet provider connects to
    pub wallet_address: Option<WalletAddress>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Blockchain indexer configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IndexerConfig {
    /// Indexer base URL
    pub base_url: Url,
    /// Indexer API key
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Delays used by the simulated wallet confirmation and KYC check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    pub payment_delay: Duration,
    pub kyc_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            payment_delay: Duration::from_millis(2000),
            kyc_delay: Duration::from_millis(2000),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the indexer API key
    /// fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let api_url = vars.url("SOLSPLIT_API_URL", DEFAULT_API_URL)?;
        let session_path =
            PathBuf::from(vars.or_default("SOLSPLIT_SESSION_PATH", DEFAULT_SESSION_PATH));
        let ttl_secs: u64 = vars.parsed("SOLSPLIT_CATALOG_CACHE_TTL_SECS", 60)?;
        let catalog_cache_ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs));

        let simulation = SimulationConfig {
            payment_delay: Duration::from_millis(vars.parsed("SOLSPLIT_PAYMENT_DELAY_MS", 2000)?),
            kyc_delay: Duration::from_millis(vars.parsed("SOLSPLIT_KYC_DELAY_MS", 2000)?),
        };

        let wallet_address = vars
            .optional("SOLSPLIT_WALLET_ADDRESS")
            .map(|raw| {
                WalletAddress::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("SOLSPLIT_WALLET_ADDRESS".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let indexer = IndexerConfig {
            base_url: vars.url("HELIUS_API_URL", DEFAULT_INDEXER_URL)?,
            api_key: vars
                .optional("HELIUS_API_KEY")
                .map(|key| {
                    validate_secret_strength(&key, "HELIUS_API_KEY")?;
                    Ok::<_, ConfigError>(SecretString::from(key))
                })
                .transpose()?,
        };

        Ok(Self {
            api_url,
            session_path,
            catalog_cache_ttl,
            indexer,
            simulation,
            wallet_address,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at a given backend, with everything else at
    /// its default and no indexer key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_url` is not an http(s) URL.
    pub fn for_api(api_url: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| (key == "SOLSPLIT_API_URL").then(|| api_url.to_string()))
    }

    /// Whether the indexer can be queried at all.
    #[must_use]
    pub fn indexer_enabled(&self) -> bool {
        self.indexer
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().is_empty())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source wrapper with typed accessors.
struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    fn url(&self, key: &str, default: &str) -> Result<Url, ConfigError> {
        let raw = self.or_default(key, default);
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://solsplit.eu-north-1.elasticbeanstalk.com/");
        assert_eq!(config.session_path, PathBuf::from(".solsplit/session.json"));
        assert_eq!(config.catalog_cache_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.simulation, SimulationConfig::default());
        assert!(config.wallet_address.is_none());
        assert!(!config.indexer_enabled());
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let config = load(&[("SOLSPLIT_CATALOG_CACHE_TTL_SECS", "0")]).unwrap();
        assert!(config.catalog_cache_ttl.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[("SOLSPLIT_PAYMENT_DELAY_MS", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnvVar(key, _) if key == "SOLSPLIT_PAYMENT_DELAY_MS"
        ));
    }

    #[test]
    fn test_rejects_non_http_api_url() {
        let err = load(&[("SOLSPLIT_API_URL", "ftp://store.example")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_rejects_invalid_wallet_address() {
        assert!(load(&[("SOLSPLIT_WALLET_ADDRESS", "not-a-wallet")]).is_err());
    }

    #[test]
    fn test_placeholder_indexer_key_rejected() {
        let err = load(&[("HELIUS_API_KEY", "your-helius-api-key")]).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_low_entropy_indexer_key_rejected() {
        let err = load(&[("HELIUS_API_KEY", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")]).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_valid_indexer_key_enables_assessment() {
        let config = load(&[("HELIUS_API_KEY", "3f9c2a7e-41b8-4d6f-9a0c-5e8b7d1f2c46")]).unwrap();
        assert!(config.indexer_enabled());
    }

    #[test]
    fn test_indexer_debug_redacts_key() {
        let config = load(&[("HELIUS_API_KEY", "3f9c2a7e-41b8-4d6f-9a0c-5e8b7d1f2c46")]).unwrap();
        let debug_output = format!("{:?}", config.indexer);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("3f9c2a7e"));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }
}
