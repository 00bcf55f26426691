//! Wallet commands.
//!
//! # Usage
//!
//! ```bash
//! # Check the connected wallet (SOLSPLIT_WALLET_ADDRESS)
//! solsplit wallet check
//!
//! # Check any address
//! solsplit wallet check 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU
//! ```

use solsplit_core::{WalletAddress, WalletAssessment};
use solsplit_storefront::Storefront;
use solsplit_storefront::services::wallet::Eligibility;

use super::CliError;

/// Report pay-later eligibility for `address` or the connected wallet.
pub async fn check(
    storefront: &Storefront,
    address: Option<WalletAddress>,
) -> Result<(), CliError> {
    let address = match address {
        Some(address) => address,
        None => storefront.checkout().connect_wallet().await?,
    };

    if !storefront.config().indexer_enabled() {
        tracing::warn!("HELIUS_API_KEY is not set; wallet history cannot be checked");
    }

    let eligibility = storefront.checkout().eligibility().check(&address).await;
    tracing::info!("{}", verdict(&address, &eligibility));
    Ok(())
}

fn verdict(address: &WalletAddress, eligibility: &Eligibility) -> String {
    match eligibility {
        Eligibility::Eligible(assessment) => {
            format!("{address}: eligible for pay later ({})", history(assessment))
        }
        Eligibility::Ineligible(assessment) => format!(
            "{address}: not eligible for pay later ({}; needs more than {} days and {} transactions)",
            history(assessment),
            WalletAssessment::MIN_AGE_DAYS,
            WalletAssessment::MIN_TX_COUNT
        ),
        Eligibility::Unavailable => format!("{address}: wallet history unavailable"),
    }
}

fn history(assessment: &WalletAssessment) -> String {
    format!(
        "{} days old, {} transactions",
        assessment.age_days, assessment.tx_count
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ADDRESS: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    #[test]
    fn test_verdict_for_ineligible_wallet() {
        let address = WalletAddress::parse(ADDRESS).unwrap();
        let assessment = WalletAssessment {
            wallet_address: address.clone(),
            age_days: 12,
            tx_count: 3,
        };
        assert_eq!(
            verdict(&address, &Eligibility::Ineligible(assessment)),
            format!(
                "{ADDRESS}: not eligible for pay later (12 days old, 3 transactions; \
                 needs more than 30 days and 5 transactions)"
            )
        );
    }

    #[test]
    fn test_verdict_when_unavailable() {
        let address = WalletAddress::parse(ADDRESS).unwrap();
        assert!(verdict(&address, &Eligibility::Unavailable).ends_with("history unavailable"));
    }
}
