//! KYC and checkout commands.
//!
//! # Usage
//!
//! ```bash
//! solsplit kyc --government-id id.png --selfie me.png
//!
//! solsplit checkout \
//!     --name "Ada Lovelace" --address-line1 "1 Main St" --city Springfield \
//!     --state IL --postal-code 62701 --country US --phone-number 5551234 \
//!     --method later
//! ```

use std::path::PathBuf;

use clap::Args;
use solsplit_core::{PaymentMethod, ShippingAddress};
use solsplit_storefront::Storefront;
use solsplit_storefront::services::checkout::{CheckoutRequest, KycDocuments};

use super::CliError;

/// Shipping details and payment method.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub address_line1: String,

    #[arg(long)]
    pub address_line2: Option<String>,

    #[arg(long, default_value = "")]
    pub city: String,

    #[arg(long, default_value = "")]
    pub state: String,

    #[arg(long, default_value = "")]
    pub postal_code: String,

    #[arg(long, default_value = "")]
    pub country: String,

    #[arg(long, default_value = "")]
    pub phone_number: String,

    /// `later` (buy now, pay later) or `now`
    #[arg(long, default_value = "later")]
    pub method: PaymentMethod,
}

impl From<CheckoutArgs> for CheckoutRequest {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            address: ShippingAddress {
                name: args.name,
                address_line1: args.address_line1,
                address_line2: args.address_line2,
                city: args.city,
                state: args.state,
                postal_code: args.postal_code,
                country: args.country,
                phone_number: args.phone_number,
            },
            method: args.method,
        }
    }
}

/// Verify identity documents.
pub async fn kyc(
    storefront: &Storefront,
    government_id: Option<PathBuf>,
    selfie: Option<PathBuf>,
) -> Result<(), CliError> {
    let documents = KycDocuments {
        government_id,
        selfie,
    };
    storefront.checkout().verify_kyc(&documents).await?;
    Ok(())
}

/// Pay for the cart and print the confirmation.
pub async fn checkout(storefront: &mut Storefront, args: CheckoutArgs) -> Result<(), CliError> {
    let request = CheckoutRequest::from(args);
    let confirmation = storefront.place_order(&request).await?;

    tracing::info!("Transaction: {}", confirmation.transaction_hash);
    tracing::info!("Wallet: {}", confirmation.wallet_address);
    tracing::info!("Payment method: {:?}", confirmation.payment_method);
    tracing::info!("{}", confirmation.summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CheckoutArgs,
    }

    #[test]
    fn test_blank_fields_reach_the_request() {
        let Ok(wrapper) = Wrapper::try_parse_from(["checkout", "--name", "Ada", "--method", "now"])
        else {
            panic!("arguments did not parse");
        };
        let request = CheckoutRequest::from(wrapper.args);

        assert_eq!(request.method, PaymentMethod::PayNow);
        assert_eq!(request.address.name, "Ada");
        assert_eq!(
            request.address.missing_fields(),
            vec!["addressLine1", "city", "state", "postalCode", "country", "phoneNumber"]
        );
    }

    #[test]
    fn test_method_defaults_to_pay_later() {
        let Ok(wrapper) = Wrapper::try_parse_from(["checkout"]) else {
            panic!("arguments did not parse");
        };
        assert_eq!(wrapper.args.method, PaymentMethod::PayLater);
    }
}
