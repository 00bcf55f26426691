//! Checkout: shipping details, wallet gate, payment and transaction record.
//!
//! Payment and KYC are stubs behind [`PaymentGateway`] and [`KycVerifier`];
//! the simulated implementations only wait and succeed, so a real provider
//! can be swapped in without touching [`CheckoutService`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use solsplit_core::{
    Email, OrderSummary, PaymentMethod, ShippingAddress, TransactionId, TransactionRecord,
    WalletAddress,
};
use thiserror::Error;
use tracing::{info, instrument};

use crate::api::{ApiClient, ApiError};
use crate::error::{StorefrontError, add_breadcrumb};
use crate::notify::{Notice, Notifier};
use crate::services::cart::{CartRemote, CartSync};
use crate::services::wallet::{EligibilityChecker, WalletIndexer, WalletProvider};
use crate::session::Identity;

/// Prefix of simulated transaction hashes.
pub const SIMULATED_TX_PREFIX: &str = "SimulatedTx";

/// Number of random base-36 characters after the prefix.
const SIMULATED_TX_SUFFIX_LEN: usize = 13;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The payment was declined.
    #[error("payment declined: {0}")]
    Declined(String),
}

/// Errors from identity verification.
#[derive(Debug, Error)]
pub enum KycError {
    /// One or both documents were not provided.
    #[error("Please upload both your ID and selfie.")]
    MissingDocuments,

    /// A document could not be read.
    #[error("could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Payment
// =============================================================================

/// What the gateway is asked to charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub email: Email,
    pub wallet_address: WalletAddress,
}

/// Confirms payments and returns their transaction hash.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn pay(&self, request: &PaymentRequest) -> Result<TransactionId, PaymentError>;
}

/// Gateway that waits a fixed delay and invents a transaction hash.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedGateway {
    delay: Duration,
}

impl SimulatedGateway {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    #[instrument(skip(self, request), fields(method = %request.method, amount = %request.amount))]
    async fn pay(&self, request: &PaymentRequest) -> Result<TransactionId, PaymentError> {
        tokio::time::sleep(self.delay).await;
        Ok(simulated_transaction_id())
    }
}

/// `SimulatedTx` followed by 13 random base-36 characters.
fn simulated_transaction_id() -> TransactionId {
    let mut rng = rand::rng();
    let suffix: String = (0..SIMULATED_TX_SUFFIX_LEN)
        .filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
        .collect();
    TransactionId::new(format!("{SIMULATED_TX_PREFIX}{suffix}"))
}

// =============================================================================
// KYC
// =============================================================================

/// Identity documents supplied for KYC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KycDocuments {
    pub government_id: Option<PathBuf>,
    pub selfie: Option<PathBuf>,
}

/// Verifies a customer's identity documents.
#[async_trait]
pub trait KycVerifier: Send + Sync {
    async fn verify(&self, documents: &KycDocuments) -> Result<(), KycError>;
}

/// Verifier that checks both files exist and waits a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedKyc {
    delay: Duration,
}

impl SimulatedKyc {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl KycVerifier for SimulatedKyc {
    #[instrument(skip(self))]
    async fn verify(&self, documents: &KycDocuments) -> Result<(), KycError> {
        let (Some(government_id), Some(selfie)) = (&documents.government_id, &documents.selfie)
        else {
            return Err(KycError::MissingDocuments);
        };

        for path in [government_id, selfie] {
            tokio::fs::metadata(path)
                .await
                .map_err(|source| KycError::Unreadable {
                    path: path.clone(),
                    source,
                })?;
        }

        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

// =============================================================================
// Transaction sink
// =============================================================================

/// Write-once store for completed transactions.
#[async_trait]
pub trait TransactionSink: Send + Sync {
    async fn submit(&self, record: &TransactionRecord, identity: &Identity) -> Result<(), ApiError>;
}

#[async_trait]
impl TransactionSink for ApiClient {
    async fn submit(
        &self,
        record: &TransactionRecord,
        identity: &Identity,
    ) -> Result<(), ApiError> {
        self.submit_transaction(record, &identity.token).await
    }
}

// =============================================================================
// CheckoutService
// =============================================================================

/// Details entered on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub address: ShippingAddress,
    pub method: PaymentMethod,
}

/// Result of a successful order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub transaction_hash: TransactionId,
    pub payment_method: PaymentMethod,
    pub wallet_address: WalletAddress,
    pub summary: OrderSummary,
}

/// Places orders for the cart's identity.
pub struct CheckoutService {
    wallet: Arc<dyn WalletProvider>,
    eligibility: EligibilityChecker<Arc<dyn WalletIndexer>>,
    gateway: Arc<dyn PaymentGateway>,
    kyc: Arc<dyn KycVerifier>,
    sink: Arc<dyn TransactionSink>,
    notifier: Arc<dyn Notifier>,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        indexer: Arc<dyn WalletIndexer>,
        gateway: Arc<dyn PaymentGateway>,
        kyc: Arc<dyn KycVerifier>,
        sink: Arc<dyn TransactionSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            wallet,
            eligibility: EligibilityChecker::new(indexer),
            gateway,
            kyc,
            sink,
            notifier,
        }
    }

    #[must_use]
    pub const fn eligibility(&self) -> &EligibilityChecker<Arc<dyn WalletIndexer>> {
        &self.eligibility
    }

    /// Connect the wallet.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotInstalled` when no wallet is available.
    pub async fn connect_wallet(&self) -> Result<WalletAddress, StorefrontError> {
        let address = self.wallet.connect().await?;
        self.notifier.notify(Notice::info(
            "Wallet Connected",
            "Your wallet has been connected successfully.",
        ));
        Ok(address)
    }

    /// Verify identity documents.
    ///
    /// KYC is offered at checkout but does not gate any payment method.
    ///
    /// # Errors
    ///
    /// Returns `Kyc` if a document is missing or unreadable.
    pub async fn verify_kyc(&self, documents: &KycDocuments) -> Result<(), StorefrontError> {
        self.kyc.verify(documents).await?;
        add_breadcrumb("checkout", "KYC completed", None);
        self.notifier.notify(Notice::info(
            "KYC Completed",
            "Your identity has been verified successfully.",
        ));
        Ok(())
    }

    /// Pay for the cart and record the transaction.
    ///
    /// The record carries the first line's product id and the total
    /// including tax. On success the cart is cleared.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` without an identity, `Validation` for
    /// an empty cart or incomplete address, wallet errors when the wallet is
    /// missing or (for pay-later) not eligible, and payment or API errors.
    #[instrument(skip_all, fields(method = %request.method))]
    pub async fn place_order<R: CartRemote>(
        &self,
        cart: &mut CartSync<R>,
        request: &CheckoutRequest,
    ) -> Result<OrderConfirmation, StorefrontError> {
        let identity = cart
            .identity()
            .cloned()
            .ok_or(StorefrontError::AuthenticationRequired)?;

        let Some(first_line) = cart.ledger().lines().first() else {
            return Err(StorefrontError::Validation("Your cart is empty.".to_string()));
        };
        let product_id = first_line.product.id.clone();

        let missing = request.address.missing_fields();
        if !missing.is_empty() {
            return Err(StorefrontError::Validation(format!(
                "Please fill in all required fields ({}).",
                missing.join(", ")
            )));
        }

        let wallet_address = self.connect_wallet().await?;
        if request.method == PaymentMethod::PayLater {
            self.eligibility.check(&wallet_address).await.into_eligible()?;
        }

        let summary = OrderSummary::for_cart(cart.ledger());
        let payment = PaymentRequest {
            method: request.method,
            amount: summary.total,
            email: identity.email.clone(),
            wallet_address: wallet_address.clone(),
        };
        let transaction_hash = self.gateway.pay(&payment).await?;

        let record = TransactionRecord {
            transaction_hash: transaction_hash.clone(),
            wallet_address: wallet_address.to_string(),
            email: identity.email.to_string(),
            product_id,
            amount: summary.total,
            date: Utc::now(),
        };
        self.sink.submit(&record, &identity).await?;

        cart.clear().await?;

        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("transaction_hash", transaction_hash.as_str())]),
        );
        info!(transaction_hash = %transaction_hash, total = %summary.total, "Order placed");
        self.notifier.notify(Notice::info(
            "Order Placed",
            format!("Transaction {transaction_hash} confirmed."),
        ));

        Ok(OrderConfirmation {
            transaction_hash,
            payment_method: request.method,
            wallet_address,
            summary,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration as ChronoDuration};
    use solsplit_core::{CartLine, Price, Product, ProductId};

    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::services::wallet::{ConfiguredWallet, IndexerError};

    const ADDRESS: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    struct StaticCart(Vec<CartLine>);

    #[async_trait]
    impl CartRemote for StaticCart {
        async fn fetch(&self, _: &Identity) -> Result<Vec<CartLine>, ApiError> {
            Ok(self.0.clone())
        }
        async fn add(&self, _: &Identity, _: &ProductId, _: u32) -> Result<(), ApiError> {
            Ok(())
        }
        async fn update(&self, _: &Identity, _: &ProductId, _: u32) -> Result<(), ApiError> {
            Ok(())
        }
        async fn remove(&self, _: &Identity, _: &ProductId) -> Result<(), ApiError> {
            Ok(())
        }
        async fn clear(&self, _: &Identity) -> Result<(), ApiError> {
            Ok(())
        }
    }

    struct History {
        age_days: i64,
        count: usize,
    }

    #[async_trait]
    impl WalletIndexer for History {
        async fn transaction_times(
            &self,
            _: &WalletAddress,
        ) -> Result<Vec<DateTime<Utc>>, IndexerError> {
            let oldest = Utc::now() - ChronoDuration::days(self.age_days);
            Ok(vec![oldest; self.count])
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<TransactionRecord>>);

    #[async_trait]
    impl TransactionSink for RecordingSink {
        async fn submit(&self, record: &TransactionRecord, _: &Identity) -> Result<(), ApiError> {
            self.0.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn line(id: &str, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product: Product {
                id: ProductId::new(id),
                product_name: format!("Product {id}"),
                description: String::new(),
                price: Price::new(Decimal::from(price)),
                image_data: String::new(),
                product_type: String::new(),
                available: true,
                stock_quantity: None,
            },
            quantity,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Ada".to_string(),
            address_line1: "1 Main St".to_string(),
            address_line2: None,
            city: "Stockholm".to_string(),
            state: "AB".to_string(),
            postal_code: "111 22".to_string(),
            country: "SE".to_string(),
            phone_number: "+46700000000".to_string(),
        }
    }

    struct Harness {
        service: CheckoutService,
        sink: Arc<RecordingSink>,
        notifier: RecordingNotifier,
    }

    fn harness(wallet: Option<&str>, history: History) -> Harness {
        let sink = Arc::new(RecordingSink::default());
        let notifier = RecordingNotifier::new();
        let service = CheckoutService::new(
            Arc::new(ConfiguredWallet::new(
                wallet.map(|a| WalletAddress::parse(a).unwrap()),
            )),
            Arc::new(history),
            Arc::new(SimulatedGateway::new(Duration::ZERO)),
            Arc::new(SimulatedKyc::new(Duration::ZERO)),
            Arc::clone(&sink) as Arc<dyn TransactionSink>,
            Arc::new(notifier.clone()),
        );
        Harness {
            service,
            sink,
            notifier,
        }
    }

    async fn cart(lines: Vec<CartLine>) -> CartSync<StaticCart> {
        let mut cart = CartSync::new(StaticCart(lines), Arc::new(RecordingNotifier::new()));
        cart.attach(Identity::new(Email::parse("a@b.com").unwrap(), "t1", None))
            .await
            .unwrap();
        cart
    }

    fn eligible() -> History {
        History {
            age_days: 120,
            count: 10,
        }
    }

    #[tokio::test]
    async fn test_pay_later_order() {
        let h = harness(Some(ADDRESS), eligible());
        let mut cart = cart(vec![line("p1", 10, 2), line("p2", 5, 3)]).await;

        let confirmation = h
            .service
            .place_order(
                &mut cart,
                &CheckoutRequest {
                    address: address(),
                    method: PaymentMethod::PayLater,
                },
            )
            .await
            .unwrap();

        assert!(confirmation.transaction_hash.as_str().starts_with(SIMULATED_TX_PREFIX));
        assert_eq!(confirmation.summary.total, Decimal::new(385, 1));
        assert!(cart.ledger().is_empty());

        let records = h.sink.0.lock().unwrap().clone();
        assert_eq!(records.len(), 1);
        let record = records.first().unwrap();
        assert_eq!(record.product_id.as_str(), "p1");
        assert_eq!(record.amount, Decimal::new(385, 1));
        assert_eq!(record.wallet_address, ADDRESS);
        assert_eq!(record.email, "a@b.com");
        assert_eq!(
            h.notifier.titles(),
            vec!["Wallet Connected", "Order Placed"]
        );
    }

    #[tokio::test]
    async fn test_pay_later_requires_eligible_wallet() {
        let h = harness(
            Some(ADDRESS),
            History {
                age_days: 2,
                count: 1,
            },
        );
        let mut cart = cart(vec![line("p1", 10, 1)]).await;

        let err = h
            .service
            .place_order(
                &mut cart,
                &CheckoutRequest {
                    address: address(),
                    method: PaymentMethod::PayLater,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorefrontError::WalletIneligible { .. }));
        assert_eq!(cart.ledger().len(), 1);
        assert!(h.sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pay_now_skips_eligibility() {
        let h = harness(
            Some(ADDRESS),
            History {
                age_days: 0,
                count: 0,
            },
        );
        let mut cart = cart(vec![line("p1", 10, 1)]).await;

        let confirmation = h
            .service
            .place_order(
                &mut cart,
                &CheckoutRequest {
                    address: address(),
                    method: PaymentMethod::PayNow,
                },
            )
            .await
            .unwrap();
        assert_eq!(confirmation.payment_method, PaymentMethod::PayNow);
    }

    #[tokio::test]
    async fn test_missing_wallet() {
        let h = harness(None, eligible());
        let mut cart = cart(vec![line("p1", 10, 1)]).await;

        let err = h
            .service
            .place_order(
                &mut cart,
                &CheckoutRequest {
                    address: address(),
                    method: PaymentMethod::PayNow,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::WalletNotInstalled));
    }

    #[tokio::test]
    async fn test_incomplete_address_is_rejected() {
        let h = harness(Some(ADDRESS), eligible());
        let mut cart = cart(vec![line("p1", 10, 1)]).await;
        let mut incomplete = address();
        incomplete.city = "  ".to_string();

        let err = h
            .service
            .place_order(
                &mut cart,
                &CheckoutRequest {
                    address: incomplete,
                    method: PaymentMethod::PayNow,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(msg) if msg.contains("city")));
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let h = harness(Some(ADDRESS), eligible());
        let mut cart = cart(vec![]).await;

        let err = h
            .service
            .place_order(&mut cart, &CheckoutRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
    }

    #[tokio::test]
    async fn test_kyc_requires_both_documents() {
        let kyc = SimulatedKyc::new(Duration::ZERO);
        let err = kyc
            .verify(&KycDocuments {
                government_id: Some(PathBuf::from("id.png")),
                selfie: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, KycError::MissingDocuments));
    }

    #[tokio::test]
    async fn test_kyc_rejects_unreadable_document() {
        let kyc = SimulatedKyc::new(Duration::ZERO);
        let err = kyc
            .verify(&KycDocuments {
                government_id: Some(PathBuf::from("/nonexistent/solsplit/id.png")),
                selfie: Some(PathBuf::from("/nonexistent/solsplit/selfie.png")),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, KycError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_kyc_accepts_existing_files() {
        let dir = std::env::temp_dir().join(format!("solsplit-kyc-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let id = dir.join("id.png");
        let selfie = dir.join("selfie.png");
        std::fs::write(&id, b"id").unwrap();
        std::fs::write(&selfie, b"selfie").unwrap();

        let h = harness(Some(ADDRESS), eligible());
        h.service
            .verify_kyc(&KycDocuments {
                government_id: Some(id),
                selfie: Some(selfie),
            })
            .await
            .unwrap();
        assert_eq!(h.notifier.titles(), vec!["KYC Completed"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_simulated_transaction_id_shape() {
        let id = simulated_transaction_id();
        let suffix = id.as_str().strip_prefix(SIMULATED_TX_PREFIX).unwrap();
        assert_eq!(suffix.len(), SIMULATED_TX_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}
