//! Storefront context shared by every command.
//!
//! Owns the backend client, the session, the synced cart and the checkout
//! service. Nothing is global: callers build one `Storefront` and pass it
//! where it is needed.

use std::sync::Arc;

use secrecy::SecretString;
use solsplit_core::{AddOutcome, ProductId, QuantityOutcome};

use crate::api::ApiClient;
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::notify::Notifier;
use crate::services::admin::AdminService;
use crate::services::auth::{AuthService, SignupForm};
use crate::services::cart::CartSync;
use crate::services::catalog::CatalogService;
use crate::services::checkout::{
    CheckoutRequest, CheckoutService, OrderConfirmation, SimulatedGateway, SimulatedKyc,
};
use crate::services::wallet::{ConfiguredWallet, HeliusIndexer};
use crate::session::{FileStore, Identity, KeyValueStore, SessionHolder};

/// Storefront context.
pub struct Storefront<S = FileStore> {
    config: StorefrontConfig,
    api: ApiClient,
    session: SessionHolder<S>,
    cart: CartSync<ApiClient>,
    checkout: CheckoutService,
    notifier: Arc<dyn Notifier>,
}

impl Storefront<FileStore> {
    /// Create a storefront whose session lives in the configured file.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_config(
        config: StorefrontConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, StorefrontError> {
        let store = FileStore::new(&config.session_path);
        Self::new(config, store, notifier)
    }
}

impl<S: KeyValueStore> Storefront<S> {
    /// Create a storefront with the simulated payment and KYC providers.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(
        config: StorefrontConfig,
        store: S,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, StorefrontError> {
        let api = ApiClient::new(&config)?;
        let checkout = CheckoutService::new(
            Arc::new(ConfiguredWallet::new(config.wallet_address.clone())),
            Arc::new(HeliusIndexer::new(&config.indexer)),
            Arc::new(SimulatedGateway::new(config.simulation.payment_delay)),
            Arc::new(SimulatedKyc::new(config.simulation.kyc_delay)),
            Arc::new(api.clone()),
            Arc::clone(&notifier),
        );

        Ok(Self {
            cart: CartSync::new(api.clone(), Arc::clone(&notifier)),
            session: SessionHolder::new(store),
            config,
            api,
            checkout,
            notifier,
        })
    }

    /// Replace the checkout service (other wallet, indexer or gateway).
    #[must_use]
    pub fn with_checkout(mut self, checkout: CheckoutService) -> Self {
        self.checkout = checkout;
        self
    }

    /// Pick up a saved session and load its cart.
    ///
    /// A cart that cannot be fetched is reported but does not fail the
    /// restore.
    ///
    /// # Errors
    ///
    /// Returns error if the session store cannot be read.
    pub async fn restore(&mut self) -> Result<Option<&Identity>, StorefrontError> {
        let identity = self.session.restore()?.cloned();
        if let Some(identity) = identity {
            crate::error::set_sentry_user(identity.email.as_str());
            if let Err(err) = self.cart.attach(identity).await {
                self.notifier.notify(err.report());
            }
        }
        Ok(self.session.identity())
    }

    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub const fn session(&self) -> &SessionHolder<S> {
        &self.session
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.session.identity()
    }

    #[must_use]
    pub const fn cart(&self) -> &CartSync<ApiClient> {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut CartSync<ApiClient> {
        &mut self.cart
    }

    #[must_use]
    pub const fn checkout(&self) -> &CheckoutService {
        &self.checkout
    }

    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        &*self.notifier
    }

    #[must_use]
    pub const fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(&self.api)
    }

    #[must_use]
    pub fn admin(&self) -> AdminService<'_> {
        AdminService::new(&self.api, &*self.notifier)
    }

    /// Log in and load the customer's cart.
    ///
    /// # Errors
    ///
    /// See [`AuthService::login`].
    pub async fn login(
        &mut self,
        email: &str,
        password: SecretString,
    ) -> Result<Identity, StorefrontError> {
        AuthService::new(&self.api, &*self.notifier)
            .login(&mut self.session, &mut self.cart, email, password)
            .await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// See [`AuthService::signup`].
    pub async fn signup(&self, form: SignupForm) -> Result<(), StorefrontError> {
        AuthService::new(&self.api, &*self.notifier).signup(form).await
    }

    /// Log out and empty the local cart.
    ///
    /// # Errors
    ///
    /// See [`AuthService::logout`].
    pub fn logout(&mut self) -> Result<(), StorefrontError> {
        AuthService::new(&self.api, &*self.notifier).logout(&mut self.session, &mut self.cart)
    }

    /// Add a catalog product to the cart by id.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when logged out, `NotFound` for an
    /// unknown product, or the catalog fetch error.
    pub async fn add_to_cart(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<AddOutcome, StorefrontError> {
        if self.cart.identity().is_none() {
            return Err(StorefrontError::AuthenticationRequired);
        }
        let product = self.catalog().product(product_id).await?;
        self.cart.add(&product, quantity).await
    }

    /// Set a cart line's quantity.
    ///
    /// # Errors
    ///
    /// See [`CartSync::set_quantity`].
    pub async fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<QuantityOutcome, StorefrontError> {
        self.cart.set_quantity(product_id, quantity).await
    }

    /// Pay for the cart.
    ///
    /// # Errors
    ///
    /// See [`CheckoutService::place_order`].
    pub async fn place_order(
        &mut self,
        request: &CheckoutRequest,
    ) -> Result<OrderConfirmation, StorefrontError> {
        self.checkout.place_order(&mut self.cart, request).await
    }
}
