//! Local-first cart mirrored to the backend.
//!
//! Every mutation is applied to the in-memory [`CartLedger`] first and then
//! sent to the remote cart. When the remote call fails, the remote cart is
//! fetched again and replaces the local ledger wholesale; the optimistic
//! change may be lost. Remote calls are not queued, so a later mutation can
//! race an earlier one that is still in flight.

use std::sync::Arc;

use async_trait::async_trait;
use solsplit_core::{AddOutcome, CartLedger, CartLine, Product, ProductId, QuantityOutcome};
use tracing::{debug, instrument, warn};

use crate::api::{ApiClient, ApiError, CartApiItem};
use crate::error::{StorefrontError, add_breadcrumb};
use crate::notify::{Notice, Notifier};
use crate::session::Identity;

/// Remote cart store keyed by the customer identity.
#[async_trait]
pub trait CartRemote: Send + Sync {
    /// Current remote cart.
    async fn fetch(&self, identity: &Identity) -> Result<Vec<CartLine>, ApiError>;

    /// Add `quantity` units of a product.
    async fn add(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Overwrite the quantity of a line.
    async fn update(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Delete a line.
    async fn remove(&self, identity: &Identity, product_id: &ProductId) -> Result<(), ApiError>;

    /// Delete every line.
    async fn clear(&self, identity: &Identity) -> Result<(), ApiError>;
}

#[async_trait]
impl CartRemote for ApiClient {
    async fn fetch(&self, identity: &Identity) -> Result<Vec<CartLine>, ApiError> {
        self.fetch_cart(identity.email.as_str(), &identity.token).await
    }

    async fn add(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let item = CartApiItem {
            product_id: product_id.clone(),
            quantity,
            email: identity.email.to_string(),
        };
        self.add_to_cart(&item, &identity.token).await
    }

    async fn update(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let item = CartApiItem {
            product_id: product_id.clone(),
            quantity,
            email: identity.email.to_string(),
        };
        self.update_cart_item(&item, &identity.token).await
    }

    async fn remove(&self, identity: &Identity, product_id: &ProductId) -> Result<(), ApiError> {
        self.remove_from_cart(identity.email.as_str(), product_id, &identity.token)
            .await
    }

    async fn clear(&self, identity: &Identity) -> Result<(), ApiError> {
        self.clear_cart(identity.email.as_str(), &identity.token)
            .await
    }
}

#[async_trait]
impl<T: CartRemote + ?Sized> CartRemote for Arc<T> {
    async fn fetch(&self, identity: &Identity) -> Result<Vec<CartLine>, ApiError> {
        (**self).fetch(identity).await
    }

    async fn add(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        (**self).add(identity, product_id, quantity).await
    }

    async fn update(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        (**self).update(identity, product_id, quantity).await
    }

    async fn remove(&self, identity: &Identity, product_id: &ProductId) -> Result<(), ApiError> {
        (**self).remove(identity, product_id).await
    }

    async fn clear(&self, identity: &Identity) -> Result<(), ApiError> {
        (**self).clear(identity).await
    }
}

/// Remote operation issued after a local change.
enum RemoteOp<'a> {
    Add(&'a ProductId, u32),
    Update(&'a ProductId, u32),
    Remove(&'a ProductId),
    Clear,
}

/// Cart ledger kept in step with the remote cart of the attached identity.
pub struct CartSync<R> {
    remote: R,
    ledger: CartLedger,
    identity: Option<Identity>,
    notifier: Arc<dyn Notifier>,
}

impl<R: CartRemote> CartSync<R> {
    #[must_use]
    pub fn new(remote: R, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            remote,
            ledger: CartLedger::new(),
            identity: None,
            notifier,
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &CartLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Start syncing for `identity`; the remote cart replaces the local one.
    ///
    /// # Errors
    ///
    /// Returns error if the remote cart cannot be fetched. The identity stays
    /// attached and the local ledger is left as it was.
    #[instrument(skip(self, identity), fields(email = %identity.email))]
    pub async fn attach(&mut self, identity: Identity) -> Result<(), StorefrontError> {
        self.identity = Some(identity);
        self.refresh().await
    }

    /// Stop syncing and empty the local ledger. The remote cart is kept.
    pub fn detach(&mut self) {
        self.identity = None;
        self.ledger.clear();
    }

    /// Replace the local ledger with the remote cart.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when detached, or the fetch error. A
    /// failed fetch keeps the local ledger.
    pub async fn refresh(&mut self) -> Result<(), StorefrontError> {
        let identity = self.require_identity()?;
        let lines = self.remote.fetch(&identity).await?;
        self.ledger.replace(lines);
        debug!(lines = self.ledger.len(), "Cart refreshed from backend");
        Ok(())
    }

    /// Add `quantity` units of `product`, capped at its stock.
    ///
    /// Only the units that actually went into the ledger are sent to the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when detached.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(
        &mut self,
        product: &Product,
        quantity: u32,
    ) -> Result<AddOutcome, StorefrontError> {
        let identity = self.require_identity()?;

        let before = self.ledger.get(&product.id).map_or(0, |line| line.quantity);
        let outcome = self.ledger.add(product, quantity);

        match outcome {
            AddOutcome::Added { .. } => self.notifier.notify(Notice::info(
                "Added to Cart",
                format!("{} has been added to your cart.", product.product_name),
            )),
            AddOutcome::Capped { stock, .. } | AddOutcome::LimitReached { stock } => {
                self.notify_error(&StorefrontError::StockLimit {
                    product: product.product_name.clone(),
                    available: stock,
                });
            }
            AddOutcome::OutOfStock => self.notify_error(&StorefrontError::OutOfStock {
                product: product.product_name.clone(),
            }),
            AddOutcome::ZeroQuantity => {}
        }

        if let Some(after) = outcome.quantity().filter(|_| outcome.mutated()) {
            add_breadcrumb("cart", "Added product", Some(&[("product_id", product.id.as_str())]));
            let delta = after.saturating_sub(before);
            self.push(&identity, RemoteOp::Add(&product.id, delta)).await;
        }

        Ok(outcome)
    }

    /// Delete the line for `product_id`. Removing an absent line succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when detached.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, product_id: &ProductId) -> Result<(), StorefrontError> {
        let identity = self.require_identity()?;
        self.ledger.remove(product_id);
        add_breadcrumb("cart", "Removed product", Some(&[("product_id", product_id.as_str())]));
        self.push(&identity, RemoteOp::Remove(product_id)).await;
        Ok(())
    }

    /// Set the quantity of an existing line.
    ///
    /// Zero or less removes the line. Requests above stock are clamped and
    /// the clamped value is sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when detached.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<QuantityOutcome, StorefrontError> {
        let identity = self.require_identity()?;

        let name = self
            .ledger
            .get(product_id)
            .map(|line| line.product.product_name.clone());
        let outcome = self.ledger.set_quantity(product_id, quantity);

        let op = match outcome {
            QuantityOutcome::Set { quantity } => Some(RemoteOp::Update(product_id, quantity)),
            QuantityOutcome::Clamped { quantity, stock, .. } => {
                self.notify_error(&StorefrontError::StockLimit {
                    product: name.unwrap_or_default(),
                    available: stock,
                });
                Some(if quantity == 0 {
                    RemoteOp::Remove(product_id)
                } else {
                    RemoteOp::Update(product_id, quantity)
                })
            }
            QuantityOutcome::Removed => Some(RemoteOp::Remove(product_id)),
            QuantityOutcome::Missing => None,
        };

        if let Some(op) = op {
            add_breadcrumb(
                "cart",
                "Changed quantity",
                Some(&[("product_id", product_id.as_str())]),
            );
            self.push(&identity, op).await;
        }

        Ok(outcome)
    }

    /// Raise the line quantity by one.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when detached.
    pub async fn increment(
        &mut self,
        product_id: &ProductId,
    ) -> Result<QuantityOutcome, StorefrontError> {
        self.step(product_id, 1).await
    }

    /// Lower the line quantity by one; a line at one is removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when detached.
    pub async fn decrement(
        &mut self,
        product_id: &ProductId,
    ) -> Result<QuantityOutcome, StorefrontError> {
        self.step(product_id, -1).await
    }

    async fn step(
        &mut self,
        product_id: &ProductId,
        delta: i64,
    ) -> Result<QuantityOutcome, StorefrontError> {
        self.require_identity()?;
        match self.ledger.get(product_id) {
            Some(line) => {
                let target = i64::from(line.quantity) + delta;
                self.set_quantity(product_id, target).await
            }
            None => Ok(QuantityOutcome::Missing),
        }
    }

    /// Empty the cart locally and remotely.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired` when detached.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<(), StorefrontError> {
        let identity = self.require_identity()?;
        self.ledger.clear();
        add_breadcrumb("cart", "Cleared cart", None);
        self.push(&identity, RemoteOp::Clear).await;
        Ok(())
    }

    fn require_identity(&self) -> Result<Identity, StorefrontError> {
        self.identity
            .clone()
            .ok_or(StorefrontError::AuthenticationRequired)
    }

    fn notify_error(&self, err: &StorefrontError) {
        self.notifier.notify(err.notice());
    }

    /// Send a local change to the backend, reconciling on failure.
    async fn push(&mut self, identity: &Identity, op: RemoteOp<'_>) {
        let result = match op {
            RemoteOp::Add(id, quantity) => self.remote.add(identity, id, quantity).await,
            RemoteOp::Update(id, quantity) => self.remote.update(identity, id, quantity).await,
            RemoteOp::Remove(id) => self.remote.remove(identity, id).await,
            RemoteOp::Clear => self.remote.clear(identity).await,
        };

        if let Err(err) = result {
            warn!(error = %err, "Remote cart update failed, reconciling");
            let err = StorefrontError::from(err);
            if err.is_server_side() {
                sentry::capture_error(&err);
            }
            self.reconcile(identity).await;
        }
    }

    /// Replace the local ledger with whatever the backend holds.
    async fn reconcile(&mut self, identity: &Identity) {
        match self.remote.fetch(identity).await {
            Ok(lines) => {
                self.ledger.replace(lines);
                debug!(lines = self.ledger.len(), "Cart reconciled with backend");
            }
            Err(err) => {
                warn!(error = %err, "Cart reconciliation failed, keeping local cart");
            }
        }
    }
}
