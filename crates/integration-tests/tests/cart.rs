//! Integration tests for the synced cart.
//!
//! The backend cart must track every local change, and a failed remote
//! update must leave the local cart matching whatever the backend holds.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use secrecy::SecretString;
use solsplit_core::{AddOutcome, ProductId, QuantityOutcome};
use solsplit_integration_tests::{MockBackend, PASSWORD, TestStorefront, product};
use solsplit_storefront::RecordingNotifier;
use solsplit_storefront::session::MemoryStore;

const EMAIL: &str = "grace@example.com";

async fn logged_in(backend: &MockBackend, notifier: &RecordingNotifier) -> TestStorefront {
    backend.seed_customer(EMAIL);
    backend.seed_product(product("mug", "Blue Mug", 1250, Some(3)));
    backend.seed_product(product("lamp", "Desk Lamp", 4000, None));
    backend.seed_product(product("gone", "Sold Out Tee", 1500, Some(0)));

    let mut storefront = backend
        .storefront(Arc::new(MemoryStore::new()), notifier)
        .unwrap();
    storefront.login(EMAIL, SecretString::from(PASSWORD)).await.unwrap();
    storefront
}

fn remote_quantity(backend: &MockBackend, id: &str) -> Option<u32> {
    backend
        .cart(EMAIL)
        .into_iter()
        .find(|line| line.product.id.as_str() == id)
        .map(|line| line.quantity)
}

// =============================================================================
// Adding
// =============================================================================

#[tokio::test]
async fn test_repeated_adds_send_deltas() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;
    let mug = ProductId::new("mug");

    storefront.add_to_cart(&mug, 1).await.unwrap();
    storefront.add_to_cart(&mug, 1).await.unwrap();

    assert_eq!(storefront.cart().ledger().get(&mug).unwrap().quantity, 2);
    assert_eq!(remote_quantity(&backend, "mug"), Some(2));
    assert_eq!(backend.request_count("GET", "/api/cart/addCart"), 2);
}

#[tokio::test]
async fn test_add_is_capped_at_stock() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;
    let mug = ProductId::new("mug");

    storefront.add_to_cart(&mug, 2).await.unwrap();
    let outcome = storefront.add_to_cart(&mug, 5).await.unwrap();

    assert_eq!(
        outcome,
        AddOutcome::Capped {
            quantity: 3,
            requested: 5,
            stock: 3
        }
    );
    assert_eq!(remote_quantity(&backend, "mug"), Some(3));

    let last = notifier.last().unwrap();
    assert_eq!(last.title, "Stock Limit Reached");
    assert_eq!(last.description, "Sorry, only 3 units available.");

    // Already full: nothing is sent.
    let outcome = storefront.add_to_cart(&mug, 1).await.unwrap();
    assert_eq!(outcome, AddOutcome::LimitReached { stock: 3 });
    assert_eq!(backend.request_count("GET", "/api/cart/addCart"), 2);
}

#[tokio::test]
async fn test_out_of_stock_is_not_added() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;

    let outcome = storefront.add_to_cart(&"gone".into(), 1).await.unwrap();

    assert_eq!(outcome, AddOutcome::OutOfStock);
    assert!(storefront.cart().ledger().is_empty());
    assert_eq!(backend.request_count("GET", "/api/cart/addCart"), 0);
    assert_eq!(notifier.last().unwrap().title, "Out of Stock");
}

// =============================================================================
// Quantities
// =============================================================================

#[tokio::test]
async fn test_quantity_changes_reach_backend() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;
    let lamp = ProductId::new("lamp");

    storefront.add_to_cart(&lamp, 1).await.unwrap();
    storefront.set_quantity(&lamp, 4).await.unwrap();
    assert_eq!(remote_quantity(&backend, "lamp"), Some(4));

    storefront.cart_mut().increment(&lamp).await.unwrap();
    storefront.cart_mut().decrement(&lamp).await.unwrap();
    storefront.cart_mut().decrement(&lamp).await.unwrap();
    assert_eq!(remote_quantity(&backend, "lamp"), Some(3));

    let outcome = storefront.set_quantity(&lamp, 0).await.unwrap();
    assert_eq!(outcome, QuantityOutcome::Removed);
    assert_eq!(remote_quantity(&backend, "lamp"), None);
}

#[tokio::test]
async fn test_set_above_stock_sends_clamped_value() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;
    let mug = ProductId::new("mug");

    storefront.add_to_cart(&mug, 1).await.unwrap();
    let outcome = storefront.set_quantity(&mug, 10).await.unwrap();

    assert_eq!(
        outcome,
        QuantityOutcome::Clamped {
            quantity: 3,
            requested: 10,
            stock: 3
        }
    );
    assert_eq!(remote_quantity(&backend, "mug"), Some(3));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;

    storefront.add_to_cart(&"mug".into(), 1).await.unwrap();
    storefront.add_to_cart(&"lamp".into(), 2).await.unwrap();

    storefront.cart_mut().remove(&"mug".into()).await.unwrap();
    assert_eq!(remote_quantity(&backend, "mug"), None);
    assert_eq!(remote_quantity(&backend, "lamp"), Some(2));

    storefront.cart_mut().clear().await.unwrap();
    assert!(storefront.cart().ledger().is_empty());
    assert!(backend.cart(EMAIL).is_empty());
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_failed_update_reconciles_with_backend() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;
    let lamp = ProductId::new("lamp");

    storefront.add_to_cart(&lamp, 2).await.unwrap();
    backend.fail("PUT", "/api/cart/update");

    storefront.set_quantity(&lamp, 7).await.unwrap();

    // The backend kept 2, so the local cart went back to 2.
    assert_eq!(storefront.cart().ledger().get(&lamp).unwrap().quantity, 2);
    assert_eq!(remote_quantity(&backend, "lamp"), Some(2));

    backend.recover("PUT", "/api/cart/update");
    storefront.set_quantity(&lamp, 7).await.unwrap();
    assert_eq!(remote_quantity(&backend, "lamp"), Some(7));
}

#[tokio::test]
async fn test_failed_add_with_unreachable_cart_keeps_local_change() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;

    backend.fail("GET", "/api/cart/addCart");
    backend.fail("GET", "/api/cart/");
    storefront.add_to_cart(&"lamp".into(), 1).await.unwrap();

    assert_eq!(storefront.cart().ledger().count(), 1);
    assert!(backend.cart(EMAIL).is_empty());
}

#[tokio::test]
async fn test_refresh_picks_up_changes_from_elsewhere() {
    let backend = MockBackend::start().await.unwrap();
    let notifier = RecordingNotifier::new();
    let mut storefront = logged_in(&backend, &notifier).await;

    storefront.add_to_cart(&"mug".into(), 1).await.unwrap();
    backend
        .state()
        .carts
        .get_mut(EMAIL)
        .unwrap()
        .iter_mut()
        .for_each(|line| line.quantity = 2);

    storefront.cart_mut().refresh().await.unwrap();
    assert_eq!(storefront.cart().ledger().count(), 2);
}
