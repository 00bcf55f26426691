//! Integration tests for the admin console.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use solsplit_core::{PaymentMethod, ProductId};
use solsplit_integration_tests::{MockBackend, PASSWORD, TestStorefront, product};
use solsplit_storefront::api::{ApiError, ProductImage};
use solsplit_storefront::services::admin::{NewProductForm, ProductUpdateForm};
use solsplit_storefront::services::catalog::decode_image;
use solsplit_storefront::services::checkout::CheckoutRequest;
use solsplit_storefront::session::MemoryStore;
use solsplit_storefront::{RecordingNotifier, StorefrontError};

const ADMIN: &str = "admin@example.com";
const CUSTOMER: &str = "customer@example.com";

async fn login_as(
    backend: &MockBackend,
    email: &str,
    notifier: &RecordingNotifier,
) -> TestStorefront {
    let mut storefront = backend
        .storefront(Arc::new(MemoryStore::new()), notifier)
        .unwrap();
    storefront.login(email, SecretString::from(PASSWORD)).await.unwrap();
    storefront
}

async fn backend() -> MockBackend {
    let backend = MockBackend::start().await.unwrap();
    backend.seed_admin(ADMIN);
    backend.seed_customer(CUSTOMER);
    backend.seed_product(product("mug", "Blue Mug", 1250, Some(4)));
    backend
}

fn new_product_form() -> NewProductForm {
    NewProductForm {
        product_name: "Tote Bag".to_string(),
        description: "Canvas tote".to_string(),
        price: "18.00".to_string(),
        product_type: "bags".to_string(),
        available: true,
        stock_quantity: Some(7),
        image: Some(ProductImage {
            file_name: "tote.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"tote-image".to_vec(),
        }),
    }
}

// =============================================================================
// Access
// =============================================================================

#[tokio::test]
async fn test_customer_is_denied() {
    let backend = backend().await;
    let storefront = login_as(&backend, CUSTOMER, &RecordingNotifier::new()).await;

    let err = storefront
        .admin()
        .list_products(storefront.identity())
        .await
        .unwrap_err();

    assert!(matches!(err, StorefrontError::NotAuthorized));
    assert_eq!(err.notice().title, "Access Denied");
    assert_eq!(backend.request_count("GET", "/api/admin/"), 0);
}

#[tokio::test]
async fn test_logged_out_is_asked_to_log_in() {
    let backend = backend().await;
    let storefront = backend
        .storefront(Arc::new(MemoryStore::new()), &RecordingNotifier::new())
        .unwrap();

    let err = storefront.admin().list_transactions(None).await.unwrap_err();
    assert!(matches!(err, StorefrontError::AuthenticationRequired));
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_add_product_appears_in_catalog() {
    let backend = backend().await;
    let notifier = RecordingNotifier::new();
    let storefront = login_as(&backend, ADMIN, &notifier).await;

    // Warm the cache so the add has something to invalidate.
    assert_eq!(storefront.catalog().browse(None).await.unwrap().len(), 1);

    storefront
        .admin()
        .add_product(storefront.identity(), new_product_form())
        .await
        .unwrap();
    assert_eq!(notifier.last().unwrap().description, "Product has been added successfully.");

    let listing = storefront.catalog().browse(Some("tote")).await.unwrap();
    let tote = listing.first().unwrap();
    assert_eq!(tote.price.amount(), Decimal::new(18, 0));
    assert_eq!(tote.stock_quantity, Some(7));
    assert_eq!(decode_image(tote).unwrap(), b"tote-image");
}

#[tokio::test]
async fn test_add_product_without_image_is_rejected_locally() {
    let backend = backend().await;
    let storefront = login_as(&backend, ADMIN, &RecordingNotifier::new()).await;

    let mut form = new_product_form();
    form.image = None;
    let err = storefront
        .admin()
        .add_product(storefront.identity(), form)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorefrontError::Validation(ref m) if m == "Please select an image for the product."
    ));
    assert_eq!(backend.request_count("POST", "/api/admin/addProduct"), 0);
}

#[tokio::test]
async fn test_update_product() {
    let backend = backend().await;
    let storefront = login_as(&backend, ADMIN, &RecordingNotifier::new()).await;

    let form = ProductUpdateForm {
        id: "mug".to_string(),
        price: "9.50".to_string(),
        stock_quantity: Some(12),
        available: true,
        ..ProductUpdateForm::default()
    };
    storefront
        .admin()
        .update_product(storefront.identity(), form)
        .await
        .unwrap();

    let products = storefront
        .admin()
        .list_products(storefront.identity())
        .await
        .unwrap();
    let mug = products.iter().find(|p| p.id == ProductId::new("mug")).unwrap();
    assert_eq!(mug.price.amount(), Decimal::new(950, 2));
    assert_eq!(mug.stock_quantity, Some(12));
    assert_eq!(mug.product_name, "Blue Mug");
}

#[tokio::test]
async fn test_update_unknown_product_is_not_found() {
    let backend = backend().await;
    let storefront = login_as(&backend, ADMIN, &RecordingNotifier::new()).await;

    let form = ProductUpdateForm {
        id: "ghost".to_string(),
        product_name: "Ghost".to_string(),
        ..ProductUpdateForm::default()
    };
    let err = storefront
        .admin()
        .update_product(storefront.identity(), form)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorefrontError::Api(ApiError::Status {
            status: 404,
            ref message,
        }) if message == "Product not found"
    ));
}

#[tokio::test]
async fn test_hiding_a_product_removes_it_from_catalog() {
    let backend = backend().await;
    let storefront = login_as(&backend, ADMIN, &RecordingNotifier::new()).await;
    assert_eq!(storefront.catalog().browse(None).await.unwrap().len(), 1);

    let form = ProductUpdateForm {
        id: "mug".to_string(),
        description: "Now discontinued".to_string(),
        available: false,
        ..ProductUpdateForm::default()
    };
    storefront
        .admin()
        .update_product(storefront.identity(), form)
        .await
        .unwrap();

    assert!(storefront.catalog().browse(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_product() {
    let backend = backend().await;
    let storefront = login_as(&backend, ADMIN, &RecordingNotifier::new()).await;

    storefront
        .admin()
        .remove_product(storefront.identity(), "mug")
        .await
        .unwrap();
    assert!(backend.state().products.is_empty());

    let err = storefront
        .admin()
        .remove_product(storefront.identity(), "mug")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorefrontError::Api(ApiError::Status { status: 404, .. })
    ));
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_transactions_list_completed_orders() {
    let backend = backend().await;

    let mut customer = login_as(&backend, CUSTOMER, &RecordingNotifier::new()).await;
    customer.add_to_cart(&"mug".into(), 2).await.unwrap();
    let mut request = CheckoutRequest {
        method: PaymentMethod::PayNow,
        ..CheckoutRequest::default()
    };
    request.address.name = "Customer".to_string();
    request.address.address_line1 = "2 Side St".to_string();
    request.address.city = "Shelbyville".to_string();
    request.address.state = "IL".to_string();
    request.address.postal_code = "62565".to_string();
    request.address.country = "US".to_string();
    request.address.phone_number = "5559876".to_string();
    let confirmation = customer.place_order(&request).await.unwrap();

    let admin = login_as(&backend, ADMIN, &RecordingNotifier::new()).await;
    let transactions = admin
        .admin()
        .list_transactions(admin.identity())
        .await
        .unwrap();

    assert_eq!(transactions.len(), 1);
    let tx = transactions.first().unwrap();
    assert_eq!(tx.trans_id, confirmation.transaction_hash.as_str());
    assert_eq!(tx.email, CUSTOMER);
    assert_eq!(tx.product_id, "mug");
    assert_eq!(tx.amount, Decimal::new(2750, 2));
    assert!(chrono::DateTime::parse_from_rfc3339(&tx.trans_date).is_ok());
}
