//! Integration tests for SolSplit.
//!
//! [`MockBackend`] serves the storefront REST API and the wallet indexer's
//! history endpoint from memory on an ephemeral local port. Tests seed it,
//! point a [`StorefrontConfig`] at it and drive the real client code.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p solsplit-integration-tests
//! ```
//!
//! # Failure Injection
//!
//! [`MockBackend::fail`] makes one route answer `500` until
//! [`MockBackend::recover`] is called. Every matched request is recorded and
//! can be counted with [`MockBackend::request_count`].

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use solsplit_core::{
    CartLine, Price, Product, ProductId, Role, TransactionRecord, TransactionSummary,
};
use solsplit_storefront::config::ConfigError;
use solsplit_storefront::session::{KeyValueStore, MemoryStore};
use solsplit_storefront::{RecordingNotifier, Storefront, StorefrontConfig};

/// Indexer key the mock accepts.
pub const INDEXER_KEY: &str = "hK9q2Lr7Zp4Vw8Tt3Mn6Bc1Yd5Fg0Js";

/// Wallet address the configured wallet provider connects to.
pub const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

/// Password given to every seeded account.
pub const PASSWORD: &str = "correct horse battery staple";

type Shared = Arc<Mutex<BackendState>>;

/// Storefront with an in-memory session store that can be shared between
/// instances.
pub type TestStorefront = Storefront<Arc<MemoryStore>>;

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    pub role: Option<Role>,
}

/// Everything the mock backend holds.
#[derive(Debug, Default)]
pub struct BackendState {
    pub products: Vec<Product>,
    pub carts: HashMap<String, Vec<CartLine>>,
    pub transactions: Vec<TransactionRecord>,
    pub users: Vec<User>,
    /// Unix timestamps per wallet address.
    pub wallet_history: HashMap<String, Vec<i64>>,
    requests: Vec<String>,
    failing: HashSet<String>,
    next_id: u32,
}

/// In-process backend listening on `127.0.0.1`.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state: Shared = Arc::default();
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Configuration pointing both the backend and the indexer at this mock,
    /// with instant payment and KYC.
    ///
    /// # Errors
    ///
    /// Returns error if an override is malformed.
    pub fn config_with(&self, overrides: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let url = self.url();
        let mut vars: HashMap<&str, String> = HashMap::from([
            ("SOLSPLIT_API_URL", url.clone()),
            ("HELIUS_API_URL", url),
            ("HELIUS_API_KEY", INDEXER_KEY.to_string()),
            ("SOLSPLIT_WALLET_ADDRESS", WALLET.to_string()),
            ("SOLSPLIT_PAYMENT_DELAY_MS", "0".to_string()),
            ("SOLSPLIT_KYC_DELAY_MS", "0".to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert(*key, (*value).to_string());
        }
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    /// See [`Self::config_with`].
    ///
    /// # Errors
    ///
    /// Never fails with the built-in values.
    pub fn config(&self) -> Result<StorefrontConfig, ConfigError> {
        self.config_with(&[])
    }

    /// Storefront on this backend recording its notices.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration or HTTP client cannot be built.
    pub fn storefront<S: KeyValueStore>(
        &self,
        store: S,
        notifier: &RecordingNotifier,
    ) -> Result<Storefront<S>, Box<dyn std::error::Error>> {
        Ok(Storefront::new(
            self.config()?,
            store,
            Arc::new(notifier.clone()),
        )?)
    }

    /// Direct access to the backend's data.
    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        lock(&self.state)
    }

    pub fn seed_product(&self, product: Product) {
        self.state().products.push(product);
    }

    pub fn seed_customer(&self, email: &str) {
        self.seed_user(email, Some(Role::new("ROLE_USER")));
    }

    pub fn seed_admin(&self, email: &str) {
        self.seed_user(email, Some(Role::admin()));
    }

    pub fn seed_user(&self, email: &str, role: Option<Role>) {
        self.state().users.push(User {
            name: "Test User".to_string(),
            email: email.to_string(),
            mobile: "5551234".to_string(),
            password: PASSWORD.to_string(),
            role,
        });
    }

    /// Give `address` `count` transactions, the oldest `age_days` ago.
    pub fn seed_wallet_history(&self, address: &str, age_days: i64, count: i64) {
        let oldest = Utc::now() - Duration::days(age_days);
        let times = (0..count)
            .map(|i| (oldest + Duration::hours(i)).timestamp())
            .collect();
        self.state()
            .wallet_history
            .insert(address.to_string(), times);
    }

    /// Remote cart lines for `email`.
    #[must_use]
    pub fn cart(&self, email: &str) -> Vec<CartLine> {
        self.state().carts.get(email).cloned().unwrap_or_default()
    }

    /// Make `method path` answer `500`.
    pub fn fail(&self, method: &str, path: &str) {
        self.state().failing.insert(format!("{method} {path}"));
    }

    pub fn recover(&self, method: &str, path: &str) {
        self.state().failing.remove(&format!("{method} {path}"));
    }

    /// How many times `method path` was requested.
    #[must_use]
    pub fn request_count(&self, method: &str, path: &str) -> usize {
        let key = format!("{method} {path}");
        self.state().requests.iter().filter(|r| **r == key).count()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A catalog product with a tiny image payload.
#[must_use]
pub fn product(id: &str, name: &str, cents: i64, stock: Option<u32>) -> Product {
    Product {
        id: ProductId::new(id),
        product_name: name.to_string(),
        description: format!("{name} description"),
        price: Price::new(Decimal::new(cents, 2)),
        image_data: STANDARD.encode(b"\x89PNG"),
        product_type: "general".to_string(),
        available: true,
        stock_quantity: stock,
    }
}

/// Bearer token issued to `email` at login.
#[must_use]
pub fn token_for(email: &str) -> String {
    format!("token-{email}")
}

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/products", get(products))
        .route("/api/auth/login", post(login))
        .route("/api/auth/singup", post(signup))
        .route("/api/cart/", get(fetch_cart))
        .route("/api/cart/addCart", get(add_to_cart))
        .route("/api/cart/update", put(update_cart))
        .route("/api/cart/remove", delete(remove_from_cart))
        .route("/api/cart/clear", delete(clear_cart))
        .route("/api/admin/", get(admin_products))
        .route("/api/admin/addProduct", post(add_product))
        .route("/api/admin/update", put(update_product))
        .route("/api/admin/remove", delete(remove_product))
        .route("/api/transaction", post(submit_transaction))
        .route("/api/getAll", get(transactions))
        .route("/v0/addresses/{address}/transactions", get(wallet_history))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), record))
        .with_state(state)
}

/// Record every request and apply injected failures.
async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let key = format!("{} {}", request.method(), request.uri().path());
    let failing = {
        let mut state = lock(&state);
        state.requests.push(key.clone());
        state.failing.contains(&key)
    };
    if failing {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Injected failure").into_response();
    }
    next.run(request).await
}

// =============================================================================
// Auth
// =============================================================================

fn caller(state: &BackendState, headers: &HeaderMap) -> Result<User, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    token
        .and_then(|token| state.users.iter().find(|u| token_for(&u.email) == token))
        .cloned()
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Unauthorized").into_response())
}

fn admin(state: &BackendState, headers: &HeaderMap) -> Result<User, Response> {
    let user = caller(state, headers)?;
    if user.role.as_ref().is_some_and(Role::is_admin) {
        Ok(user)
    } else {
        Err((StatusCode::FORBIDDEN, "Forbidden").into_response())
    }
}

/// Customers may only touch their own cart.
fn owner(state: &BackendState, headers: &HeaderMap, email: &str) -> Result<User, Response> {
    let user = caller(state, headers)?;
    if user.email == email {
        Ok(user)
    } else {
        Err((StatusCode::FORBIDDEN, "Forbidden").into_response())
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let state = lock(&state);
    let user = state
        .users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password);

    match user {
        Some(user) => Json(json!({
            "jwtToken": token_for(&user.email),
            "role": user.role,
        }))
        .into_response(),
        None => (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response(),
    }
}

#[derive(Deserialize)]
struct SignupBody {
    name: String,
    email: String,
    mobile: String,
    password: String,
}

async fn signup(State(state): State<Shared>, Json(body): Json<SignupBody>) -> Response {
    let mut state = lock(&state);
    if state.users.iter().any(|u| u.email == body.email) {
        return (StatusCode::CONFLICT, "User already exists").into_response();
    }
    state.users.push(User {
        name: body.name,
        email: body.email,
        mobile: body.mobile,
        password: body.password,
        role: Some(Role::new("ROLE_USER")),
    });
    (StatusCode::CREATED, "User registered").into_response()
}

// =============================================================================
// Catalog and cart
// =============================================================================

async fn products(State(state): State<Shared>) -> Json<Vec<Product>> {
    Json(lock(&state).products.clone())
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

async fn fetch_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<CartLine>>, Response> {
    let state = lock(&state);
    owner(&state, &headers, &query.email)?;
    Ok(Json(state.carts.get(&query.email).cloned().unwrap_or_default()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartItem {
    product_id: ProductId,
    quantity: u32,
    email: String,
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(item): Json<CartItem>,
) -> Result<StatusCode, Response> {
    let mut state = lock(&state);
    owner(&state, &headers, &item.email)?;

    let product = state
        .products
        .iter()
        .find(|p| p.id == item.product_id)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Product not found").into_response())?;

    let cart = state.carts.entry(item.email).or_default();
    match cart.iter_mut().find(|line| line.product.id == item.product_id) {
        Some(line) => line.quantity += item.quantity,
        None => cart.push(CartLine {
            product,
            quantity: item.quantity,
        }),
    }
    Ok(StatusCode::OK)
}

async fn update_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(item): Json<CartItem>,
) -> Result<StatusCode, Response> {
    let mut state = lock(&state);
    owner(&state, &headers, &item.email)?;

    let line = state
        .carts
        .get_mut(&item.email)
        .and_then(|cart| cart.iter_mut().find(|line| line.product.id == item.product_id))
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Cart item not found").into_response())?;
    line.quantity = item.quantity;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveBody {
    email: String,
    product_id: ProductId,
}

async fn remove_from_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<RemoveBody>,
) -> Result<StatusCode, Response> {
    let mut state = lock(&state);
    owner(&state, &headers, &body.email)?;

    if let Some(cart) = state.carts.get_mut(&body.email) {
        cart.retain(|line| line.product.id != body.product_id);
    }
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct EmailBody {
    email: String,
}

async fn clear_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<EmailBody>,
) -> Result<StatusCode, Response> {
    let mut state = lock(&state);
    owner(&state, &headers, &body.email)?;
    state.carts.remove(&body.email);
    Ok(StatusCode::OK)
}

// =============================================================================
// Admin
// =============================================================================

async fn admin_products(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<Product>>, Response> {
    let state = lock(&state);
    admin(&state, &headers)?;
    Ok(Json(state.products.clone()))
}

fn bad_request(message: impl ToString) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

/// Text fields and the optional `file` part of a multipart form.
async fn read_form(
    mut multipart: Multipart,
) -> Result<(HashMap<String, String>, Option<Vec<u8>>), Response> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file = Some(field.bytes().await.map_err(bad_request)?.to_vec());
        } else {
            fields.insert(name, field.text().await.map_err(bad_request)?);
        }
    }
    Ok((fields, file))
}

async fn add_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<StatusCode, Response> {
    {
        let state = lock(&state);
        admin(&state, &headers)?;
    }
    let (fields, file) = read_form(multipart).await?;

    let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
    let price: Decimal = field("price").parse().map_err(bad_request)?;
    let file = file.ok_or_else(|| bad_request("Missing file"))?;

    let mut state = lock(&state);
    state.next_id += 1;
    let product = Product {
        id: ProductId::new(format!("new-{}", state.next_id)),
        product_name: field("productName"),
        description: field("description"),
        price: Price::new(price),
        image_data: STANDARD.encode(&file),
        product_type: field("productType"),
        available: field("available") == "true",
        stock_quantity: field("stockQuantity").parse().ok(),
    };
    state.products.push(product);
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductPatch {
    id: ProductId,
    product_name: Option<String>,
    description: Option<String>,
    product_type: Option<String>,
    price: Option<Price>,
    stock_quantity: Option<u32>,
    available: Option<bool>,
}

async fn update_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(patch): Json<ProductPatch>,
) -> Result<StatusCode, Response> {
    let mut state = lock(&state);
    admin(&state, &headers)?;

    let product = state
        .products
        .iter_mut()
        .find(|p| p.id == patch.id)
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;

    if let Some(name) = patch.product_name {
        product.product_name = name;
    }
    if let Some(description) = patch.description {
        product.description = description;
    }
    if let Some(product_type) = patch.product_type {
        product.product_type = product_type;
    }
    if let Some(price) = patch.price {
        product.price = price;
    }
    if let Some(stock) = patch.stock_quantity {
        product.stock_quantity = Some(stock);
    }
    if let Some(available) = patch.available {
        product.available = available;
    }
    Ok(StatusCode::OK)
}

async fn remove_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<StatusCode, Response> {
    {
        let state = lock(&state);
        admin(&state, &headers)?;
    }
    let (fields, _) = read_form(multipart).await?;
    let id = fields
        .get("productId")
        .map(ProductId::new)
        .ok_or_else(|| bad_request("Missing productId"))?;

    let mut state = lock(&state);
    let before = state.products.len();
    state.products.retain(|p| p.id != id);
    if state.products.len() == before {
        return Err((StatusCode::NOT_FOUND, "Product not found").into_response());
    }
    Ok(StatusCode::OK)
}

// =============================================================================
// Transactions
// =============================================================================

async fn submit_transaction(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(record): Json<TransactionRecord>,
) -> Result<StatusCode, Response> {
    let mut state = lock(&state);
    owner(&state, &headers, &record.email)?;
    state.transactions.push(record);
    Ok(StatusCode::CREATED)
}

async fn transactions(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<TransactionSummary>>, Response> {
    let state = lock(&state);
    admin(&state, &headers)?;

    let summaries = state
        .transactions
        .iter()
        .map(|record| {
            let user = state.users.iter().find(|u| u.email == record.email);
            TransactionSummary {
                trans_id: record.transaction_hash.to_string(),
                email: record.email.clone(),
                amount: record.amount,
                wallet_address: record.wallet_address.clone(),
                name: user.map(|u| u.name.clone()).unwrap_or_default(),
                mobile: user.map(|u| u.mobile.clone()).unwrap_or_default(),
                trans_date: record.date.to_rfc3339(),
                product_id: record.product_id.to_string(),
            }
        })
        .collect();
    Ok(Json(summaries))
}

// =============================================================================
// Indexer
// =============================================================================

#[derive(Deserialize)]
struct IndexerQuery {
    #[serde(rename = "api-key")]
    api_key: String,
}

async fn wallet_history(
    State(state): State<Shared>,
    Path(address): Path<String>,
    Query(query): Query<IndexerQuery>,
) -> Response {
    if query.api_key != INDEXER_KEY {
        return (StatusCode::UNAUTHORIZED, "Invalid API key").into_response();
    }
    let state = lock(&state);
    let history: Vec<_> = state
        .wallet_history
        .get(&address)
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(i, timestamp)| json!({ "signature": format!("sig-{i}"), "timestamp": timestamp }))
        .collect();
    Json(history).into_response()
}
