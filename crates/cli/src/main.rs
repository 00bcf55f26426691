//! SolSplit CLI - storefront and admin console.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! solsplit products --search mug
//! solsplit product 64f1c2 --save-image mug.png
//!
//! # Account
//! solsplit signup --name "Ada" --email ada@example.com --mobile 5551234 --password ...
//! solsplit login --email ada@example.com --password ...
//! solsplit whoami
//!
//! # Cart
//! solsplit cart add 64f1c2 -q 2
//! solsplit cart set 64f1c2 5
//! solsplit cart show
//!
//! # Checkout
//! solsplit wallet check
//! solsplit kyc --government-id id.png --selfie me.png
//! solsplit checkout --name "Ada" --address-line1 "1 Main St" ... --method later
//!
//! # Admin console
//! solsplit admin add --name Mug --description "Blue mug" --price 12.50 \
//!     --product-type kitchen --image mug.png
//! solsplit admin transactions
//! ```
//!
//! # Environment Variables
//!
//! - `SOLSPLIT_API_URL` - Backend REST base URL
//! - `SOLSPLIT_SESSION_PATH` - File holding the persisted session
//! - `SOLSPLIT_WALLET_ADDRESS` - Address the wallet provider connects to
//! - `HELIUS_API_KEY` - Wallet indexer key (pay-later checks are skipped without it)
//! - `SENTRY_DSN` - Sentry error tracking

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use solsplit_core::WalletAddress;
use solsplit_storefront::{Notifier, Storefront, StorefrontConfig, TracingNotifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "solsplit")]
#[command(author, version, about = "SolSplit storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available products
    Products {
        /// Filter by name, description or category
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one product
    Product {
        /// Product ID
        id: String,

        /// Write the product image to this file
        #[arg(long)]
        save_image: Option<PathBuf>,
    },
    /// Create an account
    Signup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        mobile: String,

        #[arg(short, long, env = "SOLSPLIT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Defaults to `--password`
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Log in and load the saved cart
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "SOLSPLIT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Wallet connection and pay-later eligibility
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Submit identity documents
    Kyc {
        /// Government ID image
        #[arg(long)]
        government_id: Option<PathBuf>,

        /// Selfie image
        #[arg(long)]
        selfie: Option<PathBuf>,
    },
    /// Pay for the cart
    Checkout(commands::checkout::CheckoutArgs),
    /// Admin console
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines and totals
    Show,
    /// Add a product
    Add {
        /// Product ID
        id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 or less removes it)
    Set {
        /// Product ID
        id: String,

        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Add one unit to a line
    Inc {
        /// Product ID
        id: String,
    },
    /// Remove one unit from a line
    Dec {
        /// Product ID
        id: String,
    },
    /// Remove a line
    Remove {
        /// Product ID
        id: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WalletAction {
    /// Check pay-later eligibility
    Check {
        /// Wallet to check (defaults to the connected wallet)
        address: Option<WalletAddress>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List every product, including unavailable ones
    Products,
    /// Create a product
    Add(commands::admin::AddArgs),
    /// Update a product (blank fields are left unchanged)
    Update(commands::admin::UpdateArgs),
    /// Delete a product
    Remove {
        /// Product ID
        id: String,
    },
    /// List completed transactions
    Transactions,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Warnings and errors become Sentry events; info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "solsplit_storefront=info,solsplit_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    if let Err(e) = run(cli, config, Arc::clone(&notifier)).await {
        match e {
            CliError::Storefront(err) => notifier.notify(err.report()),
            other => tracing::error!("Command failed: {other}"),
        }
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    config: StorefrontConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<(), CliError> {
    let mut storefront = Storefront::from_config(config, Arc::clone(&notifier))?;
    if let Err(err) = storefront.restore().await {
        tracing::warn!(error = %err, "Continuing without a saved session");
        notifier.notify(err.report());
    }

    match cli.command {
        Commands::Products { search } => {
            commands::catalog::products(&storefront, search.as_deref()).await?;
        }
        Commands::Product { id, save_image } => {
            commands::catalog::product(&storefront, &id, save_image.as_deref()).await?;
        }
        Commands::Signup {
            name,
            email,
            mobile,
            password,
            confirm_password,
        } => {
            let confirm_password = confirm_password.unwrap_or_else(|| password.clone());
            commands::account::signup(&storefront, name, email, mobile, password, confirm_password)
                .await?;
        }
        Commands::Login { email, password } => {
            commands::account::login(&mut storefront, &email, password).await?;
        }
        Commands::Logout => commands::account::logout(&mut storefront)?,
        Commands::Whoami => commands::account::whoami(&storefront),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&storefront),
            CartAction::Add { id, quantity } => {
                commands::cart::add(&mut storefront, &id, quantity).await?;
            }
            CartAction::Set { id, quantity } => {
                commands::cart::set(&mut storefront, &id, quantity).await?;
            }
            CartAction::Inc { id } => commands::cart::step(&mut storefront, &id, true).await?,
            CartAction::Dec { id } => commands::cart::step(&mut storefront, &id, false).await?,
            CartAction::Remove { id } => commands::cart::remove(&mut storefront, &id).await?,
            CartAction::Clear => commands::cart::clear(&mut storefront).await?,
        },
        Commands::Wallet { action } => match action {
            WalletAction::Check { address } => {
                commands::wallet::check(&storefront, address).await?;
            }
        },
        Commands::Kyc {
            government_id,
            selfie,
        } => commands::checkout::kyc(&storefront, government_id, selfie).await?,
        Commands::Checkout(args) => commands::checkout::checkout(&mut storefront, args).await?,
        Commands::Admin { action } => match action {
            AdminAction::Products => commands::admin::products(&storefront).await?,
            AdminAction::Add(args) => commands::admin::add(&storefront, args).await?,
            AdminAction::Update(args) => commands::admin::update(&storefront, args).await?,
            AdminAction::Remove { id } => commands::admin::remove(&storefront, &id).await?,
            AdminAction::Transactions => commands::admin::transactions(&storefront).await?,
        },
    }
    Ok(())
}
