//! Account commands: signup, login, logout and whoami.
//!
//! # Usage
//!
//! ```bash
//! solsplit signup -n "Ada Lovelace" -e ada@example.com -m 5551234 -p secret
//! SOLSPLIT_PASSWORD=secret solsplit login -e ada@example.com
//! solsplit whoami
//! solsplit logout
//! ```

use secrecy::SecretString;
use solsplit_storefront::Storefront;
use solsplit_storefront::services::auth::SignupForm;

use super::CliError;

/// Create an account. The customer logs in separately afterwards.
pub async fn signup(
    storefront: &Storefront,
    name: String,
    email: String,
    mobile: String,
    password: String,
    confirm_password: String,
) -> Result<(), CliError> {
    let form = SignupForm {
        name,
        email,
        mobile,
        password: SecretString::from(password),
        confirm_password: SecretString::from(confirm_password),
    };
    storefront.signup(form).await?;
    Ok(())
}

/// Log in, persist the session and load the saved cart.
pub async fn login(
    storefront: &mut Storefront,
    email: &str,
    password: String,
) -> Result<(), CliError> {
    storefront.login(email, SecretString::from(password)).await?;
    tracing::info!("{} item(s) in cart", storefront.cart().ledger().count());
    Ok(())
}

/// Forget the persisted session.
pub fn logout(storefront: &mut Storefront) -> Result<(), CliError> {
    storefront.logout()?;
    Ok(())
}

/// Show the logged-in account.
pub fn whoami(storefront: &Storefront) {
    match storefront.identity() {
        Some(identity) => {
            let role = identity.role.as_ref().map_or("customer", |role| role.as_str());
            tracing::info!("Logged in as {} ({role})", identity.email);
        }
        None => tracing::info!("Not logged in"),
    }
}
