//! Authentication service.
//!
//! Login and signup go to the backend; the returned token becomes the held
//! [`Identity`] and the cart is attached to it.

use secrecy::{ExposeSecret, SecretString};
use solsplit_core::{Email, Role};
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, ApiError, LoginCredentials, SignupData};
use crate::error::{StorefrontError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::notify::{Notice, Notifier};
use crate::services::cart::{CartRemote, CartSync};
use crate::session::{Identity, KeyValueStore, SessionHolder};

/// Signup form as entered, before validation.
#[derive(Clone)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

/// Authentication service.
pub struct AuthService<'a> {
    api: &'a ApiClient,
    notifier: &'a dyn Notifier,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient, notifier: &'a dyn Notifier) -> Self {
        Self { api, notifier }
    }

    /// Log in and attach the cart to the new identity.
    ///
    /// A session that cannot be saved or a cart that cannot be fetched is
    /// reported but does not fail the login.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank or malformed input and `Api` when the
    /// backend rejects the credentials.
    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn login<S, R>(
        &self,
        session: &mut SessionHolder<S>,
        cart: &mut CartSync<R>,
        email: &str,
        password: SecretString,
    ) -> Result<Identity, StorefrontError>
    where
        S: KeyValueStore,
        R: CartRemote,
    {
        if email.trim().is_empty() || password.expose_secret().is_empty() {
            return Err(StorefrontError::Validation(
                "Please enter both email and password.".to_string(),
            ));
        }
        let email = Email::parse(email).map_err(|e| StorefrontError::Validation(e.to_string()))?;

        let credentials = LoginCredentials {
            email: email.to_string(),
            password,
        };
        let response = self.api.login(&credentials).await.map_err(login_failed)?;

        let role = response.role.filter(|r| !r.is_empty()).map(Role::new);
        let identity = Identity::new(email, response.jwt_token, role);
        let saved = session.login(identity.clone()).map(|_| ());

        set_sentry_user(identity.email.as_str());
        add_breadcrumb("auth", "Logged in", None);
        info!(admin = identity.is_admin(), "Logged in");
        self.notifier
            .notify(Notice::info("Success", "You have been logged in successfully!"));

        if let Err(err) = saved {
            let err = StorefrontError::from(err);
            warn!(error = %err, "Could not save session");
            self.notifier.notify(err.report());
        }

        if let Err(err) = cart.attach(identity.clone()).await {
            warn!(error = %err, "Could not load cart after login");
            self.notifier.notify(err.report());
        }

        Ok(identity)
    }

    /// Create an account. The customer logs in separately afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank fields, a bad email or mismatched
    /// passwords, and `Api` when the backend rejects the account.
    #[instrument(skip_all, fields(email = %form.email.trim()))]
    pub async fn signup(&self, form: SignupForm) -> Result<(), StorefrontError> {
        let blank = [&form.name, &form.email, &form.mobile]
            .iter()
            .any(|field| field.trim().is_empty())
            || form.password.expose_secret().is_empty();
        if blank {
            return Err(StorefrontError::Validation(
                "Please fill in all required fields.".to_string(),
            ));
        }
        if form.password.expose_secret() != form.confirm_password.expose_secret() {
            return Err(StorefrontError::Validation("Passwords do not match.".to_string()));
        }
        let email =
            Email::parse(&form.email).map_err(|e| StorefrontError::Validation(e.to_string()))?;

        let data = SignupData {
            name: form.name.trim().to_string(),
            email: email.into_inner(),
            mobile: form.mobile.trim().to_string(),
            password: form.password,
        };
        self.api.signup(&data).await?;

        add_breadcrumb("auth", "Signed up", None);
        self.notifier.notify(Notice::info(
            "Success",
            "Your account has been created successfully. You can now log in.",
        ));
        Ok(())
    }

    /// Forget the identity and empty the local cart.
    ///
    /// # Errors
    ///
    /// Returns `Session` if the stored session cannot be removed. The
    /// in-memory identity and cart are cleared regardless.
    pub fn logout<S, R>(
        &self,
        session: &mut SessionHolder<S>,
        cart: &mut CartSync<R>,
    ) -> Result<(), StorefrontError>
    where
        S: KeyValueStore,
        R: CartRemote,
    {
        cart.detach();
        let result = session.logout();

        clear_sentry_user();
        add_breadcrumb("auth", "Logged out", None);
        self.notifier
            .notify(Notice::info("Logged out", "You have been logged out successfully."));

        result.map_err(StorefrontError::from)
    }
}

/// Rejected credentials keep the backend's message, or a generic one.
fn login_failed(err: ApiError) -> StorefrontError {
    match err {
        ApiError::Status { status, message } if message.trim().is_empty() => {
            StorefrontError::Api(ApiError::Status {
                status,
                message: "Invalid email or password.".to_string(),
            })
        }
        other => StorefrontError::Api(other),
    }
}
