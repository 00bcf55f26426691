//! Login and signup endpoints.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{ApiClient, ApiError, ensure_status, read_json};

/// Credentials submitted on login.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Account details submitted on signup.
#[derive(Clone)]
pub struct SignupData {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: SecretString,
}

impl std::fmt::Debug for SignupData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupData")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("mobile", &self.mobile)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful login payload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub jwt_token: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("jwt_token", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

impl ApiClient {
    /// Exchange credentials for a session token.
    ///
    /// Only `200 OK` counts as success; any other status carries the
    /// backend's message.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the credentials are rejected.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse, ApiError> {
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });

        let response = self
            .http()
            .post(self.endpoint("/api/auth/login"))
            .json(&body)
            .send()
            .await?;
        let response = ensure_status(response, reqwest::StatusCode::OK).await?;
        read_json(response).await
    }

    /// Register a new customer account.
    ///
    /// The backend answers `201 Created` on success.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the account is rejected.
    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn signup(&self, data: &SignupData) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "name": data.name,
            "email": data.email,
            "mobile": data.mobile,
            "password": data.password.expose_secret(),
        });

        // The backend route really is spelled "singup".
        let response = self
            .http()
            .post(self.endpoint("/api/auth/singup"))
            .json(&body)
            .send()
            .await?;
        ensure_status(response, reqwest::StatusCode::CREATED).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_without_role() {
        let parsed: LoginResponse = serde_json::from_str(r#"{"jwtToken":"t1"}"#).unwrap();
        assert_eq!(parsed.jwt_token, "t1");
        assert!(parsed.role.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credentials = LoginCredentials {
            email: "a@b.com".to_string(),
            password: SecretString::from("hunter2"),
        };
        let output = format!("{credentials:?}");
        assert!(output.contains("a@b.com"));
        assert!(!output.contains("hunter2"));

        let response = LoginResponse {
            jwt_token: "eyJhbGciOi".to_string(),
            role: Some("ROLE_ADMIN".to_string()),
        };
        assert!(!format!("{response:?}").contains("eyJhbGciOi"));
    }
}
