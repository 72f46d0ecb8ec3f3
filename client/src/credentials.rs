//! API key and secret for the weather API.
//!
//! The secret is only ever used as the HMAC key; it never leaves the process
//! and is redacted from `Debug` output.

use crate::error::AuthError;

/// Credentials for signed requests, built once at startup and passed by reference.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    api_secret: String,
}

impl ApiCredentials {
    /// Create credentials from explicit values.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidArgument` if either value is empty.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self, AuthError> {
        let api_key = api_key.into();
        let api_secret = api_secret.into();

        if api_key.is_empty() {
            return Err(AuthError::InvalidArgument("API key must not be empty".into()));
        }
        if api_secret.is_empty() {
            return Err(AuthError::InvalidArgument("API secret must not be empty".into()));
        }

        Ok(Self { api_key, api_secret })
    }

    /// Read credentials from two environment variables.
    ///
    /// Dotenv files are loaded by `Config`; this only looks at the process environment.
    pub fn from_env(key_var: &str, secret_var: &str) -> Result<Self, AuthError> {
        let api_key =
            std::env::var(key_var).map_err(|_| AuthError::MissingEnvVar(key_var.into()))?;
        let api_secret =
            std::env::var(secret_var).map_err(|_| AuthError::MissingEnvVar(secret_var.into()))?;

        Self::new(api_key, api_secret)
    }

    /// The API key (public, also part of every request path).
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The secret, for HMAC computation only. Never log it.
    pub fn expose_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}
