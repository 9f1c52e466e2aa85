//! Auth service.
//!
//! Orchestrates the two flows of the gateway:
//!
//! - **Credential exchange**: a client id and secret are checked against the
//!   registry and, on success, exchanged for an access token and an identity
//!   token.
//! - **Token resolution**: a presented token is verified and its subject
//!   returned.
//!
//! It also derives health from its own configuration state.
//!
//! # Invariants
//! - The registry and signing key never change after construction, so every
//!   method takes `&self` and the service can be shared across tasks.
//! - Readiness never depends on registry or key state.

use std::time::Duration;

use jsonwebtoken::get_current_timestamp;
use serde::{Deserialize, Serialize};

use super::jwt::{Claims, DEFAULT_ISSUER, TokenCodec, TokenError};
use super::{CredentialRegistry, RegistryError, SigningKey};

/// Default lifetime of access tokens.
pub const DEFAULT_EXPIRATION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Errors returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A required input was empty.
    InvalidInput(&'static str),
    /// The client id is unknown or the secret does not match.
    Unauthorized,
    /// A presented token failed verification, or issuing one failed.
    Token(TokenError),
    /// The credential configuration could not be loaded.
    Configuration(RegistryError),
}

impl AuthError {
    /// Whether the error is caused by the caller rather than the service.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Token(TokenError::Signing(_)) | Self::Configuration(_)
        )
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            Self::Unauthorized => write!(f, "user not authorized to use iam service"),
            Self::Token(e) => write!(f, "could not parse token: {e}"),
            Self::Configuration(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Token(e) => Some(e),
            Self::Configuration(e) => Some(e),
            Self::InvalidInput(_) | Self::Unauthorized => None,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        Self::Token(e)
    }
}

impl From<RegistryError> for AuthError {
    fn from(e: RegistryError) -> Self {
        Self::Configuration(e)
    }
}

/// Tokens handed out by a successful credential exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedTokenPair {
    pub access_token: String,
    pub identity_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

impl std::fmt::Debug for IssuedTokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedTokenPair")
            .field("access_token", &"[REDACTED]")
            .field("identity_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Overall health of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Alive,
    Degraded,
    Unavailable,
}

/// Health report derived from the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: HealthStatus,
    /// Explanation when the status is not `Alive`.
    #[serde(rename = "iam", default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

/// Credential exchange and token resolution over an immutable registry.
#[derive(Debug, Clone)]
pub struct AuthService {
    registry: CredentialRegistry,
    codec: TokenCodec,
    expiration_interval: Duration,
}

impl AuthService {
    /// Create a service with the default issuer and token lifetime.
    #[must_use]
    pub fn new(registry: CredentialRegistry, key: SigningKey) -> Self {
        Self::with_codec(registry, TokenCodec::new(DEFAULT_ISSUER, key))
    }

    /// Create a service around an existing codec.
    #[must_use]
    pub const fn with_codec(registry: CredentialRegistry, codec: TokenCodec) -> Self {
        Self {
            registry,
            codec,
            expiration_interval: DEFAULT_EXPIRATION_INTERVAL,
        }
    }

    /// Create a service from a credential blob and a raw secret.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the blob cannot be decoded.
    pub fn from_blob(blob: &str, secret: Vec<u8>) -> Result<Self, AuthError> {
        let registry = CredentialRegistry::from_blob(blob)?;
        Ok(Self::new(registry, SigningKey::hs512(secret)))
    }

    /// Override the access-token lifetime.
    #[must_use]
    pub fn with_expiration_interval(mut self, interval: Duration) -> Self {
        self.expiration_interval = interval;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &CredentialRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Exchange a client id and secret for a token pair.
    ///
    /// # Errors
    /// - `AuthError::InvalidInput` if either argument is empty.
    /// - `AuthError::Unauthorized` if the client is unknown or the secret
    ///   does not match.
    /// - `AuthError::Token` if signing fails.
    pub fn verify_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<IssuedTokenPair, AuthError> {
        let app_name = self.verify_client(client_id, client_secret)?;

        let interval = self.expiration_interval.as_secs();
        let expires_at = get_current_timestamp().saturating_add(interval);

        let access_token = self
            .codec
            .issue(&Claims::access(self.codec.issuer(), expires_at))?;
        let identity_token = self
            .codec
            .issue(&Claims::identity(self.codec.issuer(), app_name))?;

        Ok(IssuedTokenPair {
            access_token,
            identity_token,
            expires_in: i64::try_from(interval).unwrap_or(i64::MAX),
        })
    }

    /// Verify `token` and return its subject.
    ///
    /// Tokens without a subject, such as access tokens, resolve to the empty
    /// string.
    ///
    /// # Errors
    /// Returns `AuthError::Token` carrying the codec failure.
    pub fn resolve_subject(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.codec.verify(token)?;
        Ok(claims.sub.unwrap_or_default())
    }

    /// Health derived from the registry and signing key.
    ///
    /// An empty registry dominates an insecure secret.
    #[must_use]
    pub fn health(&self) -> Health {
        if self.registry.is_empty() {
            return Health {
                status: HealthStatus::Unavailable,
                detail: "No client credentials available".to_string(),
            };
        }
        if self.codec.key().is_insecure() {
            return Health {
                status: HealthStatus::Degraded,
                detail: "insecure secret".to_string(),
            };
        }
        Health {
            status: HealthStatus::Alive,
            detail: String::new(),
        }
    }

    /// Readiness to receive requests. Always succeeds once constructed.
    ///
    /// # Errors
    /// Never returns an error.
    pub const fn ready(&self) -> Result<(), AuthError> {
        Ok(())
    }

    /// Check the credentials and return the app name they belong to.
    fn verify_client(&self, client_id: &str, client_secret: &str) -> Result<&str, AuthError> {
        if client_id.is_empty() {
            return Err(AuthError::InvalidInput("no client id provided"));
        }
        if client_secret.is_empty() {
            return Err(AuthError::InvalidInput("no client secret provided"));
        }

        let credential = self
            .registry
            .lookup(client_id)
            .ok_or(AuthError::Unauthorized)?;
        if credential.client_secret != client_secret {
            return Err(AuthError::Unauthorized);
        }

        Ok(&credential.app_name)
    }
}
