//! Signing configuration for issued tokens.
//!
//! # Pre-conditions
//! - The secret is supplied once, at service construction.
//!
//! # Post-conditions
//! - `SigningKey` instances are immutable once created.
//!
//! # Invariants
//! - Only symmetric HMAC algorithms can be expressed.
//! - The same key is used for encoding and decoding.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

/// Symmetric MAC algorithm used to sign tokens.
///
/// Only HMAC variants exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningMethod {
    /// HMAC-SHA256.
    Hs256,
    /// HMAC-SHA384.
    Hs384,
    /// HMAC-SHA512.
    #[default]
    Hs512,
}

impl SigningMethod {
    /// The `jsonwebtoken` algorithm for this method.
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }

    /// The `alg` header value for this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }
}

impl std::fmt::Display for SigningMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Signing method together with the shared secret.
///
/// The secret may be empty. An empty secret still signs and verifies, but the
/// service reports itself as degraded.
#[derive(Clone)]
pub struct SigningKey {
    method: SigningMethod,
    secret: Vec<u8>,
}

impl SigningKey {
    /// Create a signing key for an explicit method.
    #[must_use]
    pub const fn new(method: SigningMethod, secret: Vec<u8>) -> Self {
        Self { method, secret }
    }

    /// Create an HMAC-SHA512 signing key, the deployment default.
    #[must_use]
    pub const fn hs512(secret: Vec<u8>) -> Self {
        Self::new(SigningMethod::Hs512, secret)
    }

    /// The configured signing method.
    #[must_use]
    pub const fn method(&self) -> SigningMethod {
        self.method
    }

    /// Whether the shared secret is empty.
    #[must_use]
    pub fn is_insecure(&self) -> bool {
        self.secret.is_empty()
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("method", &self.method)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
