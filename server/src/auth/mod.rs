//! Authentication core.
//!
//! Credential registry, token codec and the auth service that ties them
//! together. Nothing in here performs I/O or logs.
//!
//! # Pre-conditions
//! - Credentials and the signing secret are supplied once, at construction.
//!
//! # Post-conditions
//! - All state is immutable once the service is built.
//!
//! # Invariants
//! - Tokens are signed and verified with the same symmetric key.

pub mod credentials;
pub mod jwt;
pub mod service;
pub mod signing;

pub use credentials::{Credential, CredentialRegistry, RegistryError};
pub use jwt::{Claims, DEFAULT_ISSUER, TokenCodec, TokenError};
pub use service::{AuthError, AuthService, Health, HealthStatus, IssuedTokenPair};
pub use signing::{SigningKey, SigningMethod};
