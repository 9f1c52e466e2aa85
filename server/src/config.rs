//! Server configuration module.
//!
//! This module provides configuration loading for the gateway from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `GATEWAY_IAM_USERS`: Credential blob, base64 of the client JSON map (required)
//! - `GATEWAY_IAM_SECRET`: Shared token signing secret (default: empty, reported as degraded)
//! - `GATEWAY_HOST`: Address to bind (default: `0.0.0.0`)
//! - `GATEWAY_PORT`: Port to listen on (default: `8080`)
//! - `GATEWAY_LOG_LEVEL`: `debug` or `info` (default: `info`)
//! - `GATEWAY_SHUTDOWN_TIMEOUT_SECS`: Graceful shutdown bound (default: `30`)
//! - `GATEWAY_TOKEN_TTL_SECS`: Access token lifetime (default: `3600`)
//!
//! # Invariants
//!
//! - `iam_users` is never empty
//! - `port` is always a valid port number (1-65535)
//! - `token_ttl` is never zero

use std::time::Duration;

use crate::auth::{CredentialRegistry, RegistryError};

const IAM_USERS: &str = "GATEWAY_IAM_USERS";
const IAM_SECRET: &str = "GATEWAY_IAM_SECRET";
const HOST: &str = "GATEWAY_HOST";
const PORT: &str = "GATEWAY_PORT";
const LOG_LEVEL: &str = "GATEWAY_LOG_LEVEL";
const SHUTDOWN_TIMEOUT: &str = "GATEWAY_SHUTDOWN_TIMEOUT_SECS";
const TOKEN_TTL: &str = "GATEWAY_TOKEN_TTL_SECS";

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
}

impl LogLevel {
    /// Parse a level name. Anything but `debug` means `info`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("debug") {
            Self::Debug
        } else {
            Self::Info
        }
    }

    /// Default `tracing` filter directive for this level.
    #[must_use]
    pub const fn filter(self) -> &'static str {
        match self {
            Self::Debug => "gateway=debug",
            Self::Info => "gateway=info",
        }
    }
}

/// Server configuration.
///
/// Contains all configuration parameters needed to run the gateway.
///
/// # Pre-conditions
///
/// When constructed via `from_env()`:
/// - `GATEWAY_IAM_USERS` must be set
/// - All values must be valid for their respective types
///
/// # Post-conditions
///
/// - `port` is always in the valid range (1-65535)
#[derive(Clone)]
pub struct ServerConfig {
    /// Encoded credential blob. Decoded by [`ServerConfig::registry`].
    pub iam_users: String,
    /// Shared secret for signing tokens.
    pub iam_secret: String,
    /// Address to bind.
    pub host: String,
    /// Port to listen on for HTTP connections.
    pub port: u16,
    pub log_level: LogLevel,
    /// How long in-flight requests may take to drain on shutdown.
    pub shutdown_timeout: Duration,
    /// Lifetime of issued access tokens.
    pub token_ttl: Duration,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("iam_users", &"[REDACTED]")
            .field("iam_secret", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
    /// The credential blob could not be decoded.
    Credentials(RegistryError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
            Self::Credentials(e) => write!(f, "invalid credentials in {IAM_USERS}: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Credentials(e) => Some(e),
            Self::MissingEnvVar(_) | Self::InvalidValue { .. } => None,
        }
    }
}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default bind address.
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    /// Default graceful shutdown bound.
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
    /// Default access token lifetime.
    pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `GATEWAY_IAM_USERS` is not set or is empty
    /// - `GATEWAY_PORT` is set but not a valid port number
    /// - a duration variable is set but not a positive number of seconds
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let iam_users = Self::load_iam_users(&lookup)?;
        let iam_secret = lookup(IAM_SECRET).unwrap_or_default();
        let host = lookup(HOST).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let port = Self::load_port(&lookup)?;
        let log_level = lookup(LOG_LEVEL)
            .as_deref()
            .map(LogLevel::parse)
            .unwrap_or_default();
        let shutdown_timeout =
            Self::load_seconds(&lookup, SHUTDOWN_TIMEOUT, Self::DEFAULT_SHUTDOWN_TIMEOUT)?;
        let token_ttl = Self::load_seconds(&lookup, TOKEN_TTL, Self::DEFAULT_TOKEN_TTL)?;

        Ok(Self {
            iam_users,
            iam_secret,
            host,
            port,
            log_level,
            shutdown_timeout,
            token_ttl,
        })
    }

    /// Decode the credential blob.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Credentials` if the blob is not valid.
    pub fn registry(&self) -> Result<CredentialRegistry, ConfigError> {
        CredentialRegistry::from_blob(&self.iam_users).map_err(ConfigError::Credentials)
    }

    /// The signing secret as raw bytes.
    #[must_use]
    pub fn secret(&self) -> Vec<u8> {
        self.iam_secret.as_bytes().to_vec()
    }

    /// Load the credential blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is not set or is empty.
    fn load_iam_users(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        let users =
            lookup(IAM_USERS).ok_or_else(|| ConfigError::MissingEnvVar(IAM_USERS.to_string()))?;

        if users.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: IAM_USERS.to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(users)
    }

    /// Load the listen port.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but not a valid port number.
    fn load_port(lookup: &impl Fn(&str) -> Option<String>) -> Result<u16, ConfigError> {
        let Some(value) = lookup(PORT) else {
            return Ok(Self::DEFAULT_PORT);
        };
        match value.parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(ConfigError::InvalidValue {
                name: PORT.to_string(),
                message: format!("'{value}' is not a valid port number (must be 1-65535)"),
            }),
        }
    }

    /// Load a positive whole number of seconds.
    ///
    /// Returns `default` if not set.
    fn load_seconds(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        let Some(value) = lookup(name) else {
            return Ok(default);
        };
        match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{value}' is not a positive number of seconds"),
            }),
        }
    }
}
