//! HTTP client for the gateway.
//!
//! Wraps the `/v1` routes for services that exchange credentials or check
//! tokens over the network. Tokens are sent in the same
//! `"<HeaderName> <token>"` form the gateway expects.
//!
//! # Pre-conditions
//! - `base_url` points at a running gateway, without the `/v1` prefix.
//!
//! # Post-conditions
//! - Every non-200 status surfaces as a typed `ClientError`.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::header::{self, AUTHORIZATION_HEADER, HeaderError, IDENTITY_HEADER};
use crate::api::{self, IdentityResponse, TokenResponse};
use crate::auth::Health;

/// Base URL used when none is configured.
pub const DEFAULT_URL: &str = "http://iam-gateway";

/// Error returned by `GatewayClient` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The gateway answered 400.
    BadRequest,
    /// The gateway answered 401.
    Unauthorized,
    /// The gateway answered 500.
    Internal,
    /// The gateway answered 503.
    ServiceUnavailable,
    /// The gateway answered with a status it never sends on purpose.
    UnexpectedStatus(u16),
    /// A 200 body could not be decoded.
    BadResponse(String),
    /// The request never got an answer.
    Transport(String),
    /// The token cannot be placed in a header.
    Header(HeaderError),
}

impl ClientError {
    /// Error for a non-200 `status`.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::BadRequest,
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::INTERNAL_SERVER_ERROR => Self::Internal,
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable,
            other => Self::UnexpectedStatus(other.as_u16()),
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest => write!(f, "bad request"),
            Self::Unauthorized => write!(f, "user credentials invalid"),
            Self::Internal => write!(f, "internal server error"),
            Self::ServiceUnavailable => write!(f, "service is unavailable"),
            Self::UnexpectedStatus(code) => write!(f, "unhandled error returned http {code}"),
            Self::BadResponse(reason) => write!(f, "bad response: {reason}"),
            Self::Transport(reason) => write!(f, "could not complete request: {reason}"),
            Self::Header(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Header(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeaderError> for ClientError {
    fn from(e: HeaderError) -> Self {
        Self::Header(e)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Client for a single gateway instance.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl Default for GatewayClient {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl GatewayClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, Client::new())
    }

    /// Use a preconfigured `reqwest` client, e.g. one with timeouts.
    #[must_use]
    pub fn with_http(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, api::full_path(path))
    }

    /// Fetch the gateway's health.
    ///
    /// # Errors
    /// A degraded gateway answers 500 and an unavailable one 503; both
    /// surface as errors.
    pub async fn health(&self) -> Result<Health, ClientError> {
        let response = self.http.get(self.url(api::HEALTH_PATH)).send().await?;
        decode(check(response)?).await
    }

    /// Check that the gateway accepts requests.
    ///
    /// # Errors
    /// Returns `ClientError` if the gateway is unreachable or not ready.
    pub async fn ready(&self) -> Result<(), ClientError> {
        let response = self.http.get(self.url(api::READY_PATH)).send().await?;
        check(response)?;
        Ok(())
    }

    /// Exchange client credentials for a token pair.
    ///
    /// # Errors
    /// `ClientError::BadRequest` for empty inputs and
    /// `ClientError::Unauthorized` for rejected credentials.
    pub async fn token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse, ClientError> {
        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", api::CLIENT_CREDENTIALS_GRANT),
        ];
        let response = self
            .http
            .post(self.url(api::TOKEN_PATH))
            .form(&form)
            .send()
            .await?;
        decode(check(response)?).await
    }

    /// Validate an access token.
    ///
    /// # Errors
    /// `ClientError::Unauthorized` if the gateway rejects the token.
    pub async fn validate(&self, access_token: &str) -> Result<(), ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        header::insert_token(&mut headers, AUTHORIZATION_HEADER, access_token)?;
        let response = self
            .http
            .post(self.url(api::VALIDATE_PATH))
            .headers(headers)
            .send()
            .await?;
        check(response)?;
        Ok(())
    }

    /// Resolve an identity token to the application name it was issued for.
    ///
    /// # Errors
    /// `ClientError::Unauthorized` if the gateway rejects the token.
    pub async fn identity(&self, identity_token: &str) -> Result<String, ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        header::insert_token(&mut headers, IDENTITY_HEADER, identity_token)?;
        let response = self
            .http
            .post(self.url(api::IDENTITY_PATH))
            .headers(headers)
            .send()
            .await?;
        let body: IdentityResponse = decode(check(response)?).await?;
        Ok(body.identity)
    }
}

fn check(response: Response) -> Result<Response, ClientError> {
    match response.status() {
        StatusCode::OK => Ok(response),
        status => Err(ClientError::from_status(status)),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::BadResponse(e.to_string()))
}
