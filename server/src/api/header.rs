//! Bearer header convention.
//!
//! Tokens travel as `"<HeaderName> <token>"`, e.g. `Authorization: Authorization
//! eyJ...` and `Identity: Identity eyJ...`. This is not the usual `Bearer`
//! prefix; the prefix word is the header name itself and is not compared.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

/// Header carrying the access token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Header carrying the identity token.
pub const IDENTITY_HEADER: &str = "Identity";

/// Error returned when a token header cannot be read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// The header is absent or empty.
    Missing(&'static str),
    /// The header value is not `"<name> <token>"`.
    BadFormat(&'static str),
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "token not present in header {name}"),
            Self::BadFormat(name) => write!(f, "bad header format for {name}"),
        }
    }
}

impl std::error::Error for HeaderError {}

/// Extract the token from header `name`.
///
/// # Errors
/// Returns `HeaderError::Missing` if the header is absent or empty, and
/// `HeaderError::BadFormat` if the value does not split into exactly two
/// space-separated parts.
pub fn extract_token<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, HeaderError> {
    let value = headers
        .get(name)
        .map(HeaderValue::to_str)
        .transpose()
        .map_err(|_| HeaderError::BadFormat(name))?
        .unwrap_or_default();
    if value.is_empty() {
        return Err(HeaderError::Missing(name));
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(token), None) => Ok(token),
        _ => Err(HeaderError::BadFormat(name)),
    }
}

/// Format a header value for `token` under header `name`.
#[must_use]
pub fn format_token(name: &str, token: &str) -> String {
    format!("{name} {token}")
}

/// Insert `token` into `headers` under header `name`.
///
/// # Errors
/// Returns `HeaderError::BadFormat` if the token contains characters that
/// are not allowed in a header value.
pub fn insert_token(
    headers: &mut HeaderMap,
    name: &'static str,
    token: &str,
) -> Result<(), HeaderError> {
    let key = HeaderName::from_bytes(name.as_bytes()).map_err(|_| HeaderError::BadFormat(name))?;
    let value = HeaderValue::from_str(&format_token(name, token))
        .map_err(|_| HeaderError::BadFormat(name))?;
    headers.insert(key, value);
    Ok(())
}
