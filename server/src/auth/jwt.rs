//! Token codec.
//!
//! Issues and verifies JSON Web Tokens signed with a symmetric MAC.
//!
//! # Pre-conditions
//! - The codec is constructed with the issuer string and signing key of the
//!   running instance.
//!
//! # Post-conditions
//! - `issue` returns a compact `header.payload.signature` string.
//! - `verify` returns the embedded claims only if the algorithm, signature,
//!   expiry and issuer all check out.
//!
//! # Invariants
//! - Verification is stateless and does not modify any external state.
//! - Tokens claiming any algorithm other than the configured one are rejected.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::SigningKey;

/// Issuer stamped into every token by default.
pub const DEFAULT_ISSUER: &str = "iam-gateway";

/// Claims carried by issued tokens.
///
/// Access tokens carry `jti` and `exp`. Identity tokens carry `sub` and never
/// expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer of the token.
    #[serde(default)]
    pub iss: String,
    /// Subject, the application name for identity tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Unique token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl Claims {
    /// Claims for an access token expiring at `exp`.
    #[must_use]
    pub fn access(issuer: &str, exp: u64) -> Self {
        Self {
            iss: issuer.to_string(),
            sub: None,
            jti: Some(uuid::Uuid::new_v4().to_string()),
            exp: Some(exp),
        }
    }

    /// Claims for a non-expiring identity token.
    #[must_use]
    pub fn identity(issuer: &str, subject: &str) -> Self {
        Self {
            iss: issuer.to_string(),
            sub: Some(subject.to_string()),
            jti: None,
            exp: None,
        }
    }
}

/// Error returned when issuing or verifying a token fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token does not have the `header.payload.signature` shape, or a
    /// segment cannot be decoded.
    MalformedToken,
    /// The token header names a different signing algorithm.
    UnexpectedAlgorithm,
    /// The signature does not match the token contents.
    SignatureInvalid,
    /// The `exp` claim lies in the past.
    Expired,
    /// The `iss` claim is missing or names another issuer.
    IssuerMismatch,
    /// The claims could not be signed.
    Signing(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedToken => write!(f, "malformed token"),
            Self::UnexpectedAlgorithm => write!(f, "unexpected signing method"),
            Self::SignatureInvalid => write!(f, "invalid token signature"),
            Self::Expired => write!(f, "token is expired"),
            Self::IssuerMismatch => write!(f, "issuer is invalid"),
            Self::Signing(reason) => write!(f, "could not sign token: {reason}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues and verifies tokens for a single issuer and signing key.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    issuer: String,
    key: SigningKey,
}

impl TokenCodec {
    /// Create a codec for `issuer` signing with `key`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, key: SigningKey) -> Self {
        Self {
            issuer: issuer.into(),
            key,
        }
    }

    /// The issuer this codec stamps and expects.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The signing key in use.
    #[must_use]
    pub const fn key(&self) -> &SigningKey {
        &self.key
    }

    /// Serialize and sign `claims`.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if the claims cannot be encoded.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header::new(self.key.method().algorithm());
        encode(&header, claims, &self.key.encoding_key())
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its claims.
    ///
    /// Checks run in this order: shape, algorithm, signature, expiry, issuer.
    ///
    /// # Errors
    /// Returns the `TokenError` of the first check that fails.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.split('.').count() < 2 {
            return Err(TokenError::MalformedToken);
        }
        // Checked by name so that algorithms jsonwebtoken cannot parse,
        // such as `none`, are reported as substitutions too.
        if header_algorithm(token)? != self.key.method().name() {
            return Err(TokenError::UnexpectedAlgorithm);
        }

        let token_data = decode::<Claims>(token, &self.key.decoding_key(), &self.validation())
            .map_err(map_jwt_error)?;

        Ok(token_data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.key.method().algorithm());
        // Identity tokens have no `exp`; only the issuer is mandatory.
        validation.set_required_spec_claims(&["iss"]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// The `alg` named in the token header, whatever its value.
fn header_algorithm(token: &str) -> Result<String, TokenError> {
    let segment = token.split('.').next().unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::MalformedToken)?;
    let header: RawHeader =
        serde_json::from_slice(&bytes).map_err(|_| TokenError::MalformedToken)?;
    Ok(header.alg)
}

/// Maps jsonwebtoken errors to our `TokenError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidIssuer | ErrorKind::MissingRequiredClaim(_) => {
            TokenError::IssuerMismatch
        }
        ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
            TokenError::UnexpectedAlgorithm
        }
        _ => TokenError::MalformedToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SigningMethod;
    use jsonwebtoken::{EncodingKey, get_current_timestamp};

    const SECRET: &[u8] = b"test-secret-key-that-is-long-enough";

    fn codec() -> TokenCodec {
        TokenCodec::new(DEFAULT_ISSUER, SigningKey::hs512(SECRET.to_vec()))
    }

    #[test]
    fn test_identity_token_roundtrip() {
        let codec = codec();
        let token = codec
            .issue(&Claims::identity(DEFAULT_ISSUER, "ocp"))
            .expect("issue identity token");

        let claims = codec.verify(&token).expect("verify identity token");
        assert_eq!(claims.sub.as_deref(), Some("ocp"));
        assert_eq!(claims.iss, DEFAULT_ISSUER);
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_access_token_roundtrip() {
        let codec = codec();
        let exp = get_current_timestamp() + 3600;
        let token = codec
            .issue(&Claims::access(DEFAULT_ISSUER, exp))
            .expect("issue access token");

        let claims = codec.verify(&token).expect("verify access token");
        assert!(claims.sub.is_none());
        assert!(claims.jti.is_some());
        assert_eq!(claims.exp, Some(exp));
    }

    #[test]
    fn test_token_has_three_segments() {
        let token = codec()
            .issue(&Claims::identity(DEFAULT_ISSUER, "ocp"))
            .expect("issue token");
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_access_tokens_are_unique() {
        let codec = codec();
        let exp = get_current_timestamp() + 3600;
        let first = codec.issue(&Claims::access(DEFAULT_ISSUER, exp)).expect("first");
        let second = codec.issue(&Claims::access(DEFAULT_ISSUER, exp)).expect("second");

        assert_ne!(first, second);
    }

    #[test]
    fn test_issue_is_deterministic_for_identical_claims() {
        let codec = codec();
        let claims = Claims::identity(DEFAULT_ISSUER, "ocp");

        assert_eq!(
            codec.issue(&claims).expect("first"),
            codec.issue(&claims).expect("second")
        );
    }

    #[test]
    fn test_verify_empty_token() {
        assert_eq!(codec().verify(""), Err(TokenError::MalformedToken));
    }

    #[test]
    fn test_verify_single_segment() {
        assert_eq!(
            codec().verify("not-a-valid-jwt"),
            Err(TokenError::MalformedToken)
        );
    }

    #[test]
    fn test_verify_two_segments() {
        assert_eq!(codec().verify("abc.def"), Err(TokenError::MalformedToken));
    }

    #[test]
    fn test_verify_garbage_segments() {
        assert_eq!(
            codec().verify("a.b.c"),
            Err(TokenError::MalformedToken)
        );
    }

    #[test]
    fn test_verify_other_secret() {
        let other = TokenCodec::new(
            DEFAULT_ISSUER,
            SigningKey::hs512(b"wrong-secret-key-that-is-different".to_vec()),
        );
        let token = other
            .issue(&Claims::identity(DEFAULT_ISSUER, "ocp"))
            .expect("issue token");

        assert_eq!(codec().verify(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_verify_tampered_payload() {
        let codec = codec();
        let token = codec
            .issue(&Claims::identity(DEFAULT_ISSUER, "ocp"))
            .expect("issue token");
        let forged = codec
            .issue(&Claims::identity(DEFAULT_ISSUER, "admin"))
            .expect("issue forged");

        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(codec.verify(&spliced), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_verify_expired() {
        let codec = codec();
        let token = codec
            .issue(&Claims::access(DEFAULT_ISSUER, get_current_timestamp() - 10))
            .expect("issue token");

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_verify_foreign_issuer() {
        let foreign = TokenCodec::new("other-issuer", SigningKey::hs512(SECRET.to_vec()));
        let token = foreign
            .issue(&Claims::identity("other-issuer", "ocp"))
            .expect("issue token");

        assert_eq!(codec().verify(&token), Err(TokenError::IssuerMismatch));
    }

    #[test]
    fn test_verify_missing_issuer() {
        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS512),
            &serde_json::json!({ "sub": "ocp" }),
            &EncodingKey::from_secret(SECRET),
        )
        .expect("encode token");

        assert_eq!(codec().verify(&token), Err(TokenError::IssuerMismatch));
    }

    #[test]
    fn test_verify_rejects_other_hmac_variant() {
        let hs256 = TokenCodec::new(
            DEFAULT_ISSUER,
            SigningKey::new(SigningMethod::Hs256, SECRET.to_vec()),
        );
        let token = hs256
            .issue(&Claims::identity(DEFAULT_ISSUER, "ocp"))
            .expect("issue token");

        assert_eq!(codec().verify(&token), Err(TokenError::UnexpectedAlgorithm));
    }

    #[test]
    fn test_verify_rejects_alg_none() {
        // {"alg":"none","typ":"JWT"} . {"iss":"iam-gateway","sub":"ocp"} .
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                     eyJpc3MiOiJpYW0tZ2F0ZXdheSIsInN1YiI6Im9jcCJ9.";

        assert_eq!(codec().verify(token), Err(TokenError::UnexpectedAlgorithm));
    }

    #[test]
    fn test_verify_rejects_unknown_alg_name() {
        // {"alg":"XX999"} . {"iss":"iam-gateway"} . c2ln
        let token = "eyJhbGciOiJYWDk5OSJ9.eyJpc3MiOiJpYW0tZ2F0ZXdheSJ9.c2ln";

        assert_eq!(codec().verify(token), Err(TokenError::UnexpectedAlgorithm));
    }

    #[test]
    fn test_verify_header_without_alg() {
        // {"typ":"JWT"} . {"iss":"iam-gateway"} . c2ln
        let token = "eyJ0eXAiOiJKV1QifQ.eyJpc3MiOiJpYW0tZ2F0ZXdheSJ9.c2ln";

        assert_eq!(codec().verify(token), Err(TokenError::MalformedToken));
    }

    #[test]
    fn test_token_error_display() {
        assert_eq!(TokenError::MalformedToken.to_string(), "malformed token");
        assert_eq!(
            TokenError::UnexpectedAlgorithm.to_string(),
            "unexpected signing method"
        );
        assert_eq!(
            TokenError::SignatureInvalid.to_string(),
            "invalid token signature"
        );
        assert_eq!(TokenError::Expired.to_string(), "token is expired");
        assert_eq!(TokenError::IssuerMismatch.to_string(), "issuer is invalid");
        assert_eq!(
            TokenError::Signing("boom".to_string()).to_string(),
            "could not sign token: boom"
        );
    }
}
