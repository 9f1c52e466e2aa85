//! Test access token validation through the `Authorization` header.

use axum::http::StatusCode;

use crate::api::VALIDATE_PATH;
use crate::api::header::AUTHORIZATION_HEADER;
use crate::e2e_tests::helpers::*;

#[test]
fn test_validate_issued_token() {
    let test = TestGateway::new();
    let (access_token, _) = test.issue_tokens();

    let resp = test.validate(&access_token);
    assert_eq!(resp.status, StatusCode::OK);
}

#[test]
fn test_validate_identity_token_is_accepted() {
    // Any token the gateway signed is a valid bearer.
    let test = TestGateway::new();
    let (_, id_token) = test.issue_tokens();

    assert_eq!(test.validate(&id_token).status, StatusCode::OK);
}

#[test]
fn test_validate_missing_header() {
    let test = TestGateway::new();

    let resp = test.post_header(VALIDATE_PATH, None);
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(&resp),
        "token not present in header Authorization"
    );
}

#[test]
fn test_validate_bad_header_format() {
    let test = TestGateway::new();
    let (access_token, _) = test.issue_tokens();

    let resp = test.post_header(VALIDATE_PATH, Some((AUTHORIZATION_HEADER, access_token.as_str())));
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&resp), "bad header format for Authorization");
}

#[test]
fn test_validate_garbage_token() {
    let test = TestGateway::new();

    let resp = test.validate("token");
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&resp), "could not parse token: malformed token");
}

#[test]
fn test_validate_token_from_other_gateway() {
    let issuer = TestGateway::new();
    let verifier = TestGateway::with_credentials(&[(CLIENT_ID, CLIENT_SECRET, APP_NAME)], "other");
    let (access_token, _) = issuer.issue_tokens();

    let resp = verifier.validate(&access_token);
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        error_message(&resp),
        "could not parse token: invalid token signature"
    );
}

#[test]
fn test_validate_tampered_token() {
    let test = TestGateway::new();
    let (access_token, _) = test.issue_tokens();
    let (_, id_token) = test.issue_tokens();

    // Graft the identity payload onto the access token signature.
    let access: Vec<&str> = access_token.split('.').collect();
    let identity: Vec<&str> = id_token.split('.').collect();
    let forged = format!("{}.{}.{}", access[0], identity[1], access[2]);

    assert_eq!(test.validate(&forged).status, StatusCode::UNAUTHORIZED);
}
