//! Test that expired access tokens are rejected.

use axum::http::StatusCode;
use jsonwebtoken::get_current_timestamp;

use crate::auth::Claims;
use crate::e2e_tests::helpers::*;

#[test]
fn test_expired_access_token_rejected() {
    let test = TestGateway::new();
    let codec = test.codec();
    let token = codec
        .issue(&Claims::access(codec.issuer(), get_current_timestamp() - 10))
        .expect("Failed to issue token");

    let resp = test.validate(&token);
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&resp), "could not parse token: token is expired");
}

#[test]
fn test_future_access_token_accepted() {
    let test = TestGateway::new();
    let codec = test.codec();
    let token = codec
        .issue(&Claims::access(codec.issuer(), get_current_timestamp() + 60))
        .expect("Failed to issue token");

    assert_eq!(test.validate(&token).status, StatusCode::OK);
}

#[test]
fn test_foreign_issuer_rejected() {
    let test = TestGateway::new();
    let token = test
        .codec()
        .issue(&Claims::identity("someone-else", APP_NAME))
        .expect("Failed to issue token");

    let resp = test.identity(&token);
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&resp), "could not parse token: issuer is invalid");
}
