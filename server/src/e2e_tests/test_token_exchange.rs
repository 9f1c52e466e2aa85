//! Test the client credentials exchange at the token endpoint.

use axum::http::StatusCode;

use crate::auth::{Credential, CredentialRegistry};
use crate::e2e_tests::helpers::*;

#[test]
fn test_token_exchange_ok() {
    let test = TestGateway::new();

    let resp = test.request_token(CLIENT_ID, CLIENT_SECRET);
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["token_type"], "Bearer");
    assert_eq!(resp.body["expires_in"], 3600);
    assert_eq!(
        resp.body["access_token"]
            .as_str()
            .map(|t| t.split('.').count()),
        Some(3)
    );
    assert_eq!(
        resp.body["id_token"].as_str().map(|t| t.split('.').count()),
        Some(3)
    );
}

#[test]
fn test_token_exchange_configured_ttl() {
    let blob = CredentialRegistry::from_credentials([Credential::new(
        CLIENT_ID,
        CLIENT_SECRET,
        APP_NAME,
    )])
    .expect("Failed to build registry")
    .to_blob();
    let test = TestGateway::from_vars(&[
        ("GATEWAY_IAM_USERS", blob.as_str()),
        ("GATEWAY_IAM_SECRET", SECRET),
        ("GATEWAY_TOKEN_TTL_SECS", "60"),
    ]);

    let resp = test.request_token(CLIENT_ID, CLIENT_SECRET);
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["expires_in"], 60);
}

#[test]
fn test_token_exchange_wrong_secret() {
    let test = TestGateway::new();

    let resp = test.request_token(CLIENT_ID, "<other>");
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&resp), "user not authorized to use iam service");
}

#[test]
fn test_token_exchange_unknown_client() {
    let test = TestGateway::new();

    let resp = test.request_token("<unknown>", CLIENT_SECRET);
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_token_exchange_missing_fields() {
    let test = TestGateway::new();

    for body in [
        "",
        "client_secret=<client_secret>&grant_type=client_credentials",
        "client_id=<client_id>&grant_type=client_credentials",
        "client_id=&client_secret=",
    ] {
        let resp = test.post_form(body);
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert!(
            error_message(&resp).starts_with("invalid input"),
            "body {body:?}"
        );
    }
}

#[test]
fn test_token_exchange_secret_of_other_client() {
    let test = TestGateway::with_credentials(
        &[("a", "secret-a", "App A"), ("b", "secret-b", "App B")],
        SECRET,
    );

    assert_eq!(
        test.request_token("a", "secret-b").status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(test.request_token("b", "secret-b").status, StatusCode::OK);
}

#[test]
fn test_token_exchange_is_unique() {
    let test = TestGateway::new();

    let (first_access, first_identity) = test.issue_tokens();
    let (second_access, second_identity) = test.issue_tokens();
    assert_ne!(first_access, second_access);
    // Identity tokens carry no time or random claims.
    assert_eq!(first_identity, second_identity);
}

#[test]
fn test_token_exchange_ignores_content_type() {
    let test = TestGateway::new();
    let body = "client_id=<client_id>&client_secret=<client_secret>&grant_type=client_credentials";

    for content_type in [None, Some("text/plain")] {
        let resp = test.post_token_body(content_type, body);
        assert_eq!(resp.status, StatusCode::OK, "{content_type:?}");

        let id_token = resp.body["id_token"].as_str().expect("id_token missing");
        assert_eq!(test.identity(id_token).body["identity"], APP_NAME);
    }
}

#[test]
fn test_token_exchange_unsupported_grant() {
    let test = TestGateway::new();

    let resp = test.post_token_body(
        Some("text/plain"),
        "client_id=<client_id>&client_secret=<client_secret>&grant_type=password",
    );
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&resp), "unsupported grant_type: password");
}
