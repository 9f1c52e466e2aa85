//! Test the complete exchange: credentials to tokens, then both tokens
//! back through the gateway.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

#[test]
fn test_full_flow() {
    let test = TestGateway::new();

    let resp = test.request_token(CLIENT_ID, CLIENT_SECRET);
    assert_eq!(resp.status, StatusCode::OK);
    let access_token = resp.body["access_token"]
        .as_str()
        .expect("access_token missing");
    let id_token = resp.body["id_token"].as_str().expect("id_token missing");

    assert_eq!(test.validate(access_token).status, StatusCode::OK);

    let resp = test.identity(id_token);
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["identity"], APP_NAME);
}

#[test]
fn test_tokens_survive_gateway_restart() {
    // A second instance with the same secret accepts the first one's tokens.
    let first = TestGateway::new();
    let (access_token, id_token) = first.issue_tokens();
    drop(first);

    let second = TestGateway::new();
    assert_eq!(second.validate(&access_token).status, StatusCode::OK);
    assert_eq!(second.identity(&id_token).body["identity"], APP_NAME);
}
