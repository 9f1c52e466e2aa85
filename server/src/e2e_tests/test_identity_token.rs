//! Test identity resolution through the `Identity` header.

use axum::http::StatusCode;

use crate::api::IDENTITY_PATH;
use crate::api::header::IDENTITY_HEADER;
use crate::e2e_tests::helpers::*;

#[test]
fn test_identity_resolves_app_name() {
    let test = TestGateway::new();
    let (_, id_token) = test.issue_tokens();

    let resp = test.identity(&id_token);
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["identity"], APP_NAME);
}

#[test]
fn test_identity_per_client() {
    let test = TestGateway::with_credentials(
        &[("a", "secret-a", "App A"), ("b", "secret-b", "App B")],
        SECRET,
    );

    for (id, secret, app) in [("a", "secret-a", "App A"), ("b", "secret-b", "App B")] {
        let resp = test.request_token(id, secret);
        let id_token = resp.body["id_token"].as_str().expect("id_token missing");

        let resp = test.identity(id_token);
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["identity"], app);
    }
}

#[test]
fn test_identity_of_access_token_is_empty() {
    let test = TestGateway::new();
    let (access_token, _) = test.issue_tokens();

    let resp = test.identity(&access_token);
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["identity"], "");
}

#[test]
fn test_identity_header_problems() {
    let test = TestGateway::new();

    for header in [None, Some(("Id", "token")), Some((IDENTITY_HEADER, "token"))] {
        let resp = test.post_header(IDENTITY_PATH, header);
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{header:?}");
    }
}

#[test]
fn test_identity_garbage_token() {
    let test = TestGateway::new();

    assert_eq!(test.identity("token").status, StatusCode::UNAUTHORIZED);
}
