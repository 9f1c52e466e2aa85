//! Test the health and readiness endpoints.

use axum::http::StatusCode;

use crate::api::{HEALTH_PATH, READY_PATH};
use crate::e2e_tests::helpers::*;

#[test]
fn test_health_alive() {
    let test = TestGateway::new();

    let resp = test.get(HEALTH_PATH);
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["status"], "Alive");
    assert!(resp.body.get("iam").is_none());
}

#[test]
fn test_health_insecure_secret() {
    let test = TestGateway::with_credentials(&[(CLIENT_ID, CLIENT_SECRET, APP_NAME)], "");

    let resp = test.get(HEALTH_PATH);
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body["status"], "Degraded");
    assert_eq!(resp.body["iam"], "insecure secret");
}

#[test]
fn test_health_no_credentials() {
    // An empty JSON object is a valid, empty registry.
    let test = TestGateway::from_vars(&[
        ("GATEWAY_IAM_USERS", "e30="),
        ("GATEWAY_IAM_SECRET", SECRET),
    ]);

    let resp = test.get(HEALTH_PATH);
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.body["status"], "Unavailable");
    assert_eq!(resp.body["iam"], "No client credentials available");
}

#[test]
fn test_ready() {
    let test = TestGateway::with_credentials(&[(CLIENT_ID, CLIENT_SECRET, APP_NAME)], "");

    assert_eq!(test.get(READY_PATH).status, StatusCode::OK);
}

#[test]
fn test_unknown_route() {
    let test = TestGateway::new();

    assert_eq!(test.get("/nothing").status, StatusCode::NOT_FOUND);
}
