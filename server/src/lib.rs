#![cfg_attr(
    test,
    allow(clippy::disallowed_methods, clippy::expect_used, clippy::unwrap_used)
)]
// Life of a request:
// 1. HTTP request comes in under /v1
// 2. api extracts the form or token header
// 3. AuthService checks credentials against the registry, or verifies the
//    token with the codec
// 4. api maps the result onto a status code and JSON body
//
// System components:
//  - Credential registry, decoded once from the environment
//  - Token codec (HMAC signed JWTs)
//  - Auth service
//  - HTTP router
//  - HTTP client for services calling the gateway

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
mod e2e_tests;
