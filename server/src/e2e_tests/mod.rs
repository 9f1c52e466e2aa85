//! End-to-end tests at the HTTP request/response level.
//!
//! Each test file covers a specific scenario. Gateways are built the same
//! way the binary builds them: from configuration variables, through the
//! credential blob, into the router.

#![cfg(test)]

mod helpers;

mod test_expired_token;
mod test_health;
mod test_identity_token;
mod test_startup;
mod test_token_exchange;
mod test_token_flow;
mod test_validate_token;
