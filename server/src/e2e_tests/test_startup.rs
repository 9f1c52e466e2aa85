//! Test how configuration problems surface at startup.

use crate::auth::RegistryError;
use crate::config::{ConfigError, ServerConfig};

fn load(vars: &[(&str, &str)]) -> Result<crate::auth::CredentialRegistry, ConfigError> {
    ServerConfig::from_lookup(|name| {
        vars.iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| (*v).to_string())
    })?
    .registry()
}

#[test]
fn test_startup_without_users() {
    assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn test_startup_with_bad_blob() {
    assert!(matches!(
        load(&[("GATEWAY_IAM_USERS", "not base64!")]),
        Err(ConfigError::Credentials(RegistryError::Base64(_)))
    ));
}

#[test]
fn test_startup_with_non_json_blob() {
    // base64 of "hello"
    assert!(matches!(
        load(&[("GATEWAY_IAM_USERS", "aGVsbG8=")]),
        Err(ConfigError::Credentials(RegistryError::Json(_)))
    ));
}

#[test]
fn test_startup_with_duplicate_client() {
    // base64 of {"a":{"client_secret":"x","app_name":"A"},"a":{"client_secret":"y","app_name":"B"}}
    let blob = "eyJhIjp7ImNsaWVudF9zZWNyZXQiOiJ4IiwiYXBwX25hbWUiOiJBIn0sImEiOnsiY2xpZW50X3NlY3JldCI6InkiLCJhcHBfbmFtZSI6IkIifX0=";
    assert_eq!(
        load(&[("GATEWAY_IAM_USERS", blob)]),
        Err(ConfigError::Credentials(RegistryError::DuplicateClientId(
            "a".to_string()
        )))
    );
}
