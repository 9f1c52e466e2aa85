//! Common helpers for end-to-end tests.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::api::{self, header};
use crate::auth::{AuthService, Credential, CredentialRegistry, SigningKey, TokenCodec};
use crate::config::ServerConfig;

pub const CLIENT_ID: &str = "<client_id>";
pub const CLIENT_SECRET: &str = "<client_secret>";
pub const APP_NAME: &str = "<ocp>";
pub const SECRET: &str = "test";

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

/// A gateway running in-process, driven through its router.
pub struct TestGateway {
    router: Router,
    service: Arc<AuthService>,
    pub runtime: tokio::runtime::Runtime,
}

impl TestGateway {
    /// Gateway with the default single client and a non-empty secret.
    #[must_use]
    pub fn new() -> Self {
        Self::with_credentials(&[(CLIENT_ID, CLIENT_SECRET, APP_NAME)], SECRET)
    }

    /// Gateway with the given `(client_id, client_secret, app_name)` entries.
    #[must_use]
    pub fn with_credentials(credentials: &[(&str, &str, &str)], secret: &str) -> Self {
        let registry = CredentialRegistry::from_credentials(
            credentials
                .iter()
                .map(|(id, client_secret, app)| Credential::new(*id, *client_secret, *app)),
        )
        .expect("Failed to build registry");
        let blob = registry.to_blob();
        Self::from_vars(&[
            ("GATEWAY_IAM_USERS", blob.as_str()),
            ("GATEWAY_IAM_SECRET", secret),
        ])
    }

    /// Gateway configured from the given environment variables.
    #[must_use]
    pub fn from_vars(vars: &[(&str, &str)]) -> Self {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let config = ServerConfig::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
        .expect("Failed to load configuration");
        let registry = config.registry().expect("Failed to decode credentials");

        let service = Arc::new(
            AuthService::new(registry, SigningKey::hs512(config.secret()))
                .with_expiration_interval(config.token_ttl),
        );
        let router = api::router(Arc::clone(&service));
        let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

        Self {
            router,
            service,
            runtime,
        }
    }

    /// Codec of the running service, for crafting tokens.
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        self.service.codec()
    }

    /// Send a request and capture the response.
    pub fn send(&self, request: Request<Body>) -> TestResponse {
        self.runtime.block_on(async {
            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("Router failed");
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("Failed to read body");
            let body = if bytes.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&bytes).expect("Body is not JSON")
            };
            TestResponse { status, body }
        })
    }

    /// `GET` a route.
    pub fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .uri(api::full_path(path))
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request)
    }

    /// Post a raw form body to the token endpoint.
    pub fn post_form(&self, body: &str) -> TestResponse {
        self.post_token_body(Some("application/x-www-form-urlencoded"), body)
    }

    /// Post `body` to the token endpoint under an arbitrary content type.
    pub fn post_token_body(&self, content_type: Option<&str>, body: &str) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(api::full_path(api::TOKEN_PATH));
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request)
    }

    /// Request a token pair with the client credentials grant.
    pub fn request_token(&self, client_id: &str, client_secret: &str) -> TestResponse {
        self.post_form(&format!(
            "client_id={client_id}&client_secret={client_secret}&grant_type=client_credentials"
        ))
    }

    /// Post to `path` with the raw header `name: value`, if any.
    pub fn post_header(&self, path: &str, header: Option<(&str, &str)>) -> TestResponse {
        let mut builder = Request::builder().method("POST").uri(api::full_path(path));
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        self.send(builder.body(Body::empty()).expect("Failed to build request"))
    }

    /// Validate an access token sent in the conventional header format.
    pub fn validate(&self, token: &str) -> TestResponse {
        let value = header::format_token(header::AUTHORIZATION_HEADER, token);
        self.post_header(
            api::VALIDATE_PATH,
            Some((header::AUTHORIZATION_HEADER, value.as_str())),
        )
    }

    /// Resolve an identity token sent in the conventional header format.
    pub fn identity(&self, token: &str) -> TestResponse {
        let value = header::format_token(header::IDENTITY_HEADER, token);
        self.post_header(api::IDENTITY_PATH, Some((header::IDENTITY_HEADER, value.as_str())))
    }

    /// Issue a token pair and return `(access_token, id_token)`.
    pub fn issue_tokens(&self) -> (String, String) {
        let resp = self.request_token(CLIENT_ID, CLIENT_SECRET);
        assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
        (
            resp.body["access_token"]
                .as_str()
                .expect("access_token missing")
                .to_string(),
            resp.body["id_token"]
                .as_str()
                .expect("id_token missing")
                .to_string(),
        )
    }
}

/// The `error` field of a failure body.
#[must_use]
pub fn error_message(resp: &TestResponse) -> &str {
    resp.body["error"].as_str().expect("error field missing")
}
