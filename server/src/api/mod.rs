//! HTTP transport.
//!
//! Maps HTTP requests onto [`AuthService`] calls and service results onto
//! status codes. All routes live under [`PATH_PREFIX`]:
//!
//! | Method | Path           | Success | Failures                     |
//! |--------|----------------|---------|------------------------------|
//! | GET    | `health`       | 200     | 500 degraded, 503 unavailable |
//! | GET    | `ready`        | 200     | 503                          |
//! | POST   | `oauth/token`  | 200     | 400 bad form, 401 rejected   |
//! | POST   | `validate`     | 200     | 400 bad header, 401 rejected |
//! | POST   | `identity`     | 200     | 400 bad header, 401 rejected |
//!
//! The service itself never logs; request outcomes are logged here.

pub mod header;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, AuthService, Health, HealthStatus, TokenError};
use header::{AUTHORIZATION_HEADER, HeaderError, IDENTITY_HEADER, extract_token};

/// Prefix shared by all routes.
pub const PATH_PREFIX: &str = "/v1";
pub const HEALTH_PATH: &str = "/health";
pub const READY_PATH: &str = "/ready";
pub const TOKEN_PATH: &str = "/oauth/token";
pub const VALIDATE_PATH: &str = "/validate";
pub const IDENTITY_PATH: &str = "/identity";

/// The only grant type accepted by the token endpoint.
pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// Full path of a route, prefix included.
#[must_use]
pub fn full_path(path: &str) -> String {
    format!("{PATH_PREFIX}{path}")
}

#[derive(Clone)]
struct AppState {
    service: Arc<AuthService>,
}

/// Build the router for `service`.
#[must_use]
pub fn router(service: Arc<AuthService>) -> Router {
    let routes = Router::new()
        .route(HEALTH_PATH, get(health))
        .route(READY_PATH, get(ready))
        .route(TOKEN_PATH, post(token))
        .route(VALIDATE_PATH, post(validate))
        .route(IDENTITY_PATH, post(identity));

    Router::new()
        .nest(PATH_PREFIX, routes)
        .with_state(AppState { service })
}

/// Form body of a token request.
///
/// Decoded as URL-encoded pairs whatever the request's `Content-Type`, so
/// clients posting `text/plain` or no content type at all are served.
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub grant_type: Option<String>,
}

/// Successful token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Successful identity response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub identity: String,
}

/// Error body returned with every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request: status code plus message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let status = match &error {
            e if !e.is_client_error() => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized | AuthError::Token(_) | AuthError::Configuration(_) => {
                StatusCode::UNAUTHORIZED
            }
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl From<HeaderError> for ApiError {
    fn from(error: HeaderError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let health = state.service.health();
    let status = match health.status {
        HealthStatus::Alive => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::INTERNAL_SERVER_ERROR,
        HealthStatus::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    if status != StatusCode::OK {
        tracing::warn!("health check reports {:?}: {}", health.status, health.detail);
    }
    (status, Json(health))
}

async fn ready(State(state): State<AppState>) -> StatusCode {
    match state.service.ready() {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::info!("service is not ready: {e}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn token(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let request: TokenRequest = serde_urlencoded::from_bytes(&body).map_err(|e| {
        tracing::debug!("rejecting token request: {e}");
        ApiError::bad_request(format!("failed to parse form body: {e}"))
    })?;

    if let Some(grant_type) = request.grant_type.as_deref()
        && grant_type != CLIENT_CREDENTIALS_GRANT
    {
        tracing::debug!("rejecting token request with grant_type={grant_type}");
        return Err(ApiError::bad_request(format!(
            "unsupported grant_type: {grant_type}"
        )));
    }

    let client_id = request.client_id.unwrap_or_default();
    let client_secret = request.client_secret.unwrap_or_default();

    let pair = state
        .service
        .verify_credentials(&client_id, &client_secret)
        .map_err(|e| {
            tracing::warn!("token request for client {client_id} rejected: {e}");
            ApiError::from(e)
        })?;

    tracing::debug!("issued tokens for client {client_id}");
    Ok(Json(TokenResponse {
        access_token: pair.access_token,
        id_token: pair.identity_token,
        token_type: "Bearer".to_string(),
        expires_in: pair.expires_in,
    }))
}

async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(&headers, AUTHORIZATION_HEADER).inspect_err(|e| {
        tracing::debug!("rejecting validate request: {e}");
    })?;

    state.service.resolve_subject(token).map_err(|e| {
        tracing::warn!("access token rejected: {e}");
        ApiError::from(e)
    })?;

    Ok(StatusCode::OK)
}

async fn identity(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<IdentityResponse>, ApiError> {
    let token = extract_token(&headers, IDENTITY_HEADER).inspect_err(|e| {
        tracing::debug!("rejecting identity request: {e}");
    })?;

    let identity = state.service.resolve_subject(token).map_err(|e| {
        tracing::warn!("identity token rejected: {e}");
        ApiError::from(e)
    })?;

    Ok(Json(IdentityResponse { identity }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, CredentialRegistry, RegistryError, SigningKey};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn service(secret: &[u8]) -> Arc<AuthService> {
        let registry = CredentialRegistry::from_credentials([Credential::new(
            "<client_id>",
            "<client_secret>",
            "<ocp>",
        )])
        .expect("build registry");
        Arc::new(AuthService::new(registry, SigningKey::hs512(secret.to_vec())))
    }

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(full_path(TOKEN_PATH))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("build request")
    }

    fn header_request(path: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(full_path(path));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).expect("build request")
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("decode body")
    }

    #[test]
    fn test_full_path() {
        assert_eq!(full_path(TOKEN_PATH), "/v1/oauth/token");
    }

    #[tokio::test]
    async fn test_health_alive() {
        let request = Request::builder()
            .uri(full_path(HEALTH_PATH))
            .body(Body::empty())
            .expect("build request");
        let response = router(service(b"test")).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["status"], "Alive");
    }

    #[tokio::test]
    async fn test_health_degraded() {
        let request = Request::builder()
            .uri(full_path(HEALTH_PATH))
            .body(Body::empty())
            .expect("build request");
        let response = router(service(b"")).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["status"], "Degraded");
        assert_eq!(body["iam"], "insecure secret");
    }

    #[tokio::test]
    async fn test_health_unavailable() {
        let service = Arc::new(AuthService::new(
            CredentialRegistry::default(),
            SigningKey::hs512(b"test".to_vec()),
        ));
        let request = Request::builder()
            .uri(full_path(HEALTH_PATH))
            .body(Body::empty())
            .expect("build request");
        let response = router(service).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ready_with_empty_registry() {
        let service = Arc::new(AuthService::new(
            CredentialRegistry::default(),
            SigningKey::hs512(Vec::new()),
        ));
        let request = Request::builder()
            .uri(full_path(READY_PATH))
            .body(Body::empty())
            .expect("build request");
        let response = router(service).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_ok() {
        let response = router(service(b"test"))
            .oneshot(form_request(
                "client_id=<client_id>&client_secret=<client_secret>&grant_type=client_credentials",
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: TokenResponse = body_json(response).await;
        assert!(!body.access_token.is_empty());
        assert!(!body.id_token.is_empty());
        assert_eq!(body.token_type, "Bearer");
        assert_eq!(body.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_token_without_grant_type() {
        let response = router(service(b"test"))
            .oneshot(form_request("client_id=<client_id>&client_secret=<client_secret>"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_wrong_secret() {
        let response = router(service(b"test"))
            .oneshot(form_request(
                "client_id=<client_id>&client_secret=<other>&grant_type=client_credentials",
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.error, "user not authorized to use iam service");
    }

    #[tokio::test]
    async fn test_token_client_id_missing() {
        let response = router(service(b"test"))
            .oneshot(form_request(
                "client_secret=<client_secret>&grant_type=client_credentials",
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_client_secret_missing() {
        let response = router(service(b"test"))
            .oneshot(form_request("client_id=<client_id>"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_unsupported_grant_type() {
        let response = router(service(b"test"))
            .oneshot(form_request(
                "client_id=<client_id>&client_secret=<client_secret>&grant_type=password",
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn raw_token_request(content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(full_path(TOKEN_PATH));
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        builder
            .body(Body::from(body.to_string()))
            .expect("build request")
    }

    #[tokio::test]
    async fn test_token_any_content_type() {
        let body =
            "client_id=<client_id>&client_secret=<client_secret>&grant_type=client_credentials";
        for content_type in [None, Some("text/plain"), Some("application/json")] {
            let response = router(service(b"test"))
                .oneshot(raw_token_request(content_type, body))
                .await
                .expect("response");

            assert_eq!(response.status(), StatusCode::OK, "{content_type:?}");
            let body: TokenResponse = body_json(response).await;
            assert!(!body.access_token.is_empty(), "{content_type:?}");
        }
    }

    #[tokio::test]
    async fn test_token_unparseable_body() {
        let response = router(service(b"test"))
            .oneshot(raw_token_request(None, "client_id=a&client_id=b"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_json_body_is_missing_fields() {
        let response = router(service(b"test"))
            .oneshot(raw_token_request(Some("application/json"), "{}"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.error, "invalid input: no client id provided");
    }

    #[tokio::test]
    async fn test_validate_header_problems() {
        let cases: [&[(&str, &str)]; 3] = [
            &[],
            &[("Id", "token")],
            &[(AUTHORIZATION_HEADER, "token")],
        ];
        for headers in cases {
            let response = router(service(b"test"))
                .oneshot(header_request(VALIDATE_PATH, headers))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{headers:?}");
        }
    }

    #[tokio::test]
    async fn test_validate_random_token() {
        let response = router(service(b"test"))
            .oneshot(header_request(
                VALIDATE_PATH,
                &[(AUTHORIZATION_HEADER, "Authorization token")],
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_identity_header_problems() {
        let cases: [&[(&str, &str)]; 3] = [&[], &[("Id", "token")], &[(IDENTITY_HEADER, "token")]];
        for headers in cases {
            let response = router(service(b"test"))
                .oneshot(header_request(IDENTITY_PATH, headers))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{headers:?}");
        }
    }

    #[tokio::test]
    async fn test_identity_random_token() {
        let response = router(service(b"test"))
            .oneshot(header_request(
                IDENTITY_PATH,
                &[(IDENTITY_HEADER, "Identity token")],
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_identity_correct_token() {
        let service = service(b"test");
        let pair = service
            .verify_credentials("<client_id>", "<client_secret>")
            .expect("issue tokens");
        let value = header::format_token(IDENTITY_HEADER, &pair.identity_token);

        let response = router(service)
            .oneshot(header_request(IDENTITY_PATH, &[(IDENTITY_HEADER, value.as_str())]))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: IdentityResponse = body_json(response).await;
        assert_eq!(body.identity, "<ocp>");
    }

    #[test]
    fn test_api_error_status_mapping() {
        assert_eq!(
            ApiError::from(AuthError::InvalidInput("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthError::Unauthorized).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Token(TokenError::Expired)).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Token(TokenError::Signing("x".to_string()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AuthError::Configuration(RegistryError::EmptyBlob)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(HeaderError::Missing(IDENTITY_HEADER)).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
