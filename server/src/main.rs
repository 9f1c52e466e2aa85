// Forbid unwrap() in production code to prevent panics from bad configuration.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::sync::Arc;

use gateway::api;
use gateway::auth::{AuthService, HealthStatus, SigningKey};
use gateway::config::ServerConfig;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment variables
    let config = ServerConfig::from_env();

    // RUST_LOG wins over GATEWAY_LOG_LEVEL when set.
    let default_filter = config
        .as_ref()
        .map_or("gateway=info", |c| c.log_level.filter());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!("Loaded configuration: {config:?}");

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("Failed to load client credentials: {e}");
            std::process::exit(1);
        }
    };
    let service = AuthService::new(registry, SigningKey::hs512(config.secret()))
        .with_expiration_interval(config.token_ttl);
    for app_name in service.registry().app_names() {
        tracing::info!("loaded user credentials for {app_name}");
    }
    let health = service.health();
    if health.status != HealthStatus::Alive {
        tracing::warn!("starting with {:?} health: {}", health.status, health.detail);
    }

    let app = api::router(Arc::new(service));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        });
    tracing::info!("listening on {addr}");

    let shutdown = Arc::new(Notify::new());
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected for shared state
    let server_shutdown = Arc::clone(&shutdown);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.notified().await })
            .await
    });

    tokio::select! {
        result = &mut server => {
            report_server_exit(result);
            return;
        }
        () = shutdown_signal() => {
            tracing::info!(
                "shutting down, draining requests for up to {:?}",
                config.shutdown_timeout
            );
        }
    }

    shutdown.notify_one();
    match tokio::time::timeout(config.shutdown_timeout, &mut server).await {
        Ok(result) => report_server_exit(result),
        Err(_) => {
            tracing::warn!("graceful shutdown timed out, aborting open connections");
            server.abort();
        }
    }
}

/// Log how the server task ended. Exits with status 1 on error.
fn report_server_exit(result: Result<std::io::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => tracing::info!("server stopped"),
        Ok(Err(e)) => {
            tracing::error!("Server error: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Server task failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Resolve on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
