//! BHP Connect API server.
//!
//! Loads configuration, connects to PostgreSQL, runs migrations, wires the
//! stores into the API and serves it until SIGINT or SIGTERM.

mod bootstrap;
mod config;
mod logging;
mod openapi;
mod reconcile;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use connect_api::{Backends, ConnectState, SessionKeys};
use connect_auth::PasswordHasher;
use connect_db::{
    run_migrations, DbPool, PgArtifactStore, PgAuditStore, PgDirectoryStore, PgMessageStore,
    PgWorkflowStore,
};
use connect_governance::{LocalObjectStorage, LoggingEmailSender};
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, INSECURE_STORAGE_SECRET};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        env = %config.app_env,
        "Starting BHP Connect API"
    );

    if config.storage_signing_secret == INSECURE_STORAGE_SECRET {
        tracing::warn!(
            target: "security",
            "Using the development STORAGE_SIGNING_SECRET (allowed in {} mode)",
            config.app_env
        );
    }

    let pool = match DbPool::connect_with(&config.database_url, config.db_max_connections).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };
    info!(max_connections = config.db_max_connections, "Database pool created");

    if let Err(e) = run_migrations(&pool).await {
        tracing::error!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    let directory = PgDirectoryStore::new(pool.clone());
    let passwords = PasswordHasher::new();

    if let Some(admin) = &config.bootstrap_admin {
        if let Err(e) = bootstrap::ensure_admin(&directory, admin, &passwords).await {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.storage_dir).await {
        tracing::error!(
            "Failed to create storage directory {}: {e}",
            config.storage_dir.display()
        );
        std::process::exit(1);
    }
    let storage = Arc::new(LocalObjectStorage::new(
        config.storage_dir.clone(),
        config.public_base_url.clone(),
        config.storage_signing_secret.as_bytes().to_vec(),
    ));

    let state = ConnectState::new(
        Backends {
            directory: Arc::new(directory),
            workflows: Arc::new(PgWorkflowStore::new(pool.clone())),
            artifacts: Arc::new(PgArtifactStore::new(pool.clone())),
            messages: Arc::new(PgMessageStore::new(pool.clone())),
            audit: Arc::new(PgAuditStore::new(pool.clone())),
            storage: storage.clone(),
            email: Arc::new(LoggingEmailSender),
        },
        SessionKeys::new(
            config.jwt_private_key.clone(),
            config.jwt_public_key.clone(),
            config.session_ttl_secs,
        ),
        chrono::Duration::seconds(config.signed_url_ttl_secs),
    )
    .with_files(storage)
    .with_password_hasher(passwords);

    let reconciler = (config.reconcile_interval_secs > 0).then(|| {
        info!(
            interval_secs = config.reconcile_interval_secs,
            "Artifact reconciliation scheduled"
        );
        reconcile::spawn_reconciler(
            state.artifacts.clone(),
            Duration::from_secs(config.reconcile_interval_secs),
        )
    });

    let app = connect_api::router(state)
        .merge(openapi::openapi_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins));

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    info!(%addr, "Server listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    if let Some(handle) = reconciler {
        handle.abort();
    }
    info!("Server shutdown complete");
}

/// CORS for the configured browser origins. No origins means same-origin only.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
