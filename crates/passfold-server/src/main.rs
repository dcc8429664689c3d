//! Passfold server entry point.
//!
//! Bootstraps the storage backend, secret codec, core stores, and the
//! bootstrap admin account, then starts the Axum HTTP server with graceful
//! shutdown.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tracing::{info, warn};

use passfold_core::account::AccountDirectory;
use passfold_core::credential::CredentialStore;
use passfold_core::crypto::{EncryptionKey, SecretCipher};
use passfold_core::folder::FolderStore;
use passfold_core::organizer::Organizer;
use passfold_storage::MemoryBackend;

use passfold_server::config::{ServerConfig, StorageBackendType};
use passfold_server::hardening;
use passfold_server::routes;
use passfold_server::state::AppState;

use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment.
    let config = ServerConfig::from_env();

    // Production hardening: disable core dumps (always) and lock memory
    // (unless disabled). These run before logging is initialized, so we use
    // eprintln for warnings.
    apply_hardening(&config);

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = ?config.storage_backend, "Passfold starting");

    // A wrong-length key is a configuration error, fatal at startup.
    let key = EncryptionKey::parse(&config.encryption_key)
        .context("PASSFOLD_ENCRYPTION_KEY must be 32 raw bytes or 64 hex characters")?;
    if config.uses_default_key() {
        warn!("PASSFOLD_ENCRYPTION_KEY is unset — using the well-known development key; do NOT run production like this");
    }

    let state = build_app_state(&config, key)?;

    // Create the admin/admin bootstrap account on first start.
    state
        .accounts
        .ensure_bootstrap_admin()
        .await
        .context("failed to create bootstrap admin account")?;

    let app = build_router(Arc::clone(&state));

    // Bind and serve.
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Passfold server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Passfold server stopped");
    Ok(())
}

/// Build the shared application state.
///
/// Every component receives its storage backend and codec explicitly — the
/// only place they are constructed is here.
fn build_app_state(config: &ServerConfig, key: EncryptionKey) -> anyhow::Result<Arc<AppState>> {
    let storage: Arc<dyn passfold_storage::StorageBackend> = match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            Arc::new(MemoryBackend::new())
        }
        #[cfg(feature = "redb-backend")]
        StorageBackendType::Redb { path } => {
            info!(path = %path, "using redb storage");
            Arc::new(
                passfold_storage::RedbBackend::open(path)
                    .context("failed to open redb storage")?,
            )
        }
        #[cfg(not(feature = "redb-backend"))]
        StorageBackendType::Redb { .. } => {
            anyhow::bail!("redb backend requested but feature 'redb-backend' is not enabled");
        }
    };

    let cipher = Arc::new(SecretCipher::new(key));

    let folders = Arc::new(FolderStore::new(Arc::clone(&storage)));
    let credentials = Arc::new(CredentialStore::new(
        Arc::clone(&storage),
        Arc::clone(&cipher),
    ));
    let organizer = Arc::new(Organizer::new(
        Arc::clone(&folders),
        Arc::clone(&credentials),
    ));
    let accounts = Arc::new(AccountDirectory::new(storage, cipher));

    Ok(Arc::new(AppState {
        folders,
        credentials,
        organizer,
        accounts,
    }))
}

/// Build the Axum router with all routes and middleware.
fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/auth", routes::auth::router())
        .nest("/api/folders", routes::folders::router())
        .nest("/api/credentials", routes::credentials::router())
        .nest("/api/accounts", routes::accounts::router())
        .nest("/api", routes::folders::views_router())
        .merge(routes::sys::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}

/// Apply production hardening before logging is initialized.
///
/// Uses `eprintln` because structured logging is not yet available.
#[allow(clippy::print_stderr)]
fn apply_hardening(config: &ServerConfig) {
    if let Err(e) = hardening::disable_core_dumps() {
        eprintln!("WARNING: failed to disable core dumps: {e}");
    }

    if config.disable_mlock {
        eprintln!(
            "WARNING: mlock disabled via PASSFOLD_DISABLE_MLOCK — secrets may be swapped to disk"
        );
    } else if let Err(e) = hardening::lock_memory() {
        eprintln!("WARNING: failed to lock memory: {e} (set PASSFOLD_DISABLE_MLOCK=true for dev)");
    }
}
