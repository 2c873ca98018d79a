use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use super::api::{self, AppState, SharedState};
use super::dynamo::DynamoPollStore;
use super::store::{MemoryPollStore, PollStore};
use super::ws::{self, Notifier};
use crate::config::{StoreBackend, StoreSection, VotingConfig};

/// Build the application router with the HTTP API and the realtime socket.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// CORS with credentials. An empty origin list mirrors the request origin.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::very_permissive());
    }

    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid CORS origin '{}'", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

/// Open the configured poll store.
pub async fn open_store(settings: &StoreSection) -> Arc<dyn PollStore> {
    match settings.backend {
        StoreBackend::Dynamo => {
            let store = DynamoPollStore::connect(
                settings.table_name.clone(),
                settings.region.clone(),
                settings.endpoint_url.clone(),
            )
            .await;
            info!(table = %store.table(), "using DynamoDB poll store");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            info!("using in-memory poll store");
            Arc::new(MemoryPollStore::new())
        }
    }
}

/// Start the voting server.
///
/// The store and notifier are ready before the listener binds, so no
/// request can observe them uninitialized.
pub async fn start_server(config: VotingConfig) -> Result<()> {
    config.ensure_valid()?;

    let store = open_store(&config.store).await;
    let notifier = Notifier::new(config.realtime.channel_capacity);
    let state = AppState::builder()
        .store(store)
        .notifier(notifier)
        .build()
        .context("Failed to initialize application state")?;

    let app = build_router(state)
        .layer(cors_layer(&config.server.cors_origins)?)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, "voting server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
