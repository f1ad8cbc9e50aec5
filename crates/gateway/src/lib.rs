//! HTTP state server for Labeler.
//!
//! Serves the persisted state document to labeling clients using the `http`
//! persistence backend, and exposes the two reporting exports computed from
//! whatever is currently stored.
//!
//! Each client posts its full snapshot and the last write wins, so sharing is
//! sequential: one active operator at a time.
//!
//! Built on Axum.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
};
use labeler_core::persistence::{PersistedState, PersistenceGateway};
use labeler_core::random::ThreadRandom;
use labeler_core::record::UserRecord;
use labeler_engine::export::{self, GlobalExport, UserExport};
use labeler_store::FileGateway;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Maximum accepted state document size (16 MB).
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared state for the handlers.
pub struct ServerState {
    pub store: Arc<dyn PersistenceGateway>,
}

type SharedState = Arc<ServerState>;

/// Build the Axum router with all routes.
pub fn build_router(store: Arc<dyn PersistenceGateway>) -> Router {
    let state = Arc::new(ServerState { store });

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/state", get(load_handler).post(save_handler))
        .route("/api/export/users", get(export_users_handler))
        .route("/api/export/global", get(export_global_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the state server, storing the document in the configured state file.
pub async fn start(config: labeler_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let store = FileGateway::new(config.state_path());

    info!(addr = %addr, path = %store.path().display(), "State server starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve(listener, Arc::new(store)).await?;

    info!("State server stopped");
    Ok(())
}

/// Serve the router on an already-bound listener until Ctrl-C.
pub async fn serve(
    listener: tokio::net::TcpListener,
    store: Arc<dyn PersistenceGateway>,
) -> std::io::Result<()> {
    axum::serve(listener, build_router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.store.name().to_string(),
    })
}

async fn load_handler(
    State(state): State<SharedState>,
) -> Result<Json<PersistedState>, StatusCode> {
    match stored(&state).await? {
        Some(doc) => Ok(Json(doc)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn save_handler(
    State(state): State<SharedState>,
    Json(doc): Json<PersistedState>,
) -> StatusCode {
    match state.store.save(&doc).await {
        Ok(()) => {
            info!(users = doc.users.len(), "State document replaced");
            StatusCode::NO_CONTENT
        }
        Err(e) => {
            error!(error = %e, "Failed to store state document");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn export_users_handler(
    State(state): State<SharedState>,
) -> Result<Json<UserExport>, StatusCode> {
    let doc = stored(&state).await?.unwrap_or_default();
    let users: BTreeMap<String, UserRecord> = doc
        .users
        .into_iter()
        .map(|(identity, user)| {
            let record = user.into_record(&identity);
            (identity, record)
        })
        .collect();
    Ok(Json(export::export_users(&users, &mut ThreadRandom)))
}

async fn export_global_handler(
    State(state): State<SharedState>,
) -> Result<Json<GlobalExport>, StatusCode> {
    let doc = stored(&state).await?.unwrap_or_default();
    Ok(Json(export::export_global(&doc.global_categories, &mut ThreadRandom)))
}

async fn stored(state: &ServerState) -> Result<Option<PersistedState>, StatusCode> {
    state.store.load().await.map_err(|e| {
        error!(error = %e, backend = state.store.name(), "Failed to read state document");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
