//! Wiring shared by the commands: persistence backend selection, state
//! loading and the session/writer pair.

use labeler_config::AppConfig;
use labeler_core::persistence::{PersistedState, PersistenceGateway};
use labeler_core::random::{RandomSource, SeededRandom, ThreadRandom};
use labeler_engine::{
    Catalog, IdentityRule, PersistenceHandle, PersistenceWriter, SessionController, WriterStats,
};
use labeler_store::{FileGateway, HttpGateway, InMemoryGateway, NoopGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Pick the persistence backend named by the config.
pub fn persistence_gateway(
    config: &AppConfig,
    ephemeral: bool,
) -> Result<Arc<dyn PersistenceGateway>, Box<dyn std::error::Error>> {
    if ephemeral {
        return Ok(Arc::new(InMemoryGateway::new()));
    }

    let gateway: Arc<dyn PersistenceGateway> = match config.persistence.backend.as_str() {
        "file" => Arc::new(FileGateway::new(config.state_path())),
        "http" => {
            let endpoint = config
                .persistence
                .endpoint
                .clone()
                .ok_or("persistence.endpoint is required for the http backend")?;
            let timeout = Duration::from_secs(config.persistence.timeout_secs);
            Arc::new(HttpGateway::new(endpoint, timeout)?)
        }
        "memory" => Arc::new(InMemoryGateway::new()),
        "none" => Arc::new(NoopGateway),
        other => return Err(format!("Unknown persistence backend: {other}").into()),
    };
    Ok(gateway)
}

/// Load the stored document. Failures are logged and treated as empty.
pub async fn load_state(gateway: &dyn PersistenceGateway) -> Option<PersistedState> {
    match gateway.load().await {
        Ok(Some(state)) => {
            info!(backend = gateway.name(), users = state.users.len(), "Stored state loaded");
            Some(state)
        }
        Ok(None) => {
            info!(backend = gateway.name(), "No stored state, starting empty");
            None
        }
        Err(e) => {
            warn!(backend = gateway.name(), error = %e, "Failed to load stored state, starting empty");
            None
        }
    }
}

/// Seeded randomness when `session.seed` is set, OS randomness otherwise.
pub fn random_source(config: &AppConfig) -> Box<dyn RandomSource> {
    match config.session.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    }
}

/// A hydrated session plus its background persistence writer.
pub struct Runtime {
    pub session: SessionController,
    handle: PersistenceHandle,
    writer: JoinHandle<WriterStats>,
    backend: String,
}

impl Runtime {
    /// Build a session over `catalog`, hydrate it from the configured
    /// backend and start the writer.
    pub async fn open(
        config: &AppConfig,
        catalog: Catalog,
        ephemeral: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let gateway = persistence_gateway(config, ephemeral)?;
        let identity_rule: IdentityRule = config.session.identity_rule.parse()?;

        let mut session = SessionController::new(Arc::new(catalog))
            .with_random(random_source(config))
            .with_identity_rule(identity_rule)
            .with_categories(config.session.default_categories.iter().cloned());

        if let Some(state) = load_state(gateway.as_ref()).await {
            session.hydrate(state);
        }

        let backend = gateway.name().to_string();
        let (handle, writer) = PersistenceWriter::spawn(gateway);
        let session = session.with_persistence(handle.clone());

        Ok(Self {
            session,
            handle,
            writer,
            backend,
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Wait for pending writes and stop the writer.
    pub async fn shutdown(self) -> WriterStats {
        let Self {
            session,
            handle,
            writer,
            ..
        } = self;

        handle.flush().await;
        drop(session);
        drop(handle);

        match writer.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Persistence writer task failed");
                WriterStats::default()
            }
        }
    }
}
