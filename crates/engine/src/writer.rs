//! Fire-and-forget persistence.
//!
//! The session submits a full snapshot after every mutation through a
//! [`PersistenceHandle`]. A background task drains the channel, keeps only
//! the newest queued snapshot, and hands it to the gateway. Failures are
//! logged and counted; they never reach the mutation path.

use labeler_core::persistence::{PersistedState, PersistenceGateway};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

enum WriteCommand {
    Save(Box<PersistedState>),
    Flush(oneshot::Sender<()>),
}

/// Counters reported when the writer task exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Snapshots the gateway accepted
    pub saved: usize,
    /// Snapshots the gateway failed to store
    pub failed: usize,
    /// Snapshots superseded by a newer one before they were written
    pub coalesced: usize,
}

/// Sending side of the persistence writer. Cheap to clone.
#[derive(Clone, Default)]
pub struct PersistenceHandle {
    tx: Option<mpsc::UnboundedSender<WriteCommand>>,
}

impl PersistenceHandle {
    /// A handle that drops every snapshot.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a snapshot for saving. Never blocks.
    pub fn submit(&self, state: PersistedState) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(WriteCommand::Save(Box::new(state))).is_err() {
            warn!("Persistence writer has stopped, snapshot dropped");
        }
    }

    /// Wait until every snapshot submitted before this call has been handled.
    pub async fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if tx.send(WriteCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// Background task that replicates snapshots to a gateway.
pub struct PersistenceWriter;

impl PersistenceWriter {
    /// Spawn the writer on the current runtime.
    ///
    /// The task exits once every handle has been dropped, returning its
    /// counters.
    pub fn spawn(gateway: Arc<dyn PersistenceGateway>) -> (PersistenceHandle, JoinHandle<WriterStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(gateway, rx));
        (PersistenceHandle { tx: Some(tx) }, task)
    }
}

async fn run(
    gateway: Arc<dyn PersistenceGateway>,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
) -> WriterStats {
    let mut stats = WriterStats::default();

    while let Some(first) = rx.recv().await {
        let mut pending: Option<Box<PersistedState>> = None;
        let mut acks: Vec<oneshot::Sender<()>> = Vec::new();

        let mut take = |cmd: WriteCommand, stats: &mut WriterStats| match cmd {
            WriteCommand::Save(state) => {
                if pending.replace(state).is_some() {
                    stats.coalesced += 1;
                }
            }
            WriteCommand::Flush(ack) => acks.push(ack),
        };

        take(first, &mut stats);
        while let Ok(cmd) = rx.try_recv() {
            take(cmd, &mut stats);
        }

        if let Some(state) = pending {
            match gateway.save(&state).await {
                Ok(()) => {
                    stats.saved += 1;
                    debug!(backend = gateway.name(), "Snapshot persisted");
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(backend = gateway.name(), error = %e, "Failed to persist snapshot");
                }
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }

    debug!(?stats, "Persistence writer stopped");
    stats
}
