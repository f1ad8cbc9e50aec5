//! In-memory stores — the default repositories behind a session, plus an
//! ephemeral persistence gateway useful for testing.

use async_trait::async_trait;
use labeler_core::error::PersistenceError;
use labeler_core::persistence::{PersistedState, PersistenceGateway};
use labeler_core::record::{ClassificationEvent, GlobalEntry, UserRecord};
use labeler_core::store::{GlobalAggregateStore, UserStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// User records held in a map.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: BTreeMap<String, UserRecord>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn ensure(&mut self, identity: &str) -> bool {
        if self.users.contains_key(identity) {
            return false;
        }
        self.users.insert(identity.to_string(), UserRecord::new());
        true
    }

    fn get(&self, identity: &str) -> Option<&UserRecord> {
        self.users.get(identity)
    }

    fn record(&mut self, identity: &str, event: &ClassificationEvent) -> bool {
        self.users
            .entry(identity.to_string())
            .or_default()
            .record(event)
    }

    fn all(&self) -> BTreeMap<String, UserRecord> {
        self.users.clone()
    }

    fn restore(&mut self, users: BTreeMap<String, UserRecord>) {
        self.users = users;
    }

    fn count(&self) -> usize {
        self.users.len()
    }
}

/// Global aggregate entries held in a map of lists.
#[derive(Debug, Default)]
pub struct InMemoryGlobalStore {
    categories: BTreeMap<String, Vec<GlobalEntry>>,
}

impl InMemoryGlobalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GlobalAggregateStore for InMemoryGlobalStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn append(&mut self, category: &str, entry: GlobalEntry) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(entry);
    }

    fn entries(&self, category: &str) -> Vec<GlobalEntry> {
        self.categories.get(category).cloned().unwrap_or_default()
    }

    fn all(&self) -> BTreeMap<String, Vec<GlobalEntry>> {
        self.categories.clone()
    }

    fn restore(&mut self, categories: BTreeMap<String, Vec<GlobalEntry>>) {
        self.categories = categories;
    }
}

/// A persistence gateway that keeps the last saved document in memory.
///
/// Clones share the same document, so a test can hand one clone to the
/// engine and inspect the other.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    document: Arc<RwLock<Option<PersistedState>>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-stored document.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            document: Arc::new(RwLock::new(Some(state))),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The currently stored document.
    pub async fn stored(&self) -> Option<PersistedState> {
        self.document.read().await.clone()
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        Ok(self.document.read().await.clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        *self.document.write().await = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
