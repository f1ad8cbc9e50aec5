//! The session controller.
//!
//! Ties the active identity to a work queue and coordinates
//! classify → aggregate update → queue advance → persist. All mutations are
//! synchronous and happen through `&mut self`; persistence is handed off to
//! the background writer and never awaited here.

use chrono::Utc;
use labeler_core::category::CategorySet;
use labeler_core::error::SessionError;
use labeler_core::event::{EngineEvent, EventBus};
use labeler_core::history::RecentHistory;
use labeler_core::persistence::{PersistedState, PersistedUser};
use labeler_core::random::{RandomSource, ThreadRandom};
use labeler_core::record::{ClassificationEvent, GlobalEntry, UserRecord};
use labeler_core::store::{GlobalAggregateStore, UserStore};
use labeler_store::{InMemoryGlobalStore, InMemoryUserStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::export::{self, GlobalExport, UserExport};
use crate::identity::IdentityRule;
use crate::queue::WorkQueue;
use crate::writer::PersistenceHandle;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Active { user: String },
}

/// Result of a successful `classify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The recorded event
    pub event: ClassificationEvent,
    /// Whether the domain was new for this user
    pub newly_labeled: bool,
    /// The domain staged next, if any
    pub next: Option<String>,
}

/// Counters for the active user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Distinct domains this user has labeled
    pub total: u64,
    /// Catalog domains this user has not labeled yet
    pub remaining: usize,
    /// Domains waiting in the queue (excluding the staged one)
    pub queued: usize,
}

/// Coordinates one operator's labeling session over shared aggregates.
pub struct SessionController {
    catalog: Arc<Catalog>,
    users: Box<dyn UserStore>,
    global: Box<dyn GlobalAggregateStore>,
    history: RecentHistory,
    categories: CategorySet,
    queue: WorkQueue,
    random: Box<dyn RandomSource>,
    identity_rule: IdentityRule,
    state: SessionState,
    staged: Option<String>,
    persistence: PersistenceHandle,
    event_bus: Arc<EventBus>,
}

impl SessionController {
    /// Create a controller with in-memory stores, OS randomness, the phone
    /// identity rule and persistence disabled.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            users: Box::new(InMemoryUserStore::new()),
            global: Box::new(InMemoryGlobalStore::new()),
            history: RecentHistory::new(),
            categories: CategorySet::new(),
            queue: WorkQueue::new(),
            random: Box::new(ThreadRandom),
            identity_rule: IdentityRule::default(),
            state: SessionState::LoggedOut,
            staged: None,
            persistence: PersistenceHandle::disabled(),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Use a different user store.
    pub fn with_user_store(mut self, users: Box<dyn UserStore>) -> Self {
        self.users = users;
        self
    }

    /// Use a different global aggregate store.
    pub fn with_global_store(mut self, global: Box<dyn GlobalAggregateStore>) -> Self {
        self.global = global;
        self
    }

    /// Use a different randomness source for queues and exports.
    pub fn with_random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_identity_rule(mut self, rule: IdentityRule) -> Self {
        self.identity_rule = rule;
        self
    }

    /// Seed the category set (persisted names are merged in on hydrate).
    pub fn with_categories<I, S>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(defaults);
        self
    }

    pub fn with_persistence(mut self, persistence: PersistenceHandle) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    // --- Persistence boundary ---

    /// Replace the aggregates with a loaded document.
    ///
    /// Category names from the document are appended to the current set.
    pub fn hydrate(&mut self, state: PersistedState) {
        let users = state
            .users
            .into_iter()
            .map(|(identity, user)| {
                let record = user.into_record(&identity);
                (identity, record)
            })
            .collect();
        self.users.restore(users);
        self.global.restore(state.global_categories);
        self.history = RecentHistory::from_lists(state.history_by_user);
        self.categories.extend(state.category_set);

        debug!(
            users = self.users.count(),
            categories = self.categories.len(),
            "Session state hydrated"
        );

        if let SessionState::Active { user } = &self.state {
            let user = user.clone();
            self.users.ensure(&user);
            self.rebuild_queue(&user);
        }
    }

    /// The full aggregate state as a persistence document.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            users: self
                .users
                .all()
                .iter()
                .map(|(identity, record)| (identity.clone(), PersistedUser::from(record)))
                .collect(),
            global_categories: self.global.all(),
            history_by_user: self.history.to_lists(),
            category_set: self.categories.names().to_vec(),
        }
    }

    // --- Transitions ---

    /// Start (or switch to) a session for `identity`.
    pub fn login(&mut self, identity: &str) -> Result<(), SessionError> {
        let identity = identity.trim();
        if !self.identity_rule.accepts(identity) {
            return Err(SessionError::InvalidIdentity(identity.to_string()));
        }

        let created = self.users.ensure(identity);
        self.state = SessionState::Active {
            user: identity.to_string(),
        };
        self.rebuild_queue(identity);

        info!(user = %identity, new_user = created, "Session started");
        self.event_bus.publish(EngineEvent::SessionStarted {
            user: identity.to_string(),
            timestamp: Utc::now(),
        });

        if self.staged.is_none() {
            self.advance(identity);
        }
        Ok(())
    }

    /// End the session. Stored results are kept; queue and staged domain
    /// are discarded.
    pub fn logout(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::LoggedOut);
        self.staged = None;
        self.queue.clear();

        if let SessionState::Active { user } = previous {
            info!(user = %user, "Session ended");
            self.event_bus.publish(EngineEvent::SessionEnded {
                user,
                timestamp: Utc::now(),
            });
        }
        self.persist();
    }

    /// Assign the staged domain to `category` and stage the next one.
    pub fn classify(&mut self, category: &str) -> Result<Classification, SessionError> {
        let user = self.require_user()?;
        let domain = self.staged.clone().ok_or(SessionError::NoStagedDomain)?;
        let category = category.trim();
        if category.is_empty() {
            return Err(SessionError::InvalidCategory(category.to_string()));
        }

        let event = ClassificationEvent::now(domain, category);
        let newly_labeled = self.users.record(&user, &event);
        self.global.append(category, GlobalEntry::from_event(&user, &event));
        self.history.push(&user, event.clone());
        self.register_category(category);

        debug!(
            user = %user,
            domain = %event.domain,
            category,
            newly_labeled,
            "Domain classified"
        );
        self.event_bus.publish(EngineEvent::DomainClassified {
            user: user.clone(),
            domain: event.domain.clone(),
            category: category.to_string(),
            newly_labeled,
            timestamp: event.timestamp,
        });

        self.rebuild_queue(&user);
        let next = self.advance(&user);
        self.persist();

        Ok(Classification {
            event,
            newly_labeled,
            next,
        })
    }

    /// Stage the next domain without recording anything for the current one.
    pub fn skip(&mut self) -> Result<Option<String>, SessionError> {
        let user = self.require_user()?;
        Ok(self.advance(&user))
    }

    /// Empty the active user's recent history. Aggregates are untouched.
    pub fn clear_history(&mut self) -> Result<usize, SessionError> {
        let user = self.require_user()?;
        let dropped = self.history.clear(&user);

        debug!(user = %user, dropped, "Recent history cleared");
        self.event_bus.publish(EngineEvent::HistoryCleared {
            user,
            dropped,
            timestamp: Utc::now(),
        });
        self.persist();
        Ok(dropped)
    }

    /// Register a category name. Returns `true` if it was new.
    pub fn add_category(&mut self, name: &str) -> Result<bool, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidCategory(name.to_string()));
        }
        let added = self.register_category(name);
        if added {
            self.persist();
        }
        Ok(added)
    }

    // --- Read accessors ---

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active_user(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active { user } => Some(user),
            SessionState::LoggedOut => None,
        }
    }

    pub fn staged(&self) -> Option<&str> {
        self.staged.as_deref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn categories(&self) -> &[String] {
        self.categories.names()
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn user(&self, identity: &str) -> Option<&UserRecord> {
        self.users.get(identity)
    }

    /// The active user's recent history, most recent first.
    pub fn recent_history(&self) -> Vec<ClassificationEvent> {
        self.active_user()
            .map(|user| self.history.for_user(user))
            .unwrap_or_default()
    }

    /// Any user's recent history, most recent first.
    pub fn history_of(&self, identity: &str) -> Vec<ClassificationEvent> {
        self.history.for_user(identity)
    }

    pub fn global_entries(&self, category: &str) -> Vec<GlobalEntry> {
        self.global.entries(category)
    }

    pub fn stats(&self) -> Option<SessionStats> {
        let user = self.active_user()?;
        let labeled = self.users.get(user).map_or(0, |u| u.labeled_domains().len());
        Some(SessionStats {
            total: self.users.get(user).map_or(0, UserRecord::total),
            remaining: self.catalog.len().saturating_sub(labeled),
            queued: self.queue.len(),
        })
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Arc<EngineEvent>> {
        self.event_bus.subscribe()
    }

    // --- Exports ---

    /// Per-user report, freshly shuffled.
    pub fn export_users(&mut self) -> UserExport {
        export::export_users(&self.users.all(), self.random.as_mut())
    }

    /// Global report, freshly shuffled.
    pub fn export_global(&mut self) -> GlobalExport {
        export::export_global(&self.global.all(), self.random.as_mut())
    }

    // --- Internals ---

    fn require_user(&self) -> Result<String, SessionError> {
        self.active_user()
            .map(String::from)
            .ok_or(SessionError::NoActiveSession)
    }

    fn rebuild_queue(&mut self, user: &str) {
        let labeled = self
            .users
            .get(user)
            .map(|u| u.labeled_domains().clone())
            .unwrap_or_else(BTreeSet::new);
        self.queue.rebuild(&self.catalog, &labeled, self.random.as_mut());
    }

    fn advance(&mut self, user: &str) -> Option<String> {
        self.staged = self.queue.next(&self.catalog, self.random.as_mut());
        if let Some(domain) = &self.staged {
            self.event_bus.publish(EngineEvent::DomainStaged {
                user: user.to_string(),
                domain: domain.clone(),
                timestamp: Utc::now(),
            });
        }
        self.staged.clone()
    }

    fn register_category(&mut self, name: &str) -> bool {
        let added = self.categories.insert(name);
        if added {
            self.event_bus.publish(EngineEvent::CategoryAdded {
                category: name.to_string(),
                timestamp: Utc::now(),
            });
        }
        added
    }

    fn persist(&self) {
        self.persistence.submit(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::PersistenceWriter;
    use labeler_core::history::HISTORY_LIMIT;
    use labeler_core::random::SeededRandom;
    use labeler_store::InMemoryGateway;

    const USER: &str = "09123456789";
    const OTHER: &str = "09876543210";

    /// Always swaps with index 0. For `[a, b, c]` this yields `[b, c, a]`,
    /// so the first pop is the first catalog domain, then the second, ...
    struct FrontFirst;

    impl RandomSource for FrontFirst {
        fn index_below(&mut self, _upper: usize) -> usize {
            0
        }
    }

    fn catalog(domains: &[&str]) -> Arc<Catalog> {
        Arc::new(Catalog::new(domains.iter().map(|d| d.to_string()).collect()))
    }

    fn controller(domains: &[&str]) -> SessionController {
        SessionController::new(catalog(domains)).with_random(Box::new(FrontFirst))
    }

    fn assert_invariant(session: &SessionController) {
        for (identity, user) in session.users.all() {
            assert_eq!(
                user.labeled_domains().len() as u64,
                user.total(),
                "labeled/total mismatch for {identity}"
            );
        }
    }

    #[test]
    fn login_rejects_invalid_identity() {
        let mut session = controller(&["a.com"]);
        assert_eq!(
            session.login("12345"),
            Err(SessionError::InvalidIdentity("12345".into()))
        );
        assert!(session.active_user().is_none());
        assert!(session.staged().is_none());
    }

    #[test]
    fn login_creates_user_and_stages_domain() {
        let mut session = controller(&["a.com", "b.com"]);
        session.login(USER).unwrap();

        assert_eq!(session.active_user(), Some(USER));
        assert_eq!(session.user(USER).unwrap().total(), 0);
        assert_eq!(session.staged(), Some("a.com"));
        assert_eq!(session.queue().len(), 1);
    }

    #[test]
    fn classify_requires_session_and_staged_domain() {
        let mut session = controller(&[]);
        assert_eq!(session.classify("news"), Err(SessionError::NoActiveSession));

        session.login(USER).unwrap();
        assert_eq!(session.classify("news"), Err(SessionError::NoStagedDomain));
    }

    #[test]
    fn two_classifications_scenario() {
        let mut session = controller(&["a.com", "b.com", "c.com"]);
        session.login(USER).unwrap();

        assert_eq!(session.staged(), Some("a.com"));
        let first = session.classify("news").unwrap();
        assert!(first.newly_labeled);
        assert_eq!(first.next.as_deref(), Some("b.com"));

        let second = session.classify("news").unwrap();
        assert!(second.newly_labeled);

        let user = session.user(USER).unwrap();
        assert_eq!(user.total(), 2);
        assert_eq!(
            user.labeled_domains(),
            &BTreeSet::from(["a.com".to_string(), "b.com".to_string()])
        );
        let news: Vec<_> = user.entries("news").iter().map(|e| e.domain.as_str()).collect();
        assert_eq!(news, ["a.com", "b.com"]);

        let global = session.global_entries("news");
        assert_eq!(global.len(), 2);
        assert!(global.iter().all(|e| e.user == USER));

        // Only c.com is left to present
        assert_eq!(session.staged(), Some("c.com"));
        assert!(session.queue().is_empty());
        assert_invariant(&session);
    }

    #[test]
    fn relabel_does_not_increment_total() {
        let mut session = controller(&["a.com"]);
        session.login(USER).unwrap();

        let first = session.classify("news").unwrap();
        assert!(first.newly_labeled);
        // Full coverage: the same domain is presented again
        assert_eq!(first.next.as_deref(), Some("a.com"));

        let second = session.classify("shopping").unwrap();
        assert!(!second.newly_labeled);

        let user = session.user(USER).unwrap();
        assert_eq!(user.total(), 1);
        assert_eq!(user.labeled_domains().len(), 1);
        assert_eq!(user.entries("news").len(), 1);
        assert_eq!(user.entries("shopping").len(), 1);
        assert_eq!(session.global_entries("news").len(), 1);
        assert_eq!(session.global_entries("shopping").len(), 1);
        assert_invariant(&session);
    }

    #[test]
    fn fully_labeled_user_still_gets_domains() {
        let mut session = controller(&["a.com", "b.com"]);
        session.login(USER).unwrap();
        session.classify("news").unwrap();
        session.classify("news").unwrap();

        for _ in 0..2 {
            let next = session.skip().unwrap();
            assert!(next.is_some_and(|d| session.catalog().contains(&d)));
        }
    }

    #[test]
    fn empty_catalog_stages_nothing() {
        let mut session = controller(&[]);
        session.login(USER).unwrap();
        assert!(session.staged().is_none());
        assert_eq!(session.skip().unwrap(), None);
    }

    #[test]
    fn clear_history_only_touches_active_user() {
        let mut session = controller(&["a.com", "b.com"]);
        session.login(OTHER).unwrap();
        session.classify("news").unwrap();
        session.logout();

        session.login(USER).unwrap();
        session.classify("news").unwrap();
        session.classify("shopping").unwrap();

        assert_eq!(session.clear_history().unwrap(), 2);
        assert!(session.recent_history().is_empty());
        assert_eq!(session.history_of(OTHER).len(), 1);
        assert_eq!(session.user(USER).unwrap().total(), 2);
        assert_eq!(session.global_entries("news").len(), 2);
    }

    #[test]
    fn clear_history_requires_session() {
        let mut session = controller(&["a.com"]);
        assert_eq!(session.clear_history(), Err(SessionError::NoActiveSession));
    }

    #[test]
    fn history_is_bounded() {
        let mut session = controller(&["a.com", "b.com", "c.com"]);
        session.login(USER).unwrap();
        for _ in 0..=HISTORY_LIMIT {
            session.classify("news").unwrap();
        }
        let history = session.recent_history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(session.global_entries("news").len(), HISTORY_LIMIT + 1);
    }

    #[test]
    fn logout_discards_stage_but_keeps_results() {
        let mut session = controller(&["a.com", "b.com"]);
        session.login(USER).unwrap();
        session.classify("news").unwrap();
        session.logout();

        assert_eq!(session.state(), &SessionState::LoggedOut);
        assert!(session.staged().is_none());
        assert!(session.queue().is_empty());
        assert!(session.stats().is_none());
        assert_eq!(session.user(USER).unwrap().total(), 1);
    }

    #[test]
    fn relogin_skips_labeled_domains() {
        let mut session = controller(&["a.com", "b.com", "c.com"]);
        session.login(USER).unwrap();
        session.classify("news").unwrap();
        session.logout();

        session.login(USER).unwrap();
        let staged = session.staged().unwrap().to_string();
        assert_ne!(staged, "a.com");
        assert!(!session.queue().pending().contains(&"a.com".to_string()));
    }

    #[test]
    fn stats_track_remaining() {
        let mut session = controller(&["a.com", "b.com", "c.com"]);
        session.login(USER).unwrap();
        session.classify("news").unwrap();

        let stats = session.stats().unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.remaining, 2);
        assert_eq!(stats.queued, 1);
    }

    #[test]
    fn classify_registers_new_category() {
        let mut session = controller(&["a.com"]).with_categories(["news"]);
        session.login(USER).unwrap();
        session.classify("  blogs ").unwrap();
        assert_eq!(session.categories(), ["news", "blogs"]);
        assert!(session.user(USER).unwrap().categories().contains_key("blogs"));
    }

    #[test]
    fn blank_category_is_rejected() {
        let mut session = controller(&["a.com"]);
        session.login(USER).unwrap();
        assert!(matches!(session.classify("  "), Err(SessionError::InvalidCategory(_))));
        assert!(matches!(session.add_category(""), Err(SessionError::InvalidCategory(_))));
        assert_eq!(session.user(USER).unwrap().total(), 0);
    }

    #[test]
    fn add_category_reports_novelty() {
        let mut session = controller(&["a.com"]).with_categories(["news"]);
        assert!(!session.add_category("news").unwrap());
        assert!(session.add_category("games").unwrap());
        assert_eq!(session.categories(), ["news", "games"]);
    }

    #[test]
    fn any_identity_rule() {
        let mut session = controller(&["a.com"]).with_identity_rule(IdentityRule::Any);
        session.login("operator-7").unwrap();
        assert_eq!(session.active_user(), Some("operator-7"));
    }

    #[test]
    fn snapshot_hydrate_round_trip() {
        let mut session = SessionController::new(catalog(&["a.com", "b.com", "c.com"]))
            .with_random(Box::new(SeededRandom::new(4)))
            .with_categories(["news", "shopping"]);
        session.login(USER).unwrap();
        session.classify("news").unwrap();
        session.classify("shopping").unwrap();
        session.logout();
        session.login(OTHER).unwrap();
        session.classify("news").unwrap();

        let snapshot = session.snapshot();

        let mut restored = controller(&["a.com", "b.com", "c.com"]);
        restored.hydrate(snapshot.clone());
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.user(USER).unwrap().total(), 2);
        assert_eq!(restored.history_of(OTHER).len(), 1);
        assert_invariant(&restored);
    }

    #[test]
    fn hydrate_merges_category_set() {
        let mut session = controller(&["a.com"]).with_categories(["news"]);
        session.hydrate(PersistedState {
            category_set: vec!["blogs".into(), "news".into()],
            ..PersistedState::default()
        });
        assert_eq!(session.categories(), ["news", "blogs"]);
    }

    #[test]
    fn exports_reflect_state() {
        let mut session = controller(&["a.com", "b.com"]);
        session.login(USER).unwrap();
        session.classify("news").unwrap();
        session.classify("news").unwrap();

        let users = session.export_users();
        assert_eq!(users.users.len(), 1);
        assert_eq!(users.users[0].total, 2);

        let global = session.export_global();
        let (_, pairs) = global.categories.iter().find(|(c, _)| c == "news").unwrap();
        let domains: BTreeSet<_> = pairs.iter().map(|p| p.domain.as_str()).collect();
        assert_eq!(domains, BTreeSet::from(["a.com", "b.com"]));
    }

    #[tokio::test]
    async fn events_are_published() {
        let mut session = controller(&["a.com"]);
        let mut rx = session.subscribe();
        session.login(USER).unwrap();
        session.classify("news").unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                EngineEvent::SessionStarted { .. } => "started",
                EngineEvent::DomainStaged { .. } => "staged",
                EngineEvent::DomainClassified { .. } => "classified",
                EngineEvent::CategoryAdded { .. } => "category",
                EngineEvent::HistoryCleared { .. } => "cleared",
                EngineEvent::SessionEnded { .. } => "ended",
            });
        }
        assert_eq!(kinds, ["started", "staged", "category", "classified", "staged"]);
    }

    #[tokio::test]
    async fn mutations_are_persisted() {
        let gateway = InMemoryGateway::new();
        let (handle, task) = PersistenceWriter::spawn(Arc::new(gateway.clone()));

        let mut session = controller(&["a.com", "b.com"]).with_persistence(handle.clone());
        session.login(USER).unwrap();
        session.classify("news").unwrap();
        handle.flush().await;

        let stored = gateway.stored().await.unwrap();
        assert_eq!(stored.users[USER].total, 1);
        assert_eq!(stored.users[USER].labeled_domains, ["a.com"]);
        assert_eq!(stored.global_categories["news"].len(), 1);

        session.clear_history().unwrap();
        session.logout();
        handle.flush().await;
        let stored = gateway.stored().await.unwrap();
        assert!(stored.history_by_user[USER].is_empty());

        drop(session);
        drop(handle);
        let stats = task.await.unwrap();
        assert_eq!(stats.failed, 0);
    }
}
