//! End-to-end integration tests for the Labeler engine.
//!
//! These tests exercise the full pipeline from login through classification
//! to persistence, restart and reporting, across the real backends.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use labeler_core::persistence::{PersistedState, PersistenceGateway};
use labeler_core::random::{RandomSource, SeededRandom};
use labeler_engine::{Catalog, PersistenceWriter, SessionController};
use labeler_store::{FileGateway, HttpGateway, InMemoryGateway};

const ALICE: &str = "09120000001";
const BOB: &str = "09120000002";

// ── Helpers ──────────────────────────────────────────────────────────────

/// Always picks index 0, so the queue presents catalog order.
struct CatalogOrder;

impl RandomSource for CatalogOrder {
    fn index_below(&mut self, _upper: usize) -> usize {
        0
    }
}

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::parse("a.com\nb.com\n\n  c.com  \nd.com\n"))
}

fn session(random: Box<dyn RandomSource>) -> SessionController {
    SessionController::new(catalog())
        .with_random(random)
        .with_categories(["news", "shopping", "social"])
}

fn domains(entries: &[labeler_core::record::CategoryEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.domain.as_str()).collect()
}

fn assert_consistent(state: &PersistedState) {
    for (identity, user) in &state.users {
        let distinct: BTreeSet<_> = user.labeled_domains.iter().collect();
        assert_eq!(distinct.len(), user.labeled_domains.len(), "{identity} has duplicates");
        assert_eq!(user.total as usize, user.labeled_domains.len(), "{identity} total drifted");
    }
}

// ── Session flows ────────────────────────────────────────────────────────

#[test]
fn e2e_two_classifications_in_catalog_order() {
    let mut session = session(Box::new(CatalogOrder));
    session.login(ALICE).unwrap();

    assert_eq!(session.staged(), Some("a.com"));
    session.classify("news").unwrap();
    assert_eq!(session.staged(), Some("b.com"));
    session.classify("news").unwrap();

    let user = session.user(ALICE).unwrap();
    assert_eq!(user.total(), 2);
    assert_eq!(domains(user.entries("news")), ["a.com", "b.com"]);

    let history = session.recent_history();
    assert_eq!(history[0].domain, "b.com");
    assert_eq!(history[1].domain, "a.com");
}

#[test]
fn e2e_users_share_global_aggregate() {
    let mut session = session(Box::new(SeededRandom::new(21)));

    session.login(ALICE).unwrap();
    let alice_first = session.staged().unwrap().to_string();
    session.classify("news").unwrap();
    session.logout();

    session.login(BOB).unwrap();
    // Bob's queue is independent of Alice's labels
    let bob_queue: BTreeSet<_> = session
        .queue()
        .pending()
        .iter()
        .cloned()
        .chain(session.staged().map(String::from))
        .collect();
    assert_eq!(bob_queue.len(), 4);
    session.classify("shopping").unwrap();

    let news = session.global_entries("news");
    assert_eq!(news.len(), 1);
    assert_eq!(news[0].user, ALICE);
    assert_eq!(news[0].domain, alice_first);
    assert_eq!(session.global_entries("shopping")[0].user, BOB);

    assert_consistent(&session.snapshot());
}

#[test]
fn e2e_full_coverage_keeps_presenting() {
    let mut session = session(Box::new(SeededRandom::new(3)));
    session.login(ALICE).unwrap();

    for _ in 0..4 {
        session.classify("news").unwrap();
    }
    assert_eq!(session.user(ALICE).unwrap().total(), 4);
    assert_eq!(session.stats().unwrap().remaining, 0);

    // Re-review under a different category: entries grow, total does not
    let result = session.classify("shopping").unwrap();
    assert!(!result.newly_labeled);
    assert!(result.next.is_some());
    assert_eq!(session.user(ALICE).unwrap().total(), 4);
    assert_eq!(session.global_entries("news").len() + session.global_entries("shopping").len(), 5);
    assert_consistent(&session.snapshot());
}

#[test]
fn e2e_exports_match_state_as_sets() {
    let mut session = session(Box::new(SeededRandom::new(8)));
    session.login(ALICE).unwrap();
    for _ in 0..3 {
        session.classify("news").unwrap();
    }
    session.logout();
    session.login(BOB).unwrap();
    session.classify("news").unwrap();

    let expected: BTreeSet<(String, String)> = session
        .global_entries("news")
        .into_iter()
        .map(|e| (e.domain, e.user))
        .collect();

    for _ in 0..3 {
        let export = session.export_global();
        let (_, pairs) = export.categories.iter().find(|(c, _)| c == "news").unwrap();
        let got: BTreeSet<_> = pairs.iter().map(|p| (p.domain.clone(), p.user.clone())).collect();
        assert_eq!(got, expected);
    }

    let users = session.export_users();
    let identities: BTreeSet<_> = users.users.iter().map(|u| u.identity.as_str()).collect();
    assert_eq!(identities, BTreeSet::from([ALICE, BOB]));
}

// ── Persistence ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_file_backend_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    {
        let gateway: Arc<dyn PersistenceGateway> = Arc::new(FileGateway::new(path.clone()));
        let (handle, task) = PersistenceWriter::spawn(gateway);
        let mut session = session(Box::new(SeededRandom::new(1))).with_persistence(handle.clone());

        session.login(ALICE).unwrap();
        session.classify("news").unwrap();
        session.classify("blogs").unwrap();
        session.logout();

        handle.flush().await;
        drop(session);
        drop(handle);
        assert_eq!(task.await.unwrap().failed, 0);
    }

    let gateway = FileGateway::new(path);
    let stored = gateway.load().await.unwrap().unwrap();
    assert_consistent(&stored);

    let mut restored = session(Box::new(SeededRandom::new(2)));
    restored.hydrate(stored);
    assert_eq!(restored.user(ALICE).unwrap().total(), 2);
    assert!(restored.categories().contains(&"blogs".to_string()));
    assert_eq!(restored.history_of(ALICE).len(), 2);

    // Labeled domains are not offered again after restart
    restored.login(ALICE).unwrap();
    let labeled = restored.user(ALICE).unwrap().labeled_domains().clone();
    assert!(!labeled.contains(restored.staged().unwrap()));
}

#[tokio::test]
async fn e2e_legacy_document_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let legacy = serde_json::json!({
        "users": {
            ALICE: {
                "total": 5,
                "categories": {
                    "news": [
                        {"domain": "a.com", "time": "2024-01-02T03:04:05Z"},
                        {"domain": "b.com", "timestamp": null}
                    ]
                },
                "labeledDomains": ["a.com", "b.com"]
            }
        },
        "globalCategories": {
            "news": [{"domain": "a.com", "user": ALICE, "timestamp": "2024-01-02T03:04:05Z"}]
        }
    });
    std::fs::write(&path, legacy.to_string()).unwrap();

    let stored = FileGateway::new(path).load().await.unwrap().unwrap();
    let mut session = session(Box::new(CatalogOrder));
    session.hydrate(stored);

    let user = session.user(ALICE).unwrap();
    // Total is reconciled with the labeled set
    assert_eq!(user.total(), 2);
    assert_eq!(domains(user.entries("news")), ["a.com", "b.com"]);
    assert_eq!(
        user.entries("news")[0].timestamp.to_rfc3339(),
        "2024-01-02T03:04:05+00:00"
    );
    assert!(session.history_of(ALICE).is_empty());

    session.login(ALICE).unwrap();
    assert_eq!(session.staged(), Some("c.com"));
}

#[tokio::test]
async fn e2e_http_backend_through_state_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = InMemoryGateway::new();
    tokio::spawn(labeler_gateway::serve(listener, Arc::new(store.clone())));

    let endpoint = format!("http://{addr}/api/state");
    let client: Arc<dyn PersistenceGateway> =
        Arc::new(HttpGateway::new(endpoint.clone(), Duration::from_secs(5)).unwrap());
    assert!(client.load().await.unwrap().is_none());

    let (handle, task) = PersistenceWriter::spawn(client);
    let mut first = session(Box::new(SeededRandom::new(5))).with_persistence(handle.clone());
    first.login(ALICE).unwrap();
    first.classify("social").unwrap();
    handle.flush().await;
    drop(first);
    drop(handle);
    assert_eq!(task.await.unwrap().failed, 0);

    let stored = store.stored().await.unwrap();
    assert_eq!(stored.users[ALICE].total, 1);

    // A second client picks the state up from the server
    let second_client = HttpGateway::new(endpoint, Duration::from_secs(5)).unwrap();
    let mut second = session(Box::new(SeededRandom::new(6)));
    second.hydrate(second_client.load().await.unwrap().unwrap());
    assert_eq!(second.global_entries("social").len(), 1);
}

#[tokio::test]
async fn e2e_in_memory_backend_counts_saves() {
    let gateway = InMemoryGateway::new();
    let (handle, task) = PersistenceWriter::spawn(Arc::new(gateway.clone()));
    let mut session = session(Box::new(SeededRandom::new(9))).with_persistence(handle.clone());

    session.login(ALICE).unwrap();
    session.classify("news").unwrap();
    session.add_category("games").unwrap();
    handle.flush().await;

    assert!(gateway.save_count() >= 1);
    let stored = gateway.stored().await.unwrap();
    assert!(stored.category_set.contains(&"games".to_string()));

    drop(session);
    drop(handle);
    let stats = task.await.unwrap();
    assert_eq!(stats.failed, 0);
}
