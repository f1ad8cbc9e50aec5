//! Recent history — a bounded, most-recent-first log per user.

use crate::record::ClassificationEvent;
use std::collections::{BTreeMap, VecDeque};

/// Maximum number of events retained per user.
pub const HISTORY_LIMIT: usize = 30;

/// Per-user log of the latest classification events.
///
/// Events are prepended; anything beyond [`HISTORY_LIMIT`] is evicted from
/// the back. Users are kept even when their log is emptied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentHistory {
    by_user: BTreeMap<String, VecDeque<ClassificationEvent>>,
}

impl RecentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from stored lists, trimming any over-long list to the bound.
    pub fn from_lists(lists: BTreeMap<String, Vec<ClassificationEvent>>) -> Self {
        let by_user = lists
            .into_iter()
            .map(|(user, mut events)| {
                events.truncate(HISTORY_LIMIT);
                (user, VecDeque::from(events))
            })
            .collect();
        Self { by_user }
    }

    /// Prepend an event to `user`'s log, evicting the oldest beyond the bound.
    pub fn push(&mut self, user: &str, event: ClassificationEvent) {
        let log = self.by_user.entry(user.to_string()).or_default();
        log.push_front(event);
        log.truncate(HISTORY_LIMIT);
    }

    /// Empty `user`'s log. Returns how many events were dropped.
    pub fn clear(&mut self, user: &str) -> usize {
        match self.by_user.get_mut(user) {
            Some(log) => {
                let dropped = log.len();
                log.clear();
                dropped
            }
            None => 0,
        }
    }

    /// `user`'s events, most recent first.
    pub fn for_user(&self, user: &str) -> Vec<ClassificationEvent> {
        self.by_user
            .get(user)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, user: &str) -> usize {
        self.by_user.get(user).map_or(0, VecDeque::len)
    }

    pub fn to_lists(&self) -> BTreeMap<String, Vec<ClassificationEvent>> {
        self.by_user
            .iter()
            .map(|(user, log)| (user.clone(), log.iter().cloned().collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first() {
        let mut history = RecentHistory::new();
        history.push("u", ClassificationEvent::now("a.com", "news"));
        history.push("u", ClassificationEvent::now("b.com", "news"));

        let events = history.for_user("u");
        assert_eq!(events[0].domain, "b.com");
        assert_eq!(events[1].domain, "a.com");
    }

    #[test]
    fn evicts_oldest_after_limit() {
        let mut history = RecentHistory::new();
        for i in 0..=HISTORY_LIMIT {
            history.push("u", ClassificationEvent::now(format!("d{i}.com"), "news"));
        }

        let events = history.for_user("u");
        assert_eq!(events.len(), HISTORY_LIMIT);
        assert_eq!(events[0].domain, format!("d{HISTORY_LIMIT}.com"));
        assert!(events.iter().all(|e| e.domain != "d0.com"));
    }

    #[test]
    fn clear_only_touches_one_user() {
        let mut history = RecentHistory::new();
        history.push("u1", ClassificationEvent::now("a.com", "news"));
        history.push("u2", ClassificationEvent::now("b.com", "news"));

        assert_eq!(history.clear("u1"), 1);
        assert_eq!(history.len("u1"), 0);
        assert_eq!(history.len("u2"), 1);
        assert_eq!(history.clear("nobody"), 0);
    }

    #[test]
    fn restore_trims_long_lists() {
        let events: Vec<_> = (0..40)
            .map(|i| ClassificationEvent::now(format!("d{i}.com"), "news"))
            .collect();
        let history = RecentHistory::from_lists(BTreeMap::from([("u".to_string(), events)]));
        assert_eq!(history.len("u"), HISTORY_LIMIT);
        assert_eq!(history.for_user("u")[0].domain, "d0.com");
    }
}
