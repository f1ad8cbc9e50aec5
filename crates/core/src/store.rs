//! Repository traits for the aggregate views.
//!
//! The session controller owns one of each and mutates them from a single
//! logical writer, so the traits are synchronous and take `&mut self`.
//! Implementations live in `labeler-store`.

use crate::record::{ClassificationEvent, GlobalEntry, UserRecord};
use std::collections::BTreeMap;

/// Per-user classification records.
pub trait UserStore: Send {
    /// The store name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Create the user's record if it does not exist. Returns `true` if created.
    fn ensure(&mut self, identity: &str) -> bool;

    /// Look up a user's record.
    fn get(&self, identity: &str) -> Option<&UserRecord>;

    /// Record an event for `identity`, creating the record lazily.
    ///
    /// Returns `true` when the domain was new for this user.
    fn record(&mut self, identity: &str, event: &ClassificationEvent) -> bool;

    /// All records, keyed by identity.
    fn all(&self) -> BTreeMap<String, UserRecord>;

    /// Replace every record (used when hydrating from persistence).
    fn restore(&mut self, users: BTreeMap<String, UserRecord>);

    /// Number of known users.
    fn count(&self) -> usize;
}

/// Cross-user rollup: every classification event ever recorded, by category.
pub trait GlobalAggregateStore: Send {
    /// The store name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Append one entry under `category`.
    fn append(&mut self, category: &str, entry: GlobalEntry);

    /// Entries recorded under `category`, oldest first.
    fn entries(&self, category: &str) -> Vec<GlobalEntry>;

    /// All entries, keyed by category.
    fn all(&self) -> BTreeMap<String, Vec<GlobalEntry>>;

    /// Replace every entry (used when hydrating from persistence).
    fn restore(&mut self, categories: BTreeMap<String, Vec<GlobalEntry>>);
}
