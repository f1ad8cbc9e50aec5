//! Classification records — the per-user and global aggregate model.
//!
//! A [`UserRecord`] holds the set of domains a user has labeled, the
//! distinct-domain count, and the chronological per-category history.
//! Its fields are private: [`UserRecord::record`] is the only mutation and it
//! keeps `labeled_domains.len() == total` at all times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One atomic labeling action by the active user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    pub domain: String,
    pub category: String,
    #[serde(deserialize_with = "crate::persistence::timestamp_or_now", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ClassificationEvent {
    /// Create an event stamped with the current time.
    pub fn now(domain: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            category: category.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An entry in a user's per-category list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub domain: String,
    #[serde(
        alias = "time",
        deserialize_with = "crate::persistence::timestamp_or_now",
        default = "Utc::now"
    )]
    pub timestamp: DateTime<Utc>,
}

/// An entry in the global aggregate: who labeled what, when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalEntry {
    pub domain: String,
    pub user: String,
    #[serde(deserialize_with = "crate::persistence::timestamp_or_now", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl GlobalEntry {
    pub fn from_event(user: &str, event: &ClassificationEvent) -> Self {
        Self {
            domain: event.domain.clone(),
            user: user.to_string(),
            timestamp: event.timestamp,
        }
    }
}

/// A single user's classification record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    total: u64,
    labeled_domains: BTreeSet<String>,
    categories: BTreeMap<String, Vec<CategoryEntry>>,
}

impl UserRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a record from stored parts.
    ///
    /// `total` is derived from `labeled_domains`; the caller decides how to
    /// report a stored total that disagrees.
    pub fn from_parts(
        labeled_domains: BTreeSet<String>,
        categories: BTreeMap<String, Vec<CategoryEntry>>,
    ) -> Self {
        Self {
            total: labeled_domains.len() as u64,
            labeled_domains,
            categories,
        }
    }

    /// Record a classification event.
    ///
    /// Returns `true` when the domain was new for this user. A repeat
    /// classification still appends to the category list but leaves
    /// `total` and `labeled_domains` unchanged.
    pub fn record(&mut self, event: &ClassificationEvent) -> bool {
        let newly_labeled = self.labeled_domains.insert(event.domain.clone());
        if newly_labeled {
            self.total += 1;
        }
        self.categories
            .entry(event.category.clone())
            .or_default()
            .push(CategoryEntry {
                domain: event.domain.clone(),
                timestamp: event.timestamp,
            });
        newly_labeled
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn labeled_domains(&self) -> &BTreeSet<String> {
        &self.labeled_domains
    }

    pub fn categories(&self) -> &BTreeMap<String, Vec<CategoryEntry>> {
        &self.categories
    }

    /// Entries recorded under `category`, oldest first.
    pub fn entries(&self, category: &str) -> &[CategoryEntry] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
