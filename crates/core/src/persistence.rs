//! Persistence boundary — the full engine state as one JSON document.
//!
//! The document shape is shared with any external store:
//!
//! ```json
//! {
//!   "users": { "<identity>": { "total": 2, "categories": {}, "labeledDomains": [] } },
//!   "globalCategories": { "<category>": [ { "domain": "", "user": "", "timestamp": "" } ] },
//!   "historyByUser": { "<identity>": [ { "domain": "", "category": "", "timestamp": "" } ] },
//!   "categorySet": []
//! }
//! ```
//!
//! Missing fields default to empty collections and unknown fields are ignored.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::error::PersistenceError;
use crate::record::{CategoryEntry, ClassificationEvent, GlobalEntry, UserRecord};

/// The serialized engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub users: BTreeMap<String, PersistedUser>,

    #[serde(default)]
    pub global_categories: BTreeMap<String, Vec<GlobalEntry>>,

    #[serde(default)]
    pub history_by_user: BTreeMap<String, Vec<ClassificationEvent>>,

    #[serde(default)]
    pub category_set: Vec<String>,
}

/// A user's record as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedUser {
    #[serde(default)]
    pub total: u64,

    #[serde(default)]
    pub categories: BTreeMap<String, Vec<CategoryEntry>>,

    #[serde(default)]
    pub labeled_domains: Vec<String>,
}

impl PersistedState {
    /// Parse a document. Any failure is reported as `Corrupt`.
    pub fn from_json(raw: &str) -> Result<Self, PersistenceError> {
        serde_json::from_str(raw).map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.global_categories.is_empty()
            && self.history_by_user.is_empty()
            && self.category_set.is_empty()
    }
}

impl From<&UserRecord> for PersistedUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            total: user.total(),
            categories: user.categories().clone(),
            labeled_domains: user.labeled_domains().iter().cloned().collect(),
        }
    }
}

impl PersistedUser {
    /// Convert into a live record, reconciling `total` with `labeledDomains`.
    pub fn into_record(self, identity: &str) -> UserRecord {
        let labeled: BTreeSet<String> = self.labeled_domains.into_iter().collect();
        if labeled.len() as u64 != self.total {
            warn!(
                user = %identity,
                stored_total = self.total,
                labeled = labeled.len(),
                "Stored total disagrees with labeled domains, using labeled count"
            );
        }
        UserRecord::from_parts(labeled, self.categories)
    }
}

/// Deserialize a stored timestamp leniently.
///
/// Accepts RFC 3339, an ISO 8601 date-time or date without offset (read as
/// UTC), or epoch milliseconds. Null, missing and unreadable values become
/// the load time so one odd entry never rejects the whole document.
pub(crate) fn timestamp_or_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| parse_timestamp(&v)).unwrap_or_else(Utc::now))
}

fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        serde_json::Value::String(raw) => {
            let raw = raw.trim();
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                        .ok()
                        .map(|t| t.and_utc())
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|t| t.and_utc())
                })
        }
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        serde_json::Value::Null => return None,
        _ => None,
    };

    if parsed.is_none() {
        warn!(value = %value, "Unreadable stored timestamp, using load time");
    }
    parsed
}

/// The persistence gateway trait.
///
/// Implementations: file, HTTP, in-memory (for testing), none (no-op).
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// The backend name (e.g., "file", "http", "none").
    fn name(&self) -> &str;

    /// Load the stored document. `Ok(None)` means nothing has been stored yet.
    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError>;

    /// Replace the stored document.
    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}
