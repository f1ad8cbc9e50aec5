//! Reporting exports.
//!
//! Both reports shuffle their lists on every call so the output carries no
//! ordering signal (who labeled first, which user came first). Stored order
//! is never touched. Serialization preserves the shuffled order, so two
//! exports of the same state are equal as sets but usually not as sequences.

use labeler_core::random::{RandomSource, shuffle};
use labeler_core::record::{GlobalEntry, UserRecord};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Per-user report: `{identity: {total, categories: {category: [domain]}}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserExport {
    pub users: Vec<UserExportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserExportEntry {
    pub identity: String,
    pub total: u64,
    pub categories: Vec<(String, Vec<String>)>,
}

/// Global report: `{category: [{domain, user}]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalExport {
    pub categories: Vec<(String, Vec<GlobalPair>)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GlobalPair {
    pub domain: String,
    pub user: String,
}

/// Build the per-user report with users and domain lists shuffled.
pub fn export_users(users: &BTreeMap<String, UserRecord>, random: &mut dyn RandomSource) -> UserExport {
    let mut entries: Vec<UserExportEntry> = users
        .iter()
        .map(|(identity, record)| {
            let categories = record
                .categories()
                .iter()
                .map(|(category, list)| {
                    let mut domains: Vec<String> = list.iter().map(|e| e.domain.clone()).collect();
                    shuffle(&mut domains, random);
                    (category.clone(), domains)
                })
                .collect();
            UserExportEntry {
                identity: identity.clone(),
                total: record.total(),
                categories,
            }
        })
        .collect();
    shuffle(&mut entries, random);
    UserExport { users: entries }
}

/// Build the global report with each category's list shuffled.
pub fn export_global(
    global: &BTreeMap<String, Vec<GlobalEntry>>,
    random: &mut dyn RandomSource,
) -> GlobalExport {
    let categories = global
        .iter()
        .map(|(category, list)| {
            let mut pairs: Vec<GlobalPair> = list
                .iter()
                .map(|e| GlobalPair {
                    domain: e.domain.clone(),
                    user: e.user.clone(),
                })
                .collect();
            shuffle(&mut pairs, random);
            (category.clone(), pairs)
        })
        .collect();
    GlobalExport { categories }
}

impl UserExport {
    /// Plain-text rendering.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for user in &self.users {
            let _ = writeln!(out, "User: {}", user.identity);
            let _ = writeln!(out, "Total: {}", user.total);
            for (category, domains) in &user.categories {
                let _ = writeln!(out, "  Category {category}:");
                for domain in domains {
                    let _ = writeln!(out, "    - {domain}");
                }
            }
            out.push('\n');
        }
        out
    }
}

impl GlobalExport {
    /// Plain-text rendering.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (category, pairs) in &self.categories {
            let _ = writeln!(out, "Category {category}:");
            for pair in pairs {
                let _ = writeln!(out, "  - {} ({})", pair.domain, pair.user);
            }
            out.push('\n');
        }
        out
    }
}

/// Serializes a list of pairs as a JSON object, keeping list order.
struct Ordered<'a, V>(&'a [(String, V)]);

impl<V: Serialize> Serialize for Ordered<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for UserExportEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut body = serializer.serialize_struct("UserExportEntry", 2)?;
        body.serialize_field("total", &self.total)?;
        body.serialize_field("categories", &Ordered(&self.categories))?;
        body.end()
    }
}

impl Serialize for UserExport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.users.len()))?;
        for user in &self.users {
            map.serialize_entry(&user.identity, user)?;
        }
        map.end()
    }
}

impl Serialize for GlobalExport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Ordered(&self.categories).serialize(serializer)
    }
}
