//! Work queue — the randomized stack of domains awaiting presentation.
//!
//! `rebuild` shuffles the catalog minus the user's labeled domains, or the
//! whole catalog once everything is labeled. `next` pops from the end and,
//! when the stack runs dry, refills from the *full* catalog without
//! filtering, so a user who keeps going re-reviews domains.

use labeler_core::random::{RandomSource, shuffle};
use std::collections::BTreeSet;

use crate::catalog::Catalog;

/// Per-session stack of domains to present.
#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
    pending: Vec<String>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue with a fresh shuffle of `catalog \ labeled`,
    /// falling back to the whole catalog when nothing is left unlabeled.
    pub fn rebuild(
        &mut self,
        catalog: &Catalog,
        labeled: &BTreeSet<String>,
        random: &mut dyn RandomSource,
    ) {
        let mut pending: Vec<String> = catalog
            .domains()
            .iter()
            .filter(|d| !labeled.contains(d.as_str()))
            .cloned()
            .collect();
        if pending.is_empty() {
            pending = catalog.domains().to_vec();
        }
        shuffle(&mut pending, random);
        self.pending = pending;
    }

    /// Pop the next domain, refilling from the full catalog when empty.
    ///
    /// Returns `None` only when the catalog itself is empty.
    pub fn next(&mut self, catalog: &Catalog, random: &mut dyn RandomSource) -> Option<String> {
        if self.pending.is_empty() {
            let mut refill = catalog.domains().to_vec();
            shuffle(&mut refill, random);
            self.pending = refill;
        }
        self.pending.pop()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queued domains; the last element is presented next.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }
}
