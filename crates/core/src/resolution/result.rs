use std::collections::HashSet;

use serde::Serialize;

use crate::domain::tag::ResolutionEntry;

/// Aggregated output of one query. `entries` are in completion order and may repeat when
/// overlapping candidates hit the same tag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub entries: Vec<ResolutionEntry>,
    pub found: bool,
    pub dispatched: usize,
    pub completed: usize,
}

impl ResolutionResult {
    pub(crate) fn collecting(dispatched: usize) -> Self {
        Self { dispatched, ..Self::default() }
    }

    pub(crate) fn push(&mut self, entry: ResolutionEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn complete(mut self, completed: usize) -> Self {
        self.completed = completed;
        self.found = !self.entries.is_empty();
        self
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.dispatched
    }

    /// Entries with repeats removed, keeping first-seen order.
    pub fn deduplicated(&self) -> Vec<ResolutionEntry> {
        let mut seen = HashSet::new();
        self.entries.iter().filter(|entry| seen.insert(*entry)).cloned().collect()
    }
}
