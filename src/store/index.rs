use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Response;

/// Number of stored responses per term size (in stems).
///
/// A cache over the term store: the matcher only generates n-grams for sizes
/// present here. It can always be recomputed with [`TermSizeIndex::rebuild`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermSizeIndex {
    counts: BTreeMap<usize, usize>,
}

impl TermSizeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate term sizes over a set of responses.
    pub fn rebuild<'a>(responses: impl IntoIterator<Item = &'a Response>) -> Self {
        let mut index = Self::new();
        for response in responses {
            index.increment(response.size());
        }
        index
    }

    pub fn increment(&mut self, size: usize) {
        *self.counts.entry(size).or_insert(0) += 1;
    }

    pub fn decrement(&mut self, size: usize) {
        if let Some(count) = self.counts.get_mut(&size) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(&size);
            }
        }
    }

    pub fn count(&self, size: usize) -> usize {
        self.counts.get(&size).copied().unwrap_or(0)
    }

    /// Term sizes with at least one response, ascending.
    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(size, _)| *size)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().map(|(size, count)| (*size, *count))
    }
}
