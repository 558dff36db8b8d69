pub mod index;

use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{RngCore, SeedableRng};
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::Response;
pub use index::TermSizeIndex;

/// Term key -> response text -> response.
pub type MessageStore = BTreeMap<String, BTreeMap<String, Response>>;

/// Source of randomness for eviction.
pub type EvictionRng = Box<dyn RngCore + Send + Sync>;

/// Whether a persisted term size index could be trusted at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRepair {
    /// The persisted index matched the store.
    Verified,
    /// The persisted index was stale.
    RebuiltStale,
    /// No index was persisted.
    RebuiltMissing,
}

/// Bounded store of taught responses.
///
/// Holds at most `capacity` responses. When full, a random response is
/// evicted before a new one is inserted: a random term key first, then a
/// random response under it. Eviction is deliberately unordered, not LRU.
pub struct TermStore {
    terms: MessageStore,
    index: TermSizeIndex,
    len: usize,
    capacity: usize,
    rng: EvictionRng,
}

impl TermStore {
    /// Capacity is clamped to at least 1.
    pub fn new(capacity: usize, rng: EvictionRng) -> Self {
        Self {
            terms: MessageStore::new(),
            index: TermSizeIndex::new(),
            len: 0,
            capacity: capacity.max(1),
            rng,
        }
    }

    pub fn with_entropy(capacity: usize) -> Self {
        Self::new(capacity, Box::new(StdRng::from_entropy()))
    }

    /// Replace the contents with persisted state.
    ///
    /// The term size index is always recomputed from `terms`; `persisted`
    /// is only compared against it to report whether repair was needed.
    pub fn restore(
        &mut self,
        mut terms: MessageStore,
        persisted: Option<TermSizeIndex>,
    ) -> IndexRepair {
        terms.retain(|_, responses| !responses.is_empty());
        let rebuilt = TermSizeIndex::rebuild(terms.values().flat_map(|r| r.values()));

        self.len = rebuilt.total();
        self.terms = terms;

        let repair = match persisted {
            Some(index) if index == rebuilt => IndexRepair::Verified,
            Some(_) => IndexRepair::RebuiltStale,
            None => IndexRepair::RebuiltMissing,
        };
        self.index = rebuilt;
        repair
    }

    /// Insert or overwrite a response, evicting first if the store is full.
    ///
    /// Overwriting an existing `(key, response)` pair never evicts.
    pub fn insert(&mut self, record: Response) -> Response {
        if !self.contains(&record.key, &record.response) {
            self.evict_to(self.capacity - 1);
        }

        let previous = self
            .terms
            .entry(record.key.clone())
            .or_default()
            .insert(record.response.clone(), record.clone());
        match previous {
            Some(old) => self.index.decrement(old.size()),
            None => self.len += 1,
        }
        self.index.increment(record.size());
        record
    }

    /// Remove a response. Returns it if it was present.
    pub fn remove(&mut self, key: &str, response: &str) -> Option<Response> {
        let responses = self.terms.get_mut(key)?;
        let removed = responses.remove(response)?;
        if responses.is_empty() {
            self.terms.remove(key);
        }
        self.len -= 1;
        self.index.decrement(removed.size());
        Some(removed)
    }

    /// Randomly evict responses until at most `limit` remain.
    pub fn evict_to(&mut self, limit: usize) -> usize {
        let mut evicted = 0;
        while self.len > limit {
            let Some(key) = self.terms.keys().choose(&mut self.rng).cloned() else {
                break;
            };
            let Some(response) = self
                .terms
                .get(&key)
                .and_then(|responses| responses.keys().choose(&mut self.rng).cloned())
            else {
                break;
            };
            if self.remove(&key, &response).is_some() {
                debug!(key = %key, response = %response, "evicted response");
                evicted += 1;
            }
        }
        evicted
    }

    /// Evict down to capacity, e.g. after the capacity was lowered.
    pub fn enforce_capacity(&mut self) -> usize {
        self.evict_to(self.capacity)
    }

    pub fn contains(&self, key: &str, response: &str) -> bool {
        self.terms
            .get(key)
            .is_some_and(|responses| responses.contains_key(response))
    }

    pub fn get(&self, key: &str) -> Option<&BTreeMap<String, Response>> {
        self.terms.get(key)
    }

    /// Keys taught from terms without any word-like token.
    pub fn literal_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms
            .iter()
            .filter(|(_, responses)| responses.values().any(Response::is_literal))
            .map(|(key, _)| key.as_str())
    }

    pub fn responses(&self) -> impl Iterator<Item = &Response> + '_ {
        self.terms.values().flat_map(|responses| responses.values())
    }

    pub fn terms(&self) -> &MessageStore {
        &self.terms
    }

    pub fn index(&self) -> &TermSizeIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn key_count(&self) -> usize {
        self.terms.len()
    }
}
