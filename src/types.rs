use serde::{Deserialize, Serialize};

use crate::term::TermKey;

/// A taught reaction. Identified by `(key, response)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// The term as it was taught.
    pub term: String,
    /// Sorted, unique stems of the term. Empty for literal terms.
    #[serde(default)]
    pub stems: Vec<String>,
    pub key: String,
    pub response: String,
}

impl Response {
    pub fn new(term: &str, key: TermKey, response: &str) -> Self {
        Self {
            term: term.to_string(),
            stems: key.stems,
            key: key.key,
            response: response.to_string(),
        }
    }

    /// Number of stems in the term key; 0 for literal terms.
    pub fn size(&self) -> usize {
        self.stems.len()
    }

    pub fn is_literal(&self) -> bool {
        self.stems.is_empty()
    }
}

/// Result of undoing the last fired reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// Nothing has fired since startup or since the last undo.
    NothingToUndo,
    /// The last fired reaction was removed from the store.
    Forgotten(Response),
    /// The last fired reaction was already gone, e.g. evicted.
    AlreadyGone(Response),
}
