use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::stem::Stemmer;
use crate::store::TermStore;
use crate::term::{KEY_SEPARATOR, literal_text, sorted_stems};
use crate::throttle::ThrottleLedger;
use crate::types::Response;

/// Finds taught responses whose term occurs in a piece of text.
///
/// Input is stemmed, sorted and deduplicated the same way term keys are, so
/// a contiguous n-gram of the input stems is a candidate key for every term
/// size `n` present in the store. Literal (size 0) terms match when their
/// text is a substring of the lowercased input.
pub struct Matcher {
    stemmer: Arc<dyn Stemmer>,
    cooldown: TimeDelta,
}

impl Matcher {
    pub fn new(stemmer: Arc<dyn Stemmer>, cooldown: TimeDelta) -> Self {
        Self { stemmer, cooldown }
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    /// Every non-throttled response whose term matches `text`.
    pub fn find_candidates(
        &self,
        store: &TermStore,
        ledger: &ThrottleLedger,
        text: &str,
        now: DateTime<Utc>,
    ) -> Vec<Response> {
        let lowered = text.to_lowercase();
        let stems = sorted_stems(self.stemmer.as_ref(), &lowered);
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();

        for size in store.index().sizes() {
            if size == 0 {
                for key in store.literal_keys() {
                    // Substring containment, so ":)" also fires inside ":))".
                    match literal_text(key) {
                        Some(literal) if !literal.is_empty() && lowered.contains(literal) => {}
                        _ => continue,
                    }
                    self.collect(store, ledger, key, now, &mut seen, &mut candidates);
                }
            } else {
                for key in ngrams(&stems, size) {
                    self.collect(store, ledger, &key, now, &mut seen, &mut candidates);
                }
            }
        }

        debug!(
            stems = stems.len(),
            candidates = candidates.len(),
            "matched input"
        );
        candidates
    }

    fn collect(
        &self,
        store: &TermStore,
        ledger: &ThrottleLedger,
        key: &str,
        now: DateTime<Utc>,
        seen: &mut HashSet<String>,
        out: &mut Vec<Response>,
    ) {
        if !seen.insert(key.to_string()) {
            return;
        }
        let Some(responses) = store.get(key) else {
            return;
        };
        if ledger.is_throttled(key, now, self.cooldown) {
            debug!(key, "term throttled");
            return;
        }
        out.extend(responses.values().cloned());
    }
}

/// Contiguous n-grams of `stems`, joined into term keys. Yields nothing for
/// `n == 0` or when there are fewer than `n` stems.
pub fn ngrams(stems: &[String], n: usize) -> impl Iterator<Item = String> + '_ {
    let windows = if n == 0 || n > stems.len() {
        None
    } else {
        Some(stems.windows(n))
    };
    windows
        .into_iter()
        .flatten()
        .map(|window| window.join(KEY_SEPARATOR))
}
