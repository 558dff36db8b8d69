use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::brain::codec::{self, Decoded};
use crate::brain::legacy::{self, LegacyLedger, LegacyMessageStore, Rekeyed};
use crate::brain::{Blob, Brain};
use crate::config::ReactConfig;
use crate::matcher::Matcher;
use crate::stem::{PorterStemmer, Stemmer};
use crate::store::{EvictionRng, IndexRepair, MessageStore, TermSizeIndex, TermStore};
use crate::term::TermKey;
use crate::throttle::ThrottleLedger;
use crate::types::{Response, UndoOutcome};

/// Term store, its size index and the throttle ledger. Always locked and
/// persisted together.
pub struct ReactState {
    pub store: TermStore,
    pub ledger: ThrottleLedger,
}

/// Snapshot of the reactor for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ReactorStatus {
    pub responses: usize,
    pub capacity: usize,
    pub terms: usize,
    pub term_sizes: Vec<(usize, usize)>,
    pub ledger_entries: usize,
    pub last_fired: Option<Response>,
}

/// The reactive term-response store. One per process.
///
/// Mutations (teach, forget, fire) hold the state write lock for the whole
/// update and its persistence; matching takes the read lock, so the store
/// and its size index are never observed out of step.
pub struct Reactor {
    state: RwLock<ReactState>,
    last_fired: Mutex<Option<Response>>,
    stemmer: Arc<dyn Stemmer>,
    matcher: Matcher,
    brain: Arc<dyn Brain>,
}

impl Reactor {
    /// Empty reactor with the English stemmer and entropy-seeded eviction.
    pub fn new(config: &ReactConfig, brain: Arc<dyn Brain>) -> Self {
        Self::with_parts(
            config,
            brain,
            Arc::new(PorterStemmer::new()),
            Box::new(StdRng::from_entropy()),
        )
    }

    pub fn with_parts(
        config: &ReactConfig,
        brain: Arc<dyn Brain>,
        stemmer: Arc<dyn Stemmer>,
        rng: EvictionRng,
    ) -> Self {
        Self {
            state: RwLock::new(ReactState {
                store: TermStore::new(config.capacity, rng),
                ledger: ThrottleLedger::new(),
            }),
            last_fired: Mutex::new(None),
            matcher: Matcher::new(Arc::clone(&stemmer), config.cooldown()),
            stemmer,
            brain,
        }
    }

    /// Build a reactor from whatever the brain holds.
    pub async fn load(config: &ReactConfig, brain: Arc<dyn Brain>) -> Self {
        let reactor = Self::new(config, brain);
        reactor.restore(config.load_timeout()).await;
        reactor
    }

    /// Waits up to `timeout` for the brain, then loads the store, repairs the
    /// term size index, loads the ledger and trims to capacity. Missing or
    /// unreadable blobs start out empty.
    pub async fn restore(&self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.brain.ready()).await.is_err() {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "brain not ready in time, continuing with available state"
            );
        }

        let mut state = self.state.write().await;

        let mut rekeyed: Option<Rekeyed> = None;
        let terms = match self
            .load_blob::<MessageStore, LegacyMessageStore>(Blob::MessageStore)
            .await
        {
            Some(Decoded::Current(terms)) => Some(terms),
            Some(Decoded::Legacy(old)) => {
                let upgraded = legacy::upgrade_store(old, self.stemmer.as_ref());
                info!(
                    records = upgraded.records.len(),
                    "upgrading legacy message store"
                );
                rekeyed = Some(upgraded.rekeyed);
                let mut terms = MessageStore::new();
                for record in upgraded.records {
                    terms
                        .entry(record.key.clone())
                        .or_default()
                        .insert(record.response.clone(), record);
                }
                Some(terms)
            }
            None => None,
        };

        if let Some(terms) = terms {
            // Legacy indexes were keyed differently; never trust them.
            let persisted = match self
                .load_blob::<TermSizeIndex, TermSizeIndex>(Blob::TermSizeIndex)
                .await
            {
                Some(Decoded::Current(index)) if rekeyed.is_none() => Some(index),
                _ => None,
            };
            match state.store.restore(terms, persisted) {
                IndexRepair::Verified => debug!("term size index verified"),
                IndexRepair::RebuiltStale => info!("term size index was stale, rebuilt"),
                IndexRepair::RebuiltMissing => info!("term size index missing, rebuilt"),
            }
        }

        state.ledger = match self
            .load_blob::<ThrottleLedger, LegacyLedger>(Blob::ThrottleLedger)
            .await
        {
            Some(Decoded::Current(ledger)) => ledger,
            Some(Decoded::Legacy(old)) => {
                legacy::upgrade_ledger(old, &rekeyed.take().unwrap_or_default())
            }
            None => ThrottleLedger::new(),
        };

        let evicted = state.store.enforce_capacity();
        if evicted > 0 {
            info!(evicted, capacity = state.store.capacity(), "trimmed store to capacity");
        }

        self.persist_store(&state.store).await;
        self.save_blob(Blob::ThrottleLedger, &state.ledger).await;

        info!(
            responses = state.store.len(),
            terms = state.store.key_count(),
            ledger = state.ledger.len(),
            "reactor loaded"
        );
    }

    /// Learn to react to `term` with `response`. Re-teaching the same pair
    /// overwrites it.
    pub async fn teach(&self, term: &str, response: &str) -> Response {
        let key = TermKey::derive(self.stemmer.as_ref(), term);
        let mut state = self.state.write().await;
        let record = state.store.insert(Response::new(term, key, response));
        info!(key = %record.key, size = record.size(), "learned reaction");
        self.persist_store(&state.store).await;
        record
    }

    /// Remove a taught response. `false` if it was already gone.
    pub async fn forget(&self, record: &Response) -> bool {
        let mut state = self.state.write().await;
        let Some(removed) = state.store.remove(&record.key, &record.response) else {
            debug!(key = %record.key, "forget: response already absent");
            return false;
        };
        info!(key = %removed.key, "forgot reaction");
        self.persist_store(&state.store).await;
        true
    }

    /// Non-throttled responses matching `text` right now.
    pub async fn candidates(&self, text: &str) -> Vec<Response> {
        self.candidates_at(text, Utc::now()).await
    }

    pub async fn candidates_at(&self, text: &str, now: DateTime<Utc>) -> Vec<Response> {
        let state = self.state.read().await;
        self.matcher
            .find_candidates(&state.store, &state.ledger, text, now)
    }

    /// Record that `record` was emitted: starts the cooldown for its key and
    /// makes it the target of the next undo.
    pub async fn fire(&self, record: &Response) {
        self.fire_at(record, Utc::now()).await;
    }

    pub async fn fire_at(&self, record: &Response, now: DateTime<Utc>) {
        let mut state = self.state.write().await;
        state.ledger.record(&record.key, now);
        *self.last_fired.lock().await = Some(record.clone());
        info!(key = %record.key, "fired reaction");
        self.save_blob(Blob::ThrottleLedger, &state.ledger).await;
    }

    /// Fire `record` unless its key fired within the cooldown since it was
    /// picked. The check and the ledger update happen under one write lock,
    /// so of several reactions scheduled for one key only the first goes out.
    pub async fn try_fire(&self, record: &Response) -> bool {
        self.try_fire_at(record, Utc::now()).await
    }

    pub async fn try_fire_at(&self, record: &Response, now: DateTime<Utc>) -> bool {
        let mut state = self.state.write().await;
        if state
            .ledger
            .is_throttled(&record.key, now, self.matcher.cooldown())
        {
            debug!(key = %record.key, "reaction dropped, key fired meanwhile");
            return false;
        }
        state.ledger.record(&record.key, now);
        *self.last_fired.lock().await = Some(record.clone());
        info!(key = %record.key, "fired reaction");
        self.save_blob(Blob::ThrottleLedger, &state.ledger).await;
        true
    }

    /// Forget the last fired response. The last-fired record is cleared
    /// whatever the outcome.
    pub async fn undo_last(&self) -> UndoOutcome {
        let Some(last) = self.last_fired.lock().await.take() else {
            return UndoOutcome::NothingToUndo;
        };
        if self.forget(&last).await {
            UndoOutcome::Forgotten(last)
        } else {
            UndoOutcome::AlreadyGone(last)
        }
    }

    pub async fn last_fired(&self) -> Option<Response> {
        self.last_fired.lock().await.clone()
    }

    pub async fn status(&self) -> ReactorStatus {
        let state = self.state.read().await;
        ReactorStatus {
            responses: state.store.len(),
            capacity: state.store.capacity(),
            terms: state.store.key_count(),
            term_sizes: state.store.index().iter().collect(),
            ledger_entries: state.ledger.len(),
            last_fired: self.last_fired().await,
        }
    }

    /// Read access to the locked state, e.g. for invariant checks.
    pub async fn with_state<R>(&self, f: impl FnOnce(&ReactState) -> R) -> R {
        let state = self.state.read().await;
        f(&*state)
    }

    async fn persist_store(&self, store: &TermStore) {
        self.save_blob(Blob::MessageStore, store.terms()).await;
        self.save_blob(Blob::TermSizeIndex, store.index()).await;
    }

    /// Missing, unreadable and undecodable blobs all come back as `None`.
    async fn load_blob<T, L>(&self, blob: Blob) -> Option<Decoded<T, L>>
    where
        T: DeserializeOwned,
        L: DeserializeOwned,
    {
        let bytes = match self.brain.get(blob).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(blob = %blob, "blob absent");
                return None;
            }
            Err(e) => {
                warn!(blob = %blob, "failed to read blob: {e:#}");
                return None;
            }
        };
        match codec::decode(&bytes) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(blob = %blob, "discarding unreadable blob: {e}");
                None
            }
        }
    }

    /// Best effort; failures are logged and swallowed.
    async fn save_blob<T: Serialize>(&self, blob: Blob, value: &T) {
        let bytes = match codec::encode(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(blob = %blob, "failed to encode blob: {e}");
                return;
            }
        };
        if let Err(e) = self.brain.set(blob, bytes).await {
            warn!(blob = %blob, "failed to save blob: {e:#}");
        }
    }
}
