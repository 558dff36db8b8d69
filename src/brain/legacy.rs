//! JSON blobs written by the first generation of the bot.
//!
//! Those stores were keyed by the first stem of a term only. Reading one is
//! a one-time upgrade: every record is re-keyed from its original term text,
//! and the term size index is rebuilt afterwards. Ledger entries move with
//! their records: a stamp under an old key is copied to every new key that
//! came from it, keeping the latest stamp when two old keys merge.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

use crate::stem::Stemmer;
use crate::term::TermKey;
use crate::throttle::ThrottleLedger;
use crate::types::Response;

/// `{term, stem, response}`, or the later `{term, stems, key, response}`.
/// Only `term` and `response` survive the upgrade.
#[derive(Debug, Deserialize)]
pub struct LegacyRecord {
    pub term: String,
    #[serde(default)]
    pub response: String,
}

pub type LegacyMessageStore = HashMap<String, HashMap<String, LegacyRecord>>;

/// Epoch milliseconds or an RFC 3339 string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LegacyStamp {
    Millis(i64),
    Rfc3339(DateTime<Utc>),
}

pub type LegacyLedger = HashMap<String, LegacyStamp>;

/// Old key -> the keys its records were moved to.
pub type Rekeyed = HashMap<String, BTreeSet<String>>;

#[derive(Debug, Default)]
pub struct UpgradedStore {
    pub records: Vec<Response>,
    pub rekeyed: Rekeyed,
}

/// Re-key legacy records with the current key derivation.
pub fn upgrade_store(legacy: LegacyMessageStore, stemmer: &dyn Stemmer) -> UpgradedStore {
    let mut upgraded = UpgradedStore::default();
    for (old_key, responses) in legacy {
        for (text, record) in responses {
            // Older blobs only stored the response as the inner map key.
            let response = if record.response.is_empty() {
                text
            } else {
                record.response
            };
            let key = TermKey::derive(stemmer, &record.term);
            upgraded
                .rekeyed
                .entry(old_key.clone())
                .or_default()
                .insert(key.key.clone());
            upgraded
                .records
                .push(Response::new(&record.term, key, &response));
        }
    }
    upgraded
}

/// Convert stamps and move them to the keys in `rekeyed`. Keys with no
/// entry there are kept as they are. Stamps that cannot be represented are
/// dropped.
pub fn upgrade_ledger(legacy: LegacyLedger, rekeyed: &Rekeyed) -> ThrottleLedger {
    let mut ledger = ThrottleLedger::new();
    for (old_key, stamp) in legacy {
        let at = match stamp {
            LegacyStamp::Millis(ms) => match DateTime::from_timestamp_millis(ms) {
                Some(at) => at,
                None => continue,
            },
            LegacyStamp::Rfc3339(at) => at,
        };
        let targets = match rekeyed.get(&old_key) {
            Some(keys) => keys.iter().cloned().collect(),
            None => vec![old_key],
        };
        for key in targets {
            if ledger.last_used(&key).is_none_or(|seen| seen < at) {
                ledger.record(&key, at);
            }
        }
    }
    ledger
}
