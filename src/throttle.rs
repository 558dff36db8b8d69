use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Last time each term key fired.
///
/// Entries are never pruned; they simply stop throttling once the cooldown
/// has elapsed. The ledger does not count against store capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThrottleLedger {
    last_used: HashMap<String, DateTime<Utc>>,
}

impl ThrottleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str, at: DateTime<Utc>) {
        self.last_used.insert(key.to_string(), at);
    }

    pub fn last_used(&self, key: &str) -> Option<DateTime<Utc>> {
        self.last_used.get(key).copied()
    }

    /// A key is throttled while `now < last_used + cooldown`.
    pub fn is_throttled(&self, key: &str, now: DateTime<Utc>, cooldown: TimeDelta) -> bool {
        self.last_used
            .get(key)
            .is_some_and(|last| match last.checked_add_signed(cooldown) {
                Some(until) => now < until,
                // Cooldown runs past the end of time.
                None => true,
            })
    }

    pub fn len(&self) -> usize {
        self.last_used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_used.is_empty()
    }
}

impl FromIterator<(String, DateTime<Utc>)> for ThrottleLedger {
    fn from_iter<I: IntoIterator<Item = (String, DateTime<Utc>)>>(iter: I) -> Self {
        Self {
            last_used: iter.into_iter().collect(),
        }
    }
}
