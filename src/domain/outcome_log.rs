use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

use super::{Outcome, VirtualUserId};

/// One classified contention request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub virtual_user: VirtualUserId,
    pub outcome: Outcome,
    /// HTTP status, 0 when the request failed at the transport level
    pub status: u16,
    #[serde(with = "humantime_serde")]
    pub latency: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only log shared by every virtual client.
///
/// Appends are serialized by a mutex so that concurrent writers can never
/// lose or interleave entries; no ordering between writers is implied.
#[derive(Debug, Default)]
pub struct OutcomeLog {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the log for the expected number of requests
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn record(&self, record: OutcomeRecord) {
        self.records.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Copy of every entry recorded so far
    pub fn snapshot(&self) -> Vec<OutcomeRecord> {
        self.records.lock().clone()
    }

    pub fn into_records(self) -> Vec<OutcomeRecord> {
        self.records.into_inner()
    }
}

impl FromIterator<OutcomeRecord> for OutcomeLog {
    fn from_iter<I: IntoIterator<Item = OutcomeRecord>>(iter: I) -> Self {
        Self {
            records: Mutex::new(iter.into_iter().collect()),
        }
    }
}
