use std::collections::HashMap;
use std::sync::Mutex;

/// Outstanding requests awaiting their matching response, keyed by sequence.
///
/// Owned by the request pacer/matcher: the pacer inserts on send, the
/// listener removes-by-lookup on match. At most one entry per sequence.
pub struct PendingRequests {
    inner: Mutex<HashMap<i64, i64>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Record the send timestamp for a sequence number.
    pub fn insert(&self, sequence: i64, send_timestamp_ns: i64) {
        self.inner.lock().unwrap().insert(sequence, send_timestamp_ns);
    }

    /// Atomically pop the entry for `sequence`, returning its send timestamp.
    pub fn take(&self, sequence: i64) -> Option<i64> {
        self.inner.lock().unwrap().remove(&sequence)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose send timestamp is older than `max_age_ns`,
    /// returning how many were evicted. Responses that never arrive would
    /// otherwise pin their entries for the lifetime of a continuous run.
    pub fn evict_older_than(&self, now_ns: i64, max_age_ns: i64) -> usize {
        let mut table = self.inner.lock().unwrap();
        let before = table.len();
        table.retain(|_, send_ts| now_ns.saturating_sub(*send_ts) < max_age_ns);
        before - table.len()
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_take() {
        let pending = PendingRequests::new();
        pending.insert(1, 1000);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take(1), Some(1000));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_take_unknown_sequence_leaves_table_unchanged() {
        let pending = PendingRequests::new();
        pending.insert(1, 1000);
        assert_eq!(pending.take(99), None);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_take_is_remove_by_lookup() {
        let pending = PendingRequests::new();
        pending.insert(7, 500);
        assert_eq!(pending.take(7), Some(500));
        // A duplicate response for the same sequence finds nothing.
        assert_eq!(pending.take(7), None);
    }

    #[test]
    fn test_one_entry_per_sequence() {
        let pending = PendingRequests::new();
        pending.insert(3, 100);
        pending.insert(3, 200);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take(3), Some(200));
    }

    #[test]
    fn test_evict_older_than() {
        let pending = PendingRequests::new();
        pending.insert(1, 1_000);
        pending.insert(2, 5_000);
        pending.insert(3, 9_000);

        let evicted = pending.evict_older_than(10_000, 4_000);
        assert_eq!(evicted, 2);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take(3), Some(9_000));
    }
}
