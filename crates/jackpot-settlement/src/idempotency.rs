//! Pending-record guard: keeps settled-but-unrecorded wagers.
//!
//! When pool updates have committed but the ledger append keeps failing, the
//! finished [`TransactionRecord`] is parked here under its idempotency key.
//! A retry with the same key re-appends the parked record instead of touching
//! the pools again, so a ledger outage never turns into a double contribution.
//!
//! The guard is bounded with FIFO eviction so memory usage stays predictable
//! in long-running services. An evicted record is logged; a retry for it falls
//! back to per-pool replay in the pool store.

use std::collections::{HashMap, VecDeque};

use jackpot_types::{IdempotencyKey, TransactionRecord};

/// Bounded map of records awaiting a successful ledger append.
pub struct PendingRecords {
    records: HashMap<IdempotencyKey, TransactionRecord>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<IdempotencyKey>,
    max_size: usize,
}

impl PendingRecords {
    /// Create a guard holding at most `max_size` records.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "PendingRecords max_size must be > 0");
        Self {
            records: HashMap::with_capacity(max_size.min(1024)),
            order: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Park `record` until it can be appended. A record already parked under
    /// the same key is kept.
    pub fn park(&mut self, record: TransactionRecord) {
        let key = record.idempotency_key.clone();
        if self.records.contains_key(&key) {
            return;
        }

        if self.records.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.records.remove(&oldest);
                tracing::warn!(key = %oldest, "Evicted unrecorded settlement from pending set");
            }
        }

        self.order.push_back(key.clone());
        self.records.insert(key, record);
    }

    /// Parked record for `key`, if any.
    pub fn get(&self, key: &IdempotencyKey) -> Option<&TransactionRecord> {
        self.records.get(key)
    }

    /// Remove and return the parked record for `key`.
    pub fn take(&mut self, key: &IdempotencyKey) -> Option<TransactionRecord> {
        let record = self.records.remove(key)?;
        self.order.retain(|k| k != key);
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
