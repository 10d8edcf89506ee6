//! Bounded per-pool replay cache.
//!
//! Like a settlement idempotency guard, but instead of refusing a repeated
//! key it hands back the outcome recorded the first time, so a retried pool
//! update is a no-op. When the cache reaches `max_size`, the oldest key is
//! evicted.

use std::collections::{HashMap, VecDeque};

use jackpot_types::{IdempotencyKey, PoolOutcome};

pub struct ReplayCache {
    outcomes: HashMap<IdempotencyKey, PoolOutcome>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<IdempotencyKey>,
    max_size: usize,
}

impl ReplayCache {
    /// # Panics
    /// Panics if `max_size` is zero.
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "ReplayCache max_size must be > 0");
        Self {
            outcomes: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    pub fn get(&self, key: &IdempotencyKey) -> Option<&PoolOutcome> {
        self.outcomes.get(key)
    }

    /// Remember the outcome for `key`. An existing entry is kept.
    pub fn record(&mut self, key: IdempotencyKey, outcome: PoolOutcome) {
        if self.outcomes.contains_key(&key) {
            return;
        }
        if self.outcomes.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.outcomes.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.outcomes.insert(key, outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
