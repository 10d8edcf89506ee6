//! Pool balance cache.
//!
//! A read-side copy of pool balances for display and monitoring. It is
//! refreshed from the outcomes of every recorded settlement and can be
//! reloaded wholesale from the registry. It is never consulted when
//! settling; the pool store is the only authority on balances.
//!
//! Concurrent settlements of the same pool may refresh it out of order, so a
//! cached value can briefly lag the store. [`PoolBalanceCache::reload`]
//! brings it back in line.

use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

use jackpot_pools::PoolRegistry;
use jackpot_types::{PoolName, PoolOutcome};
use rust_decimal::Decimal;

#[derive(Default)]
pub struct PoolBalanceCache {
    balances: RwLock<BTreeMap<PoolName, Decimal>>,
}

impl PoolBalanceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from committed pool outcomes.
    pub fn apply(&self, outcomes: &[PoolOutcome]) {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        for outcome in outcomes {
            balances.insert(outcome.pool.clone(), outcome.new_balance);
        }
    }

    /// Replace every cached balance with the registry's current view.
    pub async fn reload(&self, registry: &PoolRegistry) {
        let fresh: BTreeMap<PoolName, Decimal> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|snap| (snap.name, snap.balance))
            .collect();
        tracing::debug!(pools = fresh.len(), "Pool balance cache reloaded");
        *self.balances.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    /// Cached balance of `pool`.
    pub fn get(&self, pool: &str) -> Option<Decimal> {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pool)
            .copied()
    }

    /// Every cached balance, ordered by pool name.
    pub fn all(&self) -> BTreeMap<PoolName, Decimal> {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
