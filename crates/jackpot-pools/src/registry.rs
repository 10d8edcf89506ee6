//! Pool registry: the authoritative store of pool balances.
//!
//! Every pool's mutable state sits behind its **own** async mutex, so updates
//! to one pool are linearised while updates to different pools never contend.
//! The map of pools is guarded by a short-lived `RwLock` that is only written
//! on registration and is never held across an `.await`.
//!
//! Registration enforces the splitter's precondition: for every tier, the
//! shares of all registered pools accepting that tier sum to at most 100%.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use jackpot_types::{
    EligiblePool, EngineConfig, JackpotError, PoolConfig, PoolName, PoolOutcome, PoolSnapshot,
    Result, Tier, constants,
};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::{
    eligibility::{self, PoolRule},
    replay::ReplayCache,
    store::{ContributionRequest, PoolStore},
    trigger::{WinCondition, WinContext},
};

/// Mutable per-pool state. Only touched while holding the pool's mutex.
struct PoolState {
    balance: Decimal,
    total_contributed: Decimal,
    total_paid_out: Decimal,
    payouts: u64,
    replay: ReplayCache,
}

/// A registered pool: immutable config, an activity flag and locked state.
struct PoolEntry {
    name: PoolName,
    share: Decimal,
    eligible_tiers: BTreeSet<Tier>,
    initial_balance: Decimal,
    active: AtomicBool,
    condition: Arc<dyn WinCondition>,
    state: Mutex<PoolState>,
}

impl PoolRule for PoolEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn share(&self) -> Decimal {
        self.share
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn accepts(&self, tier: &Tier) -> bool {
        self.eligible_tiers.contains(tier)
    }
}

impl PoolEntry {
    async fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock().await;
        PoolSnapshot {
            name: self.name.clone(),
            balance: state.balance,
            initial_balance: self.initial_balance,
            share: self.share,
            eligible_tiers: self.eligible_tiers.clone(),
            active: self.is_active(),
            total_contributed: state.total_contributed,
            total_paid_out: state.total_paid_out,
            payouts: state.payouts,
        }
    }
}

/// In-process pool store with per-pool exclusive access.
pub struct PoolRegistry {
    pools: RwLock<BTreeMap<PoolName, Arc<PoolEntry>>>,
    replay_cache_size: usize,
}

impl PoolRegistry {
    /// Create an empty registry remembering `replay_cache_size` idempotency
    /// keys per pool.
    ///
    /// # Panics
    /// Panics if `replay_cache_size` is zero.
    #[must_use]
    pub fn new(replay_cache_size: usize) -> Self {
        assert!(replay_cache_size > 0, "replay_cache_size must be > 0");
        Self {
            pools: RwLock::new(BTreeMap::new()),
            replay_cache_size,
        }
    }

    /// Build a registry and register every pool in `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let registry = Self::new(config.replay_cache_size);
        for pool in &config.pools {
            registry.register(pool.clone())?;
        }
        Ok(registry)
    }

    /// Register a pool using its configured [`TriggerRule`](jackpot_types::TriggerRule).
    pub fn register(&self, config: PoolConfig) -> Result<()> {
        let condition: Arc<dyn WinCondition> = Arc::new(config.trigger.clone());
        self.register_with_condition(config, condition)
    }

    /// Register a pool with a custom win condition.
    ///
    /// # Errors
    /// - `InvalidPoolConfig` if the config is structurally invalid
    /// - `DuplicatePool` if the name is taken
    /// - `ContributionOverflow` if any accepted tier would exceed 100%
    pub fn register_with_condition(
        &self,
        config: PoolConfig,
        condition: Arc<dyn WinCondition>,
    ) -> Result<()> {
        config.validate()?;

        let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        if pools.contains_key(&config.name) {
            return Err(JackpotError::DuplicatePool(config.name));
        }

        let limit = Decimal::from(constants::MAX_TOTAL_SHARE);
        for tier in &config.eligible_tiers {
            let existing: Decimal = pools
                .values()
                .filter(|p| p.accepts(tier))
                .map(|p| p.share)
                .sum();
            let total = existing + config.share;
            if total > limit {
                return Err(JackpotError::ContributionOverflow {
                    tier: tier.clone(),
                    total,
                });
            }
        }

        tracing::info!(
            pool = %config.name,
            share = %config.share,
            balance = %config.initial_balance,
            tiers = ?config.eligible_tiers,
            active = config.active,
            "Pool registered"
        );

        let entry = PoolEntry {
            name: config.name.clone(),
            share: config.share,
            eligible_tiers: config.eligible_tiers,
            initial_balance: config.initial_balance,
            active: AtomicBool::new(config.active),
            condition,
            state: Mutex::new(PoolState {
                balance: config.initial_balance,
                total_contributed: Decimal::ZERO,
                total_paid_out: Decimal::ZERO,
                payouts: 0,
                replay: ReplayCache::new(self.replay_cache_size),
            }),
        };
        pools.insert(config.name, Arc::new(entry));
        Ok(())
    }

    /// Activate or deactivate a pool.
    pub fn set_active(&self, pool: &str, active: bool) -> Result<()> {
        let entry = self.entry(pool)?;
        entry.active.store(active, Ordering::Release);
        tracing::info!(pool, active, "Pool activity changed");
        Ok(())
    }

    /// Snapshot of one pool.
    pub async fn pool(&self, pool: &str) -> Result<PoolSnapshot> {
        let entry = self.entry(pool)?;
        Ok(entry.snapshot().await)
    }

    /// Current balance of one pool.
    pub async fn balance(&self, pool: &str) -> Result<Decimal> {
        Ok(self.pool(pool).await?.balance)
    }

    /// Snapshots of every pool, ordered by name.
    pub async fn snapshot(&self) -> Vec<PoolSnapshot> {
        let entries: Vec<Arc<PoolEntry>> = self
            .pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshots.push(entry.snapshot().await);
        }
        snapshots
    }

    /// Every tier accepted by at least one active pool, sorted.
    #[must_use]
    pub fn tiers(&self) -> Vec<Tier> {
        let pools = self.pools.read().unwrap_or_else(PoisonError::into_inner);
        pools
            .values()
            .filter(|p| p.is_active())
            .flat_map(|p| p.eligible_tiers.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Active pools accepting `tier`, in name order.
    #[must_use]
    pub fn eligible_pools(&self, tier: &Tier) -> Vec<EligiblePool> {
        let pools = self.pools.read().unwrap_or_else(PoisonError::into_inner);
        eligibility::resolve(tier, pools.values().map(Arc::as_ref))
    }

    /// Number of registered pools (active or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, pool: &str) -> Result<Arc<PoolEntry>> {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pool)
            .cloned()
            .ok_or_else(|| JackpotError::PoolUnavailable(pool.to_string()))
    }
}

#[async_trait]
impl PoolStore for PoolRegistry {
    async fn list_eligible_pools(&self, tier: &Tier) -> Result<Vec<EligiblePool>> {
        Ok(self.eligible_pools(tier))
    }

    async fn apply_contribution(&self, request: &ContributionRequest) -> Result<PoolOutcome> {
        let entry = self.entry(&request.pool)?;
        if !entry.accepts(&request.tier) {
            return Err(JackpotError::TierNotEligible {
                tier: request.tier.clone(),
                pool: request.pool.clone(),
            });
        }
        if request.contribution < Decimal::ZERO {
            return Err(JackpotError::AccountingInvariantViolation {
                reason: format!(
                    "negative contribution {} to pool {}",
                    request.contribution, request.pool
                ),
            });
        }

        let mut state = entry.state.lock().await;

        if let Some(previous) = state.replay.get(&request.idempotency_key) {
            tracing::debug!(
                pool = %request.pool,
                key = %request.idempotency_key,
                "Replayed pool update"
            );
            return Ok(previous.clone());
        }
        if !entry.is_active() {
            return Err(JackpotError::PoolUnavailable(request.pool.clone()));
        }

        let balance = state.balance + request.contribution;
        let requested = entry.condition.evaluate(&WinContext {
            pool: &entry.name,
            balance,
            wager: request.wager,
            tier: &request.tier,
        });

        let (amount_won, win_clamped) = if requested > balance {
            let err = JackpotError::PoolWinExceedsBalance {
                pool: entry.name.clone(),
                requested,
                balance,
            };
            tracing::error!(error = %err, "Win condition exceeded pool balance; clamping");
            (balance, true)
        } else {
            (requested.max(Decimal::ZERO), false)
        };
        let triggered = amount_won > Decimal::ZERO;

        state.balance = balance - amount_won;
        state.total_contributed += request.contribution;
        state.total_paid_out += amount_won;
        if triggered {
            state.payouts += 1;
            tracing::info!(
                pool = %entry.name,
                key = %request.idempotency_key,
                won = %amount_won,
                balance = %state.balance,
                "Pool triggered"
            );
        }

        let outcome = PoolOutcome {
            pool: entry.name.clone(),
            contribution: request.contribution,
            amount_won,
            new_balance: state.balance,
            triggered,
            win_clamped,
        };
        state
            .replay
            .record(request.idempotency_key.clone(), outcome.clone());
        Ok(outcome)
    }
}
