//! The pool storage boundary.
//!
//! [`PoolStore`] is the seam between settlement and wherever pool balances
//! actually live. `apply_contribution` must behave as one atomic operation
//! per pool (contribute, evaluate win, pay out) so it can be exposed
//! remotely, and must be idempotent per `(idempotency key, pool)`.

use async_trait::async_trait;
use jackpot_types::{EligiblePool, IdempotencyKey, PoolName, PoolOutcome, Result, Tier};
use rust_decimal::Decimal;

/// One pool update requested by the settlement executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionRequest {
    pub idempotency_key: IdempotencyKey,
    pub pool: PoolName,
    pub contribution: Decimal,
    pub wager: Decimal,
    pub tier: Tier,
}

#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Active pools accepting `tier`, ordered by name.
    async fn list_eligible_pools(&self, tier: &Tier) -> Result<Vec<EligiblePool>>;

    /// Atomically add the contribution, evaluate the win condition against
    /// the new balance, and pay out.
    ///
    /// # Errors
    /// - `PoolUnavailable` if the pool is missing or inactive
    /// - `TierNotEligible` if the pool does not accept the tier
    async fn apply_contribution(&self, request: &ContributionRequest) -> Result<PoolOutcome>;
}
