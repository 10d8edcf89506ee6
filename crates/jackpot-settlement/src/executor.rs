//! Pool settlement executor: concurrent per-pool fan-out.
//!
//! For one wager, every planned contribution is sent to the [`PoolStore`]
//! concurrently. Each call is bounded by the pool timeout and isolated from
//! the others:
//! - a failure in pool B never rolls back or blocks the committed update to A
//! - a failed pool yields a [`PoolFailure`] instead of a [`PoolOutcome`]
//! - no retries happen here; retries reuse the idempotency key upstream
//!
//! The executor returns only when every dispatched operation has finished,
//! failed, or timed out.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use jackpot_pools::{ContributionRequest, PoolStore, Split};
use jackpot_types::{
    IdempotencyKey, JackpotError, PoolFailure, PoolFailureReason, PoolOutcome, Result, Tier,
};
use rust_decimal::Decimal;

/// Per-pool results of one wager's fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Committed pool updates, in split (pool-name) order.
    pub outcomes: Vec<PoolOutcome>,
    /// Pools whose update did not commit.
    pub failures: Vec<PoolFailure>,
}

impl ExecutionReport {
    /// Number of pool operations dispatched.
    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }
}

/// Drives per-pool updates against a [`PoolStore`].
pub struct SettlementExecutor {
    store: Arc<dyn PoolStore>,
    timeout: Duration,
}

impl SettlementExecutor {
    #[must_use]
    pub fn new(store: Arc<dyn PoolStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Apply every contribution in `split` concurrently.
    pub async fn execute(
        &self,
        key: &IdempotencyKey,
        tier: &Tier,
        split: &Split,
    ) -> ExecutionReport {
        let operations = split.contributions.iter().map(|c| {
            self.apply_one(ContributionRequest {
                idempotency_key: key.clone(),
                pool: c.pool.clone(),
                contribution: c.amount,
                wager: split.wager,
                tier: tier.clone(),
            })
        });
        let results = join_all(operations).await;

        let mut report = ExecutionReport::default();
        for (planned, result) in split.contributions.iter().zip(results) {
            match result {
                Ok(outcome) => {
                    tracing::debug!(
                        key = %key,
                        pool = %outcome.pool,
                        contribution = %outcome.contribution,
                        won = %outcome.amount_won,
                        balance = %outcome.new_balance,
                        "Pool update committed"
                    );
                    report.outcomes.push(outcome);
                }
                Err(err) => {
                    tracing::warn!(
                        key = %key,
                        pool = %planned.pool,
                        contribution = %planned.amount,
                        error = %err,
                        "Pool update failed"
                    );
                    report.failures.push(PoolFailure {
                        pool: planned.pool.clone(),
                        contribution: planned.amount,
                        reason: PoolFailureReason::from(&err),
                    });
                }
            }
        }
        report
    }

    async fn apply_one(&self, request: ContributionRequest) -> Result<PoolOutcome> {
        let outcome = match tokio::time::timeout(
            self.timeout,
            self.store.apply_contribution(&request),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(JackpotError::PoolUpdateTimeout {
                    pool: request.pool,
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };
        check_outcome(&request, &outcome)?;
        Ok(outcome)
    }
}

/// Reject outcomes that do not describe the update that was requested.
fn check_outcome(request: &ContributionRequest, outcome: &PoolOutcome) -> Result<()> {
    let consistent = outcome.pool == request.pool
        && outcome.contribution == request.contribution
        && outcome.amount_won >= Decimal::ZERO
        && outcome.new_balance >= Decimal::ZERO
        && outcome.triggered == (outcome.amount_won > Decimal::ZERO);
    if consistent {
        Ok(())
    } else {
        Err(JackpotError::AccountingInvariantViolation {
            reason: format!(
                "pool {} returned inconsistent outcome {outcome:?} for contribution {}",
                request.pool, request.contribution
            ),
        })
    }
}
