//! Conservation audit.
//!
//! Two invariants are checked:
//! ```text
//! per wager: Σ contribution + house_remainder == wager
//!            Σ amount_won == total_won
//! per pool:  balance == initial + Σ contributed − Σ paid_out,  balance ≥ 0
//! ```
//!
//! [`PoolConservation`] additionally tracks what this process has recorded
//! per pool, so the registry's own counters can be cross-checked against the
//! ledger history.

use std::collections::{BTreeMap, BTreeSet};

use jackpot_types::{JackpotError, PoolOutcome, PoolSnapshot, Result, SettlementResult};
use rust_decimal::Decimal;

/// Verify that a settlement result accounts for every cent of the wager.
///
/// # Errors
/// Returns [`JackpotError::AccountingInvariantViolation`] describing the
/// first mismatch found.
pub fn verify_accounting(result: &SettlementResult) -> Result<()> {
    let contributed: Decimal = result.outcomes.iter().map(|o| o.contribution).sum();
    if contributed != result.total_contributions {
        return Err(violation(format!(
            "{}: outcomes contribute {contributed} but total_contributions is {}",
            result.idempotency_key, result.total_contributions
        )));
    }
    if result.total_contributions + result.house_remainder != result.wager_amount {
        return Err(violation(format!(
            "{}: contributions {} + remainder {} != wager {}",
            result.idempotency_key,
            result.total_contributions,
            result.house_remainder,
            result.wager_amount
        )));
    }
    if result.house_remainder < Decimal::ZERO {
        return Err(violation(format!(
            "{}: negative house remainder {}",
            result.idempotency_key, result.house_remainder
        )));
    }

    let won: Decimal = result.outcomes.iter().map(|o| o.amount_won).sum();
    if won != result.total_won {
        return Err(violation(format!(
            "{}: outcomes pay {won} but total_won is {}",
            result.idempotency_key, result.total_won
        )));
    }

    let mut seen = BTreeSet::new();
    for pool in result
        .outcomes
        .iter()
        .map(|o| &o.pool)
        .chain(result.failures.iter().map(|f| &f.pool))
    {
        if !seen.insert(pool) {
            return Err(violation(format!(
                "{}: pool {pool} reported more than once",
                result.idempotency_key
            )));
        }
    }
    Ok(())
}

/// Verify a pool's balance against its own history.
///
/// # Errors
/// Returns [`JackpotError::ConservationViolation`] if the balance is negative
/// or differs from `initial + contributed − paid_out`.
pub fn verify_pool(snapshot: &PoolSnapshot) -> Result<()> {
    if snapshot.balance < Decimal::ZERO {
        return Err(JackpotError::ConservationViolation {
            reason: format!("pool {}: negative balance {}", snapshot.name, snapshot.balance),
        });
    }
    let expected = snapshot.expected_balance();
    if snapshot.balance != expected {
        return Err(JackpotError::ConservationViolation {
            reason: format!(
                "pool {}: balance {} != expected {expected} \
                 (initial={}, contributed={}, paid_out={})",
                snapshot.name,
                snapshot.balance,
                snapshot.initial_balance,
                snapshot.total_contributed,
                snapshot.total_paid_out
            ),
        });
    }
    Ok(())
}

fn violation(reason: String) -> JackpotError {
    JackpotError::AccountingInvariantViolation { reason }
}

/// Per-pool totals of every recorded outcome.
#[derive(Debug, Default)]
pub struct PoolConservation {
    contributed: BTreeMap<String, Decimal>,
    paid_out: BTreeMap<String, Decimal>,
}

impl PoolConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one committed pool outcome.
    pub fn record_outcome(&mut self, outcome: &PoolOutcome) {
        *self
            .contributed
            .entry(outcome.pool.clone())
            .or_insert(Decimal::ZERO) += outcome.contribution;
        *self
            .paid_out
            .entry(outcome.pool.clone())
            .or_insert(Decimal::ZERO) += outcome.amount_won;
    }

    /// Total recorded contributions to `pool`.
    #[must_use]
    pub fn total_contributed(&self, pool: &str) -> Decimal {
        self.contributed.get(pool).copied().unwrap_or(Decimal::ZERO)
    }

    /// Total recorded payouts from `pool`.
    #[must_use]
    pub fn total_paid_out(&self, pool: &str) -> Decimal {
        self.paid_out.get(pool).copied().unwrap_or(Decimal::ZERO)
    }

    /// Check `snapshot` against its own history and against the recorded
    /// totals. Only meaningful when every update to the pool went through
    /// the recording settlement path.
    ///
    /// # Errors
    /// Returns [`JackpotError::ConservationViolation`] on any mismatch.
    pub fn verify(&self, snapshot: &PoolSnapshot) -> Result<()> {
        verify_pool(snapshot)?;
        let contributed = self.total_contributed(&snapshot.name);
        let paid_out = self.total_paid_out(&snapshot.name);
        if snapshot.total_contributed != contributed || snapshot.total_paid_out != paid_out {
            return Err(JackpotError::ConservationViolation {
                reason: format!(
                    "pool {}: store reports contributed={} paid_out={}, \
                     ledger recorded contributed={contributed} paid_out={paid_out}",
                    snapshot.name, snapshot.total_contributed, snapshot.total_paid_out
                ),
            });
        }
        Ok(())
    }

    /// Pools with at least one recorded outcome.
    #[must_use]
    pub fn tracked_pools(&self) -> Vec<String> {
        self.contributed.keys().cloned().collect()
    }
}
