//! Per-pool outcomes and the aggregated settlement result.
//!
//! Each eligible pool yields exactly one of [`PoolOutcome`] (the update was
//! committed) or [`PoolFailure`] (it was not). The orchestrator folds them
//! into a [`SettlementResult`] that fully accounts for the wager.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{IdempotencyKey, JackpotError, PoolName};

/// The committed result of applying one contribution to one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOutcome {
    pub pool: PoolName,
    /// Amount routed from the wager into the pool.
    pub contribution: Decimal,
    /// Amount paid out of the pool to the player (zero unless triggered).
    pub amount_won: Decimal,
    /// Pool balance after contribution and payout.
    pub new_balance: Decimal,
    pub triggered: bool,
    /// The win condition asked for more than the balance and was clamped.
    #[serde(default)]
    pub win_clamped: bool,
}

/// Why a pool update did not commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolFailureReason {
    /// Pool missing or inactive.
    Unavailable,
    /// The store did not confirm within the window.
    Timeout { timeout_ms: u64 },
    /// Any other store-side rejection.
    Rejected { message: String },
}

impl From<&JackpotError> for PoolFailureReason {
    fn from(err: &JackpotError) -> Self {
        match err {
            JackpotError::PoolUnavailable(_) => Self::Unavailable,
            JackpotError::PoolUpdateTimeout { timeout_ms, .. } => Self::Timeout {
                timeout_ms: *timeout_ms,
            },
            other => Self::Rejected {
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for PoolFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Timeout { timeout_ms } => write!(f, "TIMEOUT({timeout_ms}ms)"),
            Self::Rejected { message } => write!(f, "REJECTED({message})"),
        }
    }
}

/// A pool whose update failed for this wager. Its contribution falls to the
/// house remainder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolFailure {
    pub pool: PoolName,
    /// The contribution that was attempted and not applied.
    pub contribution: Decimal,
    pub reason: PoolFailureReason,
}

/// Overall status of a settled wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// Every dispatched pool operation committed.
    Completed,
    /// At least one committed and at least one failed.
    PartiallyFailed,
    /// Every dispatched pool operation failed.
    Failed,
}

impl SettlementStatus {
    /// Status for a wager with `succeeded` committed and `failed` failed pools.
    #[must_use]
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => Self::Completed,
            (0, _) => Self::Failed,
            _ => Self::PartiallyFailed,
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "COMPLETED"),
            Self::PartiallyFailed => write!(f, "PARTIALLY_FAILED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Everything the caller learns about a settled wager.
///
/// `total_contributions + house_remainder == wager_amount` and
/// `Σ outcomes.amount_won == total_won` hold exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub idempotency_key: IdempotencyKey,
    pub wager_amount: Decimal,
    pub total_contributions: Decimal,
    pub total_won: Decimal,
    pub house_remainder: Decimal,
    /// Sum of the shares of the pools that committed.
    pub total_contribution_share: Decimal,
    pub outcomes: Vec<PoolOutcome>,
    pub failures: Vec<PoolFailure>,
    pub status: SettlementStatus,
    /// The player's cumulative winnings after this settlement.
    pub cumulative_winnings: Decimal,
}

impl SettlementResult {
    /// Outcome for a given pool, if it committed.
    #[must_use]
    pub fn outcome(&self, pool: &str) -> Option<&PoolOutcome> {
        self.outcomes.iter().find(|o| o.pool == pool)
    }

    /// Failure for a given pool, if it failed.
    #[must_use]
    pub fn failure(&self, pool: &str) -> Option<&PoolFailure> {
        self.failures.iter().find(|f| f.pool == pool)
    }

    /// Whether any pool paid out.
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.total_won > Decimal::ZERO
    }
}
