//! Error types for the jackpot engine.
//!
//! All errors use the `JP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Wager errors (rejections, zero side effects)
//! - 2xx: Pool errors
//! - 3xx: Ledger errors
//! - 4xx: Player directory errors
//! - 5xx: Invariant violations
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{IdempotencyKey, PlayerId, Tier};

/// Central error enum for all jackpot engine operations.
#[derive(Debug, Error)]
pub enum JackpotError {
    // =================================================================
    // Wager Errors (1xx)
    // =================================================================
    /// The wager amount is zero or negative.
    #[error("JP_ERR_100: Invalid wager amount: {amount}")]
    InvalidWager { amount: Decimal },

    /// The player's tier matches no active pool.
    #[error("JP_ERR_101: No eligible pools for tier {tier}")]
    NoEligiblePools { tier: Tier },

    // =================================================================
    // Pool Errors (2xx)
    // =================================================================
    /// The pool does not exist or is inactive.
    #[error("JP_ERR_200: Pool unavailable: {0}")]
    PoolUnavailable(String),

    /// The pool store did not confirm the update within the allotted window.
    #[error("JP_ERR_201: Pool update timed out: {pool} after {timeout_ms}ms")]
    PoolUpdateTimeout { pool: String, timeout_ms: u64 },

    /// A win condition asked for more than the pool holds.
    #[error("JP_ERR_202: Win {requested} exceeds balance {balance} of pool {pool}")]
    PoolWinExceedsBalance {
        pool: String,
        requested: Decimal,
        balance: Decimal,
    },

    /// A pool with this name is already registered.
    #[error("JP_ERR_203: Pool already registered: {0}")]
    DuplicatePool(String),

    /// The pool configuration failed validation.
    #[error("JP_ERR_204: Invalid pool config: {reason}")]
    InvalidPoolConfig { reason: String },

    /// The shares of the pools accepting a tier would exceed 100%.
    #[error("JP_ERR_205: Contribution shares for tier {tier} sum to {total}, exceeding 1")]
    ContributionOverflow { tier: Tier, total: Decimal },

    /// A contribution was routed to a pool that does not accept the tier.
    #[error("JP_ERR_206: Tier {tier} is not eligible for pool {pool}")]
    TierNotEligible { tier: Tier, pool: String },

    // =================================================================
    // Ledger Errors (3xx)
    // =================================================================
    /// The transaction record could not be appended. Pool state may already
    /// be mutated: the caller must retry with the same idempotency key.
    #[error("JP_ERR_300: Ledger append failed for {key}: {reason}")]
    LedgerAppendFailure { key: IdempotencyKey, reason: String },

    // =================================================================
    // Player Errors (4xx)
    // =================================================================
    /// The player is unknown to the directory.
    #[error("JP_ERR_400: Player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// A player with this ID is already registered.
    #[error("JP_ERR_401: Player already registered: {0}")]
    DuplicatePlayer(PlayerId),

    // =================================================================
    // Invariant Violations (5xx)
    // =================================================================
    /// Contributions, remainder and wager do not reconcile.
    #[error("JP_ERR_500: Accounting invariant violation: {reason}")]
    AccountingInvariantViolation { reason: String },

    /// A pool's balance does not match its contribution/payout history.
    #[error("JP_ERR_501: Pool conservation violation: {reason}")]
    ConservationViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("JP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("JP_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("JP_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("JP_ERR_903: I/O error: {0}")]
    Io(String),
}

impl JackpotError {
    /// Whether this error is a rejection raised before any state was touched.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidWager { .. } | Self::NoEligiblePools { .. } | Self::PlayerNotFound(_)
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, JackpotError>;

impl From<std::io::Error> for JackpotError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for JackpotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
