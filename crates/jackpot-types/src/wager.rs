//! Wager requests submitted for settlement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{IdempotencyKey, JackpotError, PlayerId, Result, Tier};

/// A single player wager. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerRequest {
    /// Who placed the wager.
    pub player_id: PlayerId,
    /// The player's tier at the time of the wager.
    pub tier: Tier,
    /// Wager amount; must be strictly positive.
    pub amount: Decimal,
    /// Unique per wager attempt; retries reuse it.
    pub idempotency_key: IdempotencyKey,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl WagerRequest {
    #[must_use]
    pub fn new(
        player_id: PlayerId,
        tier: Tier,
        amount: Decimal,
        idempotency_key: IdempotencyKey,
    ) -> Self {
        Self {
            player_id,
            tier,
            amount,
            idempotency_key,
            created_at: Utc::now(),
        }
    }

    /// Reject non-positive amounts.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(JackpotError::InvalidWager {
                amount: self.amount,
            });
        }
        Ok(())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl WagerRequest {
    /// Wager of `amount` whole currency units by an anonymous player.
    pub fn dummy(tier: u32, amount: i64) -> Self {
        Self::new(
            PlayerId::generate(),
            Tier::from(tier),
            Decimal::new(amount, 0),
            IdempotencyKey::new(),
        )
    }
}
