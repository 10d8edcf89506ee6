//! Transaction records for the append-only settlement ledger.
//!
//! Every settled wager produces exactly one [`TransactionRecord`], keyed by
//! its idempotency key. Each record carries a SHA-256 digest over its
//! canonical JSON so stored history can be checked for tampering.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{IdempotencyKey, PlayerId, Result, SettlementResult, SettlementStatus, Tier};

/// Immutable record of one settled wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Primary key.
    pub idempotency_key: IdempotencyKey,
    pub recorded_at: DateTime<Utc>,
    pub player_id: PlayerId,
    pub tier: Tier,
    pub wager_amount: Decimal,
    pub result: SettlementResult,
    pub status: SettlementStatus,
}

impl TransactionRecord {
    #[must_use]
    pub fn new(player_id: PlayerId, tier: Tier, result: SettlementResult) -> Self {
        Self {
            idempotency_key: result.idempotency_key.clone(),
            recorded_at: Utc::now(),
            player_id,
            tier,
            wager_amount: result.wager_amount,
            status: result.status,
            result,
        }
    }

    /// SHA-256 over the record's canonical JSON, hex encoded.
    pub fn digest(&self) -> Result<String> {
        let payload = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(b"jackpot:txn:v1:");
        hasher.update(&payload);
        Ok(hex::encode(hasher.finalize()))
    }
}
