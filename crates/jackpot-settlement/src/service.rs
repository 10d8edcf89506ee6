//! Wager service: the entry point for placing wagers.
//!
//! Looks up the player's current tier, builds a [`WagerRequest`] and hands
//! it to the [`WagerOrchestrator`].

use std::{collections::BTreeMap, sync::Arc};

use jackpot_types::{
    IdempotencyKey, JackpotError, PlayerId, PoolName, Result, SettlementResult, WagerRequest,
};
use rust_decimal::Decimal;

use crate::{directory::PlayerDirectory, orchestrator::WagerOrchestrator};

pub struct WagerService {
    orchestrator: Arc<WagerOrchestrator>,
    players: Arc<dyn PlayerDirectory>,
}

impl WagerService {
    #[must_use]
    pub fn new(orchestrator: Arc<WagerOrchestrator>, players: Arc<dyn PlayerDirectory>) -> Self {
        Self {
            orchestrator,
            players,
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> &WagerOrchestrator {
        &self.orchestrator
    }

    /// Place a wager under a freshly minted idempotency key.
    pub async fn place_wager(
        &self,
        player_id: &PlayerId,
        amount: Decimal,
    ) -> Result<SettlementResult> {
        self.place_wager_with_key(player_id, amount, IdempotencyKey::new())
            .await
    }

    /// Place a wager under a caller-chosen key. Retrying with the same key
    /// never settles twice.
    pub async fn place_wager_with_key(
        &self,
        player_id: &PlayerId,
        amount: Decimal,
        key: IdempotencyKey,
    ) -> Result<SettlementResult> {
        if amount <= Decimal::ZERO {
            return Err(JackpotError::InvalidWager { amount });
        }
        let player = self.players.get_player(player_id).await?;
        let request = WagerRequest::new(player.id, player.tier, amount, key);
        self.orchestrator.settle(&request).await
    }

    /// Cached pool balances, ordered by pool name.
    pub fn pool_balances(&self) -> BTreeMap<PoolName, Decimal> {
        self.orchestrator.cache().all()
    }
}
