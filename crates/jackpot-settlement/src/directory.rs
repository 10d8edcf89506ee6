//! Player directory boundary.
//!
//! The engine reads a player's tier before settling and pushes the new
//! cumulative winnings afterwards. The ledger stays the source of truth for
//! winnings; the directory is a collaborator that may lag behind it.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use jackpot_types::{JackpotError, Player, PlayerId, Result, Tier};
use rand::seq::SliceRandom;
use rust_decimal::Decimal;

/// Attempts at minting an unused player code before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Look up a player.
    ///
    /// # Errors
    /// [`JackpotError::PlayerNotFound`] if the ID is unknown.
    async fn get_player(&self, id: &PlayerId) -> Result<Player>;

    /// Store a player's new cumulative winnings.
    async fn update_winnings(&self, id: &PlayerId, new_total: Decimal) -> Result<()>;
}

/// Process-local player directory.
#[derive(Default)]
pub struct InMemoryPlayerDirectory {
    players: RwLock<HashMap<PlayerId, Player>>,
}

impl InMemoryPlayerDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player.
    ///
    /// # Errors
    /// [`JackpotError::DuplicatePlayer`] if the ID is taken.
    pub fn register_player(&self, player: Player) -> Result<()> {
        let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
        if players.contains_key(&player.id) {
            return Err(JackpotError::DuplicatePlayer(player.id));
        }
        tracing::info!(player = %player.id, tier = %player.tier, "Player registered");
        players.insert(player.id.clone(), player);
        Ok(())
    }

    /// Create a player with a fresh code and a tier drawn uniformly from
    /// `tiers`.
    ///
    /// # Errors
    /// - `Configuration` if `tiers` is empty
    /// - `Internal` if no unused player code could be minted
    pub fn register_with_random_tier(&self, tiers: &[Tier]) -> Result<Player> {
        let tier = tiers
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| JackpotError::Configuration("no tiers to assign".into()))?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let player = Player::new(PlayerId::generate(), tier.clone());
            match self.register_player(player.clone()) {
                Ok(()) => return Ok(player),
                Err(JackpotError::DuplicatePlayer(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(JackpotError::Internal(
            "could not mint an unused player code".into(),
        ))
    }

    /// Number of registered players.
    pub fn len(&self) -> usize {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PlayerDirectory for InMemoryPlayerDirectory {
    async fn get_player(&self, id: &PlayerId) -> Result<Player> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| JackpotError::PlayerNotFound(id.clone()))
    }

    async fn update_winnings(&self, id: &PlayerId, new_total: Decimal) -> Result<()> {
        let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
        let player = players
            .get_mut(id)
            .ok_or_else(|| JackpotError::PlayerNotFound(id.clone()))?;
        if new_total < player.cumulative_winnings {
            return Err(JackpotError::AccountingInvariantViolation {
                reason: format!(
                    "player {id}: winnings would drop from {} to {new_total}",
                    player.cumulative_winnings
                ),
            });
        }
        player.cumulative_winnings = new_total;
        Ok(())
    }
}
