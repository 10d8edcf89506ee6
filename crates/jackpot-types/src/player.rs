//! Player model as seen by the settlement engine.
//!
//! Players are owned by an external directory; the engine reads them and
//! updates cumulative winnings after settlement.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PlayerId, Tier};

/// A registered player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub tier: Tier,
    /// Total won across all settlements. Never decreases.
    pub cumulative_winnings: Decimal,
}

impl Player {
    /// New player with zero winnings and a `user_<id>` username.
    #[must_use]
    pub fn new(id: PlayerId, tier: Tier) -> Self {
        Self {
            username: format!("user_{id}"),
            id,
            tier,
            cumulative_winnings: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_defaults() {
        let player = Player::new(PlayerId::from("AB12CD"), Tier::from(2));
        assert_eq!(player.username, "user_AB12CD");
        assert_eq!(player.cumulative_winnings, Decimal::ZERO);
    }
}
