//! Jackpot pool configuration and state snapshots.
//!
//! A pool accumulates a fixed share of every eligible wager and pays out
//! according to its [`TriggerRule`]. Configuration is validated once at
//! registration time; the registry owns the live balance.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{JackpotError, PoolName, Result, Tier};

/// Pool-specific win rule, evaluated against the post-contribution balance.
///
/// The engine never guesses a trigger formula: a pool without a configured
/// rule never pays out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerRule {
    /// The pool never triggers.
    #[default]
    Never,
    /// Triggers once the balance reaches `trigger_at`, paying
    /// `balance × payout_share`.
    Threshold {
        trigger_at: Decimal,
        payout_share: Decimal,
    },
    /// Triggers with probability `min(balance × odds_per_unit, max_odds)`,
    /// paying `balance × payout_share`.
    Probability {
        odds_per_unit: Decimal,
        payout_share: Decimal,
        max_odds: Decimal,
    },
}

impl TriggerRule {
    /// Validate rule parameters.
    pub fn validate(&self) -> Result<()> {
        let in_unit = |d: Decimal| d >= Decimal::ZERO && d <= Decimal::ONE;
        match self {
            Self::Never => Ok(()),
            Self::Threshold {
                trigger_at,
                payout_share,
            } => {
                if *trigger_at <= Decimal::ZERO {
                    return Err(invalid(format!("threshold must be positive, got {trigger_at}")));
                }
                if !in_unit(*payout_share) || payout_share.is_zero() {
                    return Err(invalid(format!("payout share must be in (0, 1], got {payout_share}")));
                }
                Ok(())
            }
            Self::Probability {
                odds_per_unit,
                payout_share,
                max_odds,
            } => {
                if *odds_per_unit < Decimal::ZERO {
                    return Err(invalid(format!("odds per unit must be >= 0, got {odds_per_unit}")));
                }
                if !in_unit(*max_odds) {
                    return Err(invalid(format!("max odds must be in [0, 1], got {max_odds}")));
                }
                if !in_unit(*payout_share) || payout_share.is_zero() {
                    return Err(invalid(format!("payout share must be in (0, 1], got {payout_share}")));
                }
                Ok(())
            }
        }
    }
}

fn invalid(reason: String) -> JackpotError {
    JackpotError::InvalidPoolConfig { reason }
}

/// Registration-time configuration of a jackpot pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Unique pool name.
    pub name: PoolName,
    /// Seed balance of the pool.
    #[serde(default)]
    pub initial_balance: Decimal,
    /// Fraction of each eligible wager routed into this pool (0.10 = 10%).
    pub share: Decimal,
    /// Tiers allowed to contribute.
    pub eligible_tiers: BTreeSet<Tier>,
    /// Inactive pools are skipped by eligibility and reject updates.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Win rule.
    #[serde(default)]
    pub trigger: TriggerRule,
}

fn default_active() -> bool {
    true
}

impl PoolConfig {
    /// Create an active pool with no win rule and zero seed balance.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        share: Decimal,
        eligible_tiers: impl IntoIterator<Item = Tier>,
    ) -> Self {
        Self {
            name: name.into(),
            initial_balance: Decimal::ZERO,
            share,
            eligible_tiers: eligible_tiers.into_iter().collect(),
            active: true,
            trigger: TriggerRule::Never,
        }
    }

    #[must_use]
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.initial_balance = balance;
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: TriggerRule) -> Self {
        self.trigger = trigger;
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether `tier` may contribute to this pool.
    #[must_use]
    pub fn accepts(&self, tier: &Tier) -> bool {
        self.eligible_tiers.contains(tier)
    }

    /// Structural validation. Cross-pool share limits are checked by the
    /// registry.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("pool name must not be empty".into()));
        }
        if self.initial_balance < Decimal::ZERO {
            return Err(invalid(format!(
                "pool {}: initial balance must be >= 0, got {}",
                self.name, self.initial_balance
            )));
        }
        if self.share < Decimal::ZERO || self.share > Decimal::ONE {
            return Err(invalid(format!(
                "pool {}: share must be in [0, 1], got {}",
                self.name, self.share
            )));
        }
        if self.eligible_tiers.is_empty() || self.eligible_tiers.iter().any(Tier::is_blank) {
            return Err(invalid(format!(
                "pool {}: eligible tiers must be non-empty",
                self.name
            )));
        }
        self.trigger.validate()
    }
}

/// Point-in-time view of a registered pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub name: PoolName,
    pub balance: Decimal,
    pub initial_balance: Decimal,
    pub share: Decimal,
    pub eligible_tiers: BTreeSet<Tier>,
    pub active: bool,
    /// Sum of every contribution ever applied.
    pub total_contributed: Decimal,
    /// Sum of every payout ever made.
    pub total_paid_out: Decimal,
    /// Number of times the pool triggered.
    pub payouts: u64,
}

impl PoolSnapshot {
    /// Balance implied by the pool's history.
    #[must_use]
    pub fn expected_balance(&self) -> Decimal {
        self.initial_balance + self.total_contributed - self.total_paid_out
    }
}

/// A pool selected for a wager, with the share it takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligiblePool {
    pub name: PoolName,
    pub share: Decimal,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl PoolConfig {
    /// Pool taking `percent`% of each wager from the given ordinal tiers.
    pub fn sample(name: &str, percent: i64, tiers: &[u32]) -> Self {
        Self::new(
            name,
            Decimal::new(percent, 2),
            tiers.iter().copied().map(Tier::from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_pool_is_valid() {
        let cfg = PoolConfig::sample("A", 10, &[1, 2]);
        assert_eq!(cfg.share, Decimal::new(10, 2));
        assert!(cfg.accepts(&Tier::from(2)));
        assert!(!cfg.accepts(&Tier::from(3)));
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_share_above_one() {
        let cfg = PoolConfig::new("big", Decimal::new(11, 1), [Tier::from(1)]);
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, JackpotError::InvalidPoolConfig { .. }));
    }

    #[test]
    fn rejects_negative_balance_and_empty_tiers() {
        let cfg = PoolConfig::sample("A", 5, &[1]).with_balance(Decimal::NEGATIVE_ONE);
        assert!(cfg.validate().is_err());

        let cfg = PoolConfig::new("B", Decimal::new(5, 2), Vec::<Tier>::new());
        assert!(cfg.validate().is_err());

        let cfg = PoolConfig::sample(" ", 5, &[1]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn trigger_rule_validation() {
        let ok = TriggerRule::Threshold {
            trigger_at: Decimal::new(1000, 0),
            payout_share: Decimal::ONE,
        };
        ok.validate().unwrap();

        let zero_payout = TriggerRule::Threshold {
            trigger_at: Decimal::new(1000, 0),
            payout_share: Decimal::ZERO,
        };
        assert!(zero_payout.validate().is_err());

        let bad_odds = TriggerRule::Probability {
            odds_per_unit: Decimal::new(1, 4),
            payout_share: Decimal::ONE,
            max_odds: Decimal::new(2, 0),
        };
        assert!(bad_odds.validate().is_err());
    }

    #[test]
    fn config_from_json_defaults() {
        let json = r#"{"name":"mini","share":"0.05","eligible_tiers":["1","2"]}"#;
        let cfg: PoolConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.active);
        assert_eq!(cfg.initial_balance, Decimal::ZERO);
        assert_eq!(cfg.trigger, TriggerRule::Never);
        assert_eq!(cfg.eligible_tiers.len(), 2);
    }

    #[test]
    fn trigger_rule_tagged_json() {
        let json = r#"{"kind":"threshold","trigger_at":"500","payout_share":"1"}"#;
        let rule: TriggerRule = serde_json::from_str(json).unwrap();
        assert_eq!(
            rule,
            TriggerRule::Threshold {
                trigger_at: Decimal::new(500, 0),
                payout_share: Decimal::ONE,
            }
        );
    }

    #[test]
    fn snapshot_expected_balance() {
        let snap = PoolSnapshot {
            name: "A".into(),
            balance: Decimal::new(115, 0),
            initial_balance: Decimal::new(100, 0),
            share: Decimal::new(10, 2),
            eligible_tiers: BTreeSet::from([Tier::from(1)]),
            active: true,
            total_contributed: Decimal::new(20, 0),
            total_paid_out: Decimal::new(5, 0),
            payouts: 1,
        };
        assert_eq!(snap.expected_balance(), snap.balance);
    }
}
