//! Contribution splitting.
//!
//! Each eligible pool takes `truncate_to_cent(wager × share)`; whatever is
//! left is the house remainder. Truncation always rounds toward zero, so the
//! remainder absorbs every sub-cent fraction and the split is exact:
//!
//! ```text
//! Σ contribution_i + house_remainder == wager
//! ```
//!
//! The registry guarantees `Σ share_i ≤ 1` for every tier, so the remainder is
//! never negative.

use jackpot_types::{
    EligiblePool, JackpotError, PoolName, Result, constants::CURRENCY_PRECISION,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// One pool's slice of a wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub pool: PoolName,
    pub share: Decimal,
    pub amount: Decimal,
}

/// A wager split across its eligible pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub wager: Decimal,
    pub contributions: Vec<Contribution>,
    pub house_remainder: Decimal,
}

impl Split {
    #[must_use]
    pub fn total_contributions(&self) -> Decimal {
        self.contributions.iter().map(|c| c.amount).sum()
    }

    /// Contribution planned for `pool`.
    #[must_use]
    pub fn amount_for(&self, pool: &str) -> Option<Decimal> {
        self.contributions
            .iter()
            .find(|c| c.pool == pool)
            .map(|c| c.amount)
    }
}

/// Truncate toward zero at currency precision.
#[must_use]
pub fn truncate_to_cent(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_PRECISION, RoundingStrategy::ToZero)
}

/// Split `wager` across `eligible` pools.
///
/// # Errors
/// - [`JackpotError::InvalidWager`] if `wager <= 0`
/// - [`JackpotError::AccountingInvariantViolation`] if the shares exceed 100%
///   (the registry should have made this impossible)
pub fn split(wager: Decimal, eligible: &[EligiblePool]) -> Result<Split> {
    if wager <= Decimal::ZERO {
        return Err(JackpotError::InvalidWager { amount: wager });
    }

    let mut contributions = Vec::with_capacity(eligible.len());
    for pool in eligible {
        let raw = wager
            .checked_mul(pool.share)
            .ok_or_else(|| JackpotError::AccountingInvariantViolation {
                reason: format!("contribution overflow for pool {}", pool.name),
            })?;
        contributions.push(Contribution {
            pool: pool.name.clone(),
            share: pool.share,
            amount: truncate_to_cent(raw),
        });
    }

    let total: Decimal = contributions.iter().map(|c| c.amount).sum();
    let house_remainder = wager - total;
    if house_remainder < Decimal::ZERO {
        return Err(JackpotError::AccountingInvariantViolation {
            reason: format!("contributions {total} exceed wager {wager}"),
        });
    }

    Ok(Split {
        wager,
        contributions,
        house_remainder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(name: &str, percent: i64) -> EligiblePool {
        EligiblePool {
            name: name.into(),
            share: Decimal::new(percent, 2),
        }
    }

    #[test]
    fn two_pool_scenario() {
        let split = split(Decimal::new(100, 0), &[pool("A", 10), pool("B", 5)]).unwrap();
        assert_eq!(split.amount_for("A"), Some(Decimal::new(10, 0)));
        assert_eq!(split.amount_for("B"), Some(Decimal::new(5, 0)));
        assert_eq!(split.house_remainder, Decimal::new(85, 0));
    }

    #[test]
    fn single_pool_scenario() {
        let split = split(Decimal::new(100, 0), &[pool("A", 10)]).unwrap();
        assert_eq!(split.total_contributions(), Decimal::new(10, 0));
        assert_eq!(split.house_remainder, Decimal::new(90, 0));
    }

    #[test]
    fn sub_cent_fractions_go_to_house() {
        // 3% of 0.99 = 0.0297 -> 0.02 ; 7% of 0.99 = 0.0693 -> 0.06
        let wager = Decimal::new(99, 2);
        let split = split(wager, &[pool("A", 3), pool("B", 7)]).unwrap();
        assert_eq!(split.amount_for("A"), Some(Decimal::new(2, 2)));
        assert_eq!(split.amount_for("B"), Some(Decimal::new(6, 2)));
        assert_eq!(split.house_remainder, Decimal::new(91, 2));
        assert_eq!(split.total_contributions() + split.house_remainder, wager);
    }

    #[test]
    fn accounting_is_exact_across_many_wagers() {
        let pools = [pool("A", 10), pool("B", 5), pool("C", 33)];
        for cents in 1..2_000 {
            let wager = Decimal::new(cents * 7 + 3, 3);
            let split = split(wager, &pools).unwrap();
            assert_eq!(split.total_contributions() + split.house_remainder, wager);
            assert!(split.house_remainder >= Decimal::ZERO);
        }
    }

    #[test]
    fn no_pools_means_all_house() {
        let split = split(Decimal::new(50, 0), &[]).unwrap();
        assert!(split.contributions.is_empty());
        assert_eq!(split.house_remainder, Decimal::new(50, 0));
    }

    #[test]
    fn non_positive_wager_rejected() {
        for wager in [Decimal::ZERO, Decimal::NEGATIVE_ONE] {
            let err = split(wager, &[pool("A", 10)]).unwrap_err();
            assert!(matches!(err, JackpotError::InvalidWager { .. }));
        }
    }

    #[test]
    fn oversubscribed_shares_caught() {
        let err = split(Decimal::new(100, 0), &[pool("A", 60), pool("B", 50)]).unwrap_err();
        assert!(matches!(err, JackpotError::AccountingInvariantViolation { .. }));
    }

    #[test]
    fn truncation_is_toward_zero() {
        assert_eq!(truncate_to_cent(Decimal::new(12_999, 3)), Decimal::new(1299, 2));
        assert_eq!(truncate_to_cent(Decimal::new(5, 3)), Decimal::ZERO);
    }
}
