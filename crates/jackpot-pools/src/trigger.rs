//! Win-condition evaluation.
//!
//! A win condition is an opaque predicate over `(balance, wager, tier)`
//! returning the amount the pool should pay out. It is evaluated against the
//! **post-contribution** balance while the pool's lock is held. The registry
//! clamps any answer larger than the balance.

use jackpot_types::{Tier, TriggerRule, constants::CURRENCY_PRECISION};
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};

/// Inputs visible to a win condition.
#[derive(Debug, Clone, Copy)]
pub struct WinContext<'a> {
    pub pool: &'a str,
    /// Pool balance after this wager's contribution.
    pub balance: Decimal,
    pub wager: Decimal,
    pub tier: &'a Tier,
}

/// Pool-specific payout predicate. Returning zero means "not triggered".
pub trait WinCondition: Send + Sync {
    fn evaluate(&self, ctx: &WinContext<'_>) -> Decimal;
}

/// Resolution of the probability roll (one part in a million).
const ROLL_SCALE: u32 = 6;
const ROLL_RANGE: i64 = 1_000_000;

/// Evaluate a configured rule with an explicit RNG.
pub fn evaluate_rule<R: Rng>(rule: &TriggerRule, ctx: &WinContext<'_>, rng: &mut R) -> Decimal {
    match rule {
        TriggerRule::Never => Decimal::ZERO,
        TriggerRule::Threshold {
            trigger_at,
            payout_share,
        } => {
            if ctx.balance >= *trigger_at {
                payout(ctx.balance, *payout_share)
            } else {
                Decimal::ZERO
            }
        }
        TriggerRule::Probability {
            odds_per_unit,
            payout_share,
            max_odds,
        } => {
            let odds = ctx
                .balance
                .checked_mul(*odds_per_unit)
                .unwrap_or(Decimal::MAX)
                .min(*max_odds);
            let roll = Decimal::new(rng.gen_range(0..ROLL_RANGE), ROLL_SCALE);
            if roll < odds {
                payout(ctx.balance, *payout_share)
            } else {
                Decimal::ZERO
            }
        }
    }
}

impl WinCondition for TriggerRule {
    fn evaluate(&self, ctx: &WinContext<'_>) -> Decimal {
        evaluate_rule(self, ctx, &mut rand::thread_rng())
    }
}

/// `balance × share`, truncated toward zero at currency precision.
fn payout(balance: Decimal, share: Decimal) -> Decimal {
    balance
        .checked_mul(share)
        .unwrap_or(balance)
        .round_dp_with_strategy(CURRENCY_PRECISION, RoundingStrategy::ToZero)
}
