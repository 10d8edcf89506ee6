//! Tier-based pool eligibility.
//!
//! Eligibility is a pure function of a pool snapshot and the player's tier:
//! the result lists every **active** pool whose eligible-tier set contains the
//! tier, ordered by pool name so that contribution splits are reproducible.
//! An empty result is valid; the orchestrator turns it into a rejection.

use jackpot_types::{EligiblePool, PoolConfig, PoolSnapshot, Tier};
use rust_decimal::Decimal;

/// The parts of a pool that eligibility looks at.
pub trait PoolRule {
    fn name(&self) -> &str;
    fn share(&self) -> Decimal;
    fn is_active(&self) -> bool;
    fn accepts(&self, tier: &Tier) -> bool;
}

impl PoolRule for PoolConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn share(&self) -> Decimal {
        self.share
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn accepts(&self, tier: &Tier) -> bool {
        self.eligible_tiers.contains(tier)
    }
}

impl PoolRule for PoolSnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn share(&self) -> Decimal {
        self.share
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn accepts(&self, tier: &Tier) -> bool {
        self.eligible_tiers.contains(tier)
    }
}

/// Active pools accepting `tier`, in lexical name order.
pub fn resolve<'a, P, I>(tier: &Tier, pools: I) -> Vec<EligiblePool>
where
    P: PoolRule + ?Sized + 'a,
    I: IntoIterator<Item = &'a P>,
{
    let mut eligible: Vec<EligiblePool> = pools
        .into_iter()
        .filter(|p| p.is_active() && p.accepts(tier))
        .map(|p| EligiblePool {
            name: p.name().to_string(),
            share: p.share(),
        })
        .collect();
    eligible.sort_by(|a, b| a.name.cmp(&b.name));
    eligible
}
