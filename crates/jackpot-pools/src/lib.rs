//! # jackpot-pools
//!
//! **Pool plane**: the authoritative pool registry and the pure allocation
//! steps that run before any pool is touched.
//!
//! ## Architecture
//!
//! 1. **PoolRegistry**: pool balances, each behind its own lock; implements [`PoolStore`]
//! 2. **Eligibility**: active pools accepting the player's tier, name-ordered
//! 3. **Splitter**: per-pool contributions truncated to the cent, exact house remainder
//! 4. **Trigger**: opaque per-pool win conditions evaluated on the post-contribution balance
//!
//! ## Wager Flow
//!
//! ```text
//! tier → eligibility::resolve() → splitter::split() → PoolStore::apply_contribution() × N
//! ```

pub mod eligibility;
pub mod registry;
pub mod replay;
pub mod splitter;
pub mod store;
pub mod trigger;

pub use eligibility::{PoolRule, resolve};
pub use registry::PoolRegistry;
pub use replay::ReplayCache;
pub use splitter::{Contribution, Split, split, truncate_to_cent};
pub use store::{ContributionRequest, PoolStore};
pub use trigger::{WinCondition, WinContext, evaluate_rule};
