//! # jackpot-types
//!
//! Shared types, errors, and configuration for the **Jackpot** wager
//! allocation engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`PlayerId`], [`IdempotencyKey`], [`PoolName`]
//! - **Tiers**: [`Tier`]
//! - **Pool model**: [`PoolConfig`], [`TriggerRule`], [`PoolSnapshot`], [`EligiblePool`]
//! - **Wager model**: [`WagerRequest`], [`Player`]
//! - **Outcomes**: [`PoolOutcome`], [`PoolFailure`], [`SettlementResult`], [`SettlementStatus`]
//! - **Ledger model**: [`TransactionRecord`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`JackpotError`] with `JP_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod outcome;
pub mod player;
pub mod pool;
pub mod record;
pub mod tier;
pub mod wager;

pub use config::*;
pub use error::*;
pub use ids::*;
pub use outcome::*;
pub use player::*;
pub use pool::*;
pub use record::*;
pub use tier::*;
pub use wager::*;

// Constants are accessed via `jackpot_types::constants::FOO`
// (not re-exported to avoid name collisions).
