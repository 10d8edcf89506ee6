//! # jackpot-settlement
//!
//! **Settlement plane**: concurrent per-pool execution, wager orchestration,
//! and the append-only transaction ledger.
//!
//! ## Architecture
//!
//! For each wager the [`WagerOrchestrator`]:
//! 1. Rejects invalid wagers and replays already-settled idempotency keys
//! 2. Resolves eligible pools and splits the wager
//! 3. Fans the contributions out through the [`SettlementExecutor`], each
//!    pool under its own lock and timeout
//! 4. Aggregates a [`SettlementResult`](jackpot_types::SettlementResult)
//!    (`Completed`, `PartiallyFailed` or `Failed`) and audits it
//! 5. Appends exactly one record to the [`TransactionLedger`]
//! 6. Pushes the player's cumulative winnings to the [`PlayerDirectory`]
//!
//! [`WagerService`] is the caller-facing wrapper that looks up the player's
//! tier before settling.

pub mod cache;
pub mod conservation;
pub mod directory;
pub mod executor;
pub mod idempotency;
pub mod keyed_lock;
pub mod ledger;
pub mod orchestrator;
pub mod service;

pub use cache::PoolBalanceCache;
pub use conservation::{PoolConservation, verify_accounting, verify_pool};
pub use directory::{InMemoryPlayerDirectory, PlayerDirectory};
pub use executor::{ExecutionReport, SettlementExecutor};
pub use idempotency::PendingRecords;
pub use keyed_lock::KeyedLocks;
pub use ledger::{FileLedger, InMemoryLedger, TransactionLedger};
pub use orchestrator::WagerOrchestrator;
pub use service::WagerService;
