//! System-wide constants for the jackpot engine.

/// Currency precision: contributions and payouts are truncated to the cent.
pub const CURRENCY_PRECISION: u32 = 2;

/// Default per-pool operation timeout in milliseconds.
pub const DEFAULT_POOL_TIMEOUT_MS: u64 = 2000;

/// Default number of ledger append attempts before giving up.
pub const DEFAULT_LEDGER_RETRY_ATTEMPTS: u32 = 3;

/// Default linear backoff step between ledger append attempts (milliseconds).
pub const DEFAULT_LEDGER_RETRY_BACKOFF_MS: u64 = 50;

/// Per-pool replay cache size (number of idempotency keys remembered per pool).
pub const DEFAULT_REPLAY_CACHE_SIZE: usize = 100_000;

/// Number of settled-but-unrecorded transaction records kept for retry.
pub const DEFAULT_PENDING_CACHE_SIZE: usize = 10_000;

/// Upper bound for the summed contribution share of one tier (100%).
pub const MAX_TOTAL_SHARE: u32 = 1;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Jackpot";
