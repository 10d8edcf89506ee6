//! Configuration for the settlement engine and its pools.

use std::{collections::BTreeSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{JackpotError, PoolConfig, Result, constants};

/// Engine-wide settings plus the pools to register at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound on each per-pool update, in milliseconds.
    pub pool_timeout_ms: u64,
    /// How many times the orchestrator tries a ledger append.
    pub ledger_retry_attempts: u32,
    /// Linear backoff step between ledger attempts, in milliseconds.
    pub ledger_retry_backoff_ms: u64,
    /// Idempotency keys remembered per pool for replayed updates.
    pub replay_cache_size: usize,
    /// Settled-but-unrecorded records kept for retry.
    pub pending_cache_size: usize,
    /// Pools registered when the engine starts.
    pub pools: Vec<PoolConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_timeout_ms: constants::DEFAULT_POOL_TIMEOUT_MS,
            ledger_retry_attempts: constants::DEFAULT_LEDGER_RETRY_ATTEMPTS,
            ledger_retry_backoff_ms: constants::DEFAULT_LEDGER_RETRY_BACKOFF_MS,
            replay_cache_size: constants::DEFAULT_REPLAY_CACHE_SIZE,
            pending_cache_size: constants::DEFAULT_PENDING_CACHE_SIZE,
            pools: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| JackpotError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check engine limits and every pool's structural config.
    pub fn validate(&self) -> Result<()> {
        if self.pool_timeout_ms == 0 {
            return Err(JackpotError::Configuration(
                "pool_timeout_ms must be > 0".into(),
            ));
        }
        if self.ledger_retry_attempts == 0 {
            return Err(JackpotError::Configuration(
                "ledger_retry_attempts must be > 0".into(),
            ));
        }
        if self.replay_cache_size == 0 || self.pending_cache_size == 0 {
            return Err(JackpotError::Configuration(
                "cache sizes must be > 0".into(),
            ));
        }
        let mut names = BTreeSet::new();
        for pool in &self.pools {
            pool.validate()?;
            if !names.insert(pool.name.as_str()) {
                return Err(JackpotError::Configuration(format!(
                    "pool {} configured twice",
                    pool.name
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout_ms)
    }

    #[must_use]
    pub fn ledger_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.ledger_retry_backoff_ms)
    }
}
