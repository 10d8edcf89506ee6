//! Wager settlement orchestrator.
//!
//! Settles one wager end to end:
//! 1. Validate the amount (rejections have no side effects)
//! 2. Serialise on the idempotency key; replay a recorded or parked result
//! 3. Resolve eligible pools and split the wager
//! 4. Fan out the per-pool updates through the [`SettlementExecutor`]
//! 5. Aggregate outcomes into a [`SettlementResult`] and audit it
//! 6. Append exactly one [`TransactionRecord`], retrying with linear backoff
//! 7. Push the player's winnings and refresh the balance cache
//!
//! If the ledger stays down after the pools have committed, the record is
//! parked in [`PendingRecords`] and [`JackpotError::LedgerAppendFailure`] is
//! returned. Retrying with the same key appends the parked record; the pools
//! are not touched again.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use jackpot_pools::{PoolStore, Split, split};
use jackpot_types::{
    EngineConfig, IdempotencyKey, JackpotError, PlayerId, PoolSnapshot, Result,
    SettlementResult, SettlementStatus, TransactionRecord, WagerRequest,
};
use rust_decimal::Decimal;

use crate::{
    cache::PoolBalanceCache,
    conservation::{self, PoolConservation},
    directory::PlayerDirectory,
    executor::{ExecutionReport, SettlementExecutor},
    idempotency::PendingRecords,
    keyed_lock::KeyedLocks,
    ledger::TransactionLedger,
};

pub struct WagerOrchestrator {
    store: Arc<dyn PoolStore>,
    executor: SettlementExecutor,
    ledger: Arc<dyn TransactionLedger>,
    players: Arc<dyn PlayerDirectory>,
    cache: PoolBalanceCache,
    pending: Mutex<PendingRecords>,
    conservation: Mutex<PoolConservation>,
    key_locks: KeyedLocks<IdempotencyKey>,
    player_locks: KeyedLocks<PlayerId>,
    ledger_retry_attempts: u32,
    ledger_retry_backoff: Duration,
}

impl WagerOrchestrator {
    /// Wire an orchestrator to its collaborators.
    ///
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn PoolStore>,
        ledger: Arc<dyn TransactionLedger>,
        players: Arc<dyn PlayerDirectory>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            executor: SettlementExecutor::new(Arc::clone(&store), config.pool_timeout()),
            store,
            ledger,
            players,
            cache: PoolBalanceCache::new(),
            pending: Mutex::new(PendingRecords::new(config.pending_cache_size)),
            conservation: Mutex::new(PoolConservation::new()),
            key_locks: KeyedLocks::new(),
            player_locks: KeyedLocks::new(),
            ledger_retry_attempts: config.ledger_retry_attempts,
            ledger_retry_backoff: config.ledger_retry_backoff(),
        })
    }

    /// Balance cache refreshed by every recorded settlement.
    #[must_use]
    pub fn cache(&self) -> &PoolBalanceCache {
        &self.cache
    }

    /// Number of settlements awaiting a ledger append.
    pub fn pending_records(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check each snapshot against its own history and against the outcomes
    /// recorded through this orchestrator.
    ///
    /// # Errors
    /// `ConservationViolation` for the first pool that does not reconcile.
    pub fn audit_pools(&self, snapshots: &[PoolSnapshot]) -> Result<()> {
        let tracker = self
            .conservation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for snapshot in snapshots {
            tracker.verify(snapshot)?;
        }
        Ok(())
    }

    /// Settle one wager.
    ///
    /// # Errors
    /// - `InvalidWager`, `NoEligiblePools`, `PlayerNotFound`: rejected, nothing
    ///   was touched
    /// - `LedgerAppendFailure`: pools may have been updated; retry with the
    ///   same idempotency key
    pub async fn settle(&self, wager: &WagerRequest) -> Result<SettlementResult> {
        wager.validate()?;
        let key = &wager.idempotency_key;
        let _key_guard = self.key_locks.lock(key).await;

        let parked = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take(key);
        if let Some(record) = parked {
            tracing::info!(key = %key, "Retrying ledger append for settled wager");
            return self.record_parked(record).await;
        }

        if let Some(existing) = self.ledger.get(key).await? {
            if existing.wager_amount != wager.amount {
                tracing::warn!(
                    key = %key,
                    recorded = %existing.wager_amount,
                    requested = %wager.amount,
                    "Idempotency key reused with a different amount; returning recorded result"
                );
            }
            tracing::debug!(key = %key, "Returning recorded settlement");
            return Ok(existing.result);
        }

        let eligible = self.store.list_eligible_pools(&wager.tier).await?;
        if eligible.is_empty() {
            return Err(JackpotError::NoEligiblePools {
                tier: wager.tier.clone(),
            });
        }
        let plan = split(wager.amount, &eligible)?;

        let _player_guard = self.player_locks.lock(&wager.player_id).await;
        let player = self.players.get_player(&wager.player_id).await?;

        let report = self.executor.execute(key, &wager.tier, &plan).await;
        let result = aggregate(key, &plan, report, player.cumulative_winnings);

        if let Err(err) = conservation::verify_accounting(&result) {
            tracing::error!(key = %key, error = %err, "Settlement failed accounting audit");
        }

        let record = TransactionRecord::new(wager.player_id.clone(), wager.tier.clone(), result);
        self.record(record).await
    }

    /// Re-append a parked record, refreshing its cumulative winnings from the
    /// directory first since other wagers may have settled meanwhile.
    async fn record_parked(&self, mut record: TransactionRecord) -> Result<SettlementResult> {
        let _player_guard = self.player_locks.lock(&record.player_id).await;
        match self.players.get_player(&record.player_id).await {
            Ok(player) => {
                record.result.cumulative_winnings = if record.status == SettlementStatus::Failed {
                    player.cumulative_winnings
                } else {
                    player.cumulative_winnings + record.result.total_won
                };
            }
            Err(err) => {
                tracing::warn!(
                    key = %record.idempotency_key,
                    player = %record.player_id,
                    error = %err,
                    "Could not refresh winnings for parked record"
                );
            }
        }
        self.record(record).await
    }

    /// Append `record` and run post-commit side effects. Must be called with
    /// the record's key lock and player lock held.
    async fn record(&self, record: TransactionRecord) -> Result<SettlementResult> {
        match self.append_with_retry(&record).await {
            Ok(None) => {
                self.after_commit(&record).await;
                Ok(record.result)
            }
            // An earlier attempt of this same record landed but its ack was
            // lost. Winnings may have been refreshed since, so match on
            // identity rather than the digest.
            Ok(Some(previous)) if is_same_settlement(&previous, &record) => {
                tracing::warn!(
                    key = %record.idempotency_key,
                    "Ledger append landed without acknowledgement; completing settlement"
                );
                self.after_commit(&previous).await;
                Ok(previous.result)
            }
            Ok(Some(previous)) => {
                tracing::warn!(
                    key = %record.idempotency_key,
                    "Ledger already held a record for this key; discarding new result"
                );
                Ok(previous.result)
            }
            Err(reason) => {
                let key = record.idempotency_key.clone();
                tracing::error!(
                    key = %key,
                    attempts = self.ledger_retry_attempts,
                    reason = %reason,
                    "Ledger append exhausted; settlement parked for retry"
                );
                self.pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .park(record);
                Err(JackpotError::LedgerAppendFailure { key, reason })
            }
        }
    }

    /// `Ok(None)` once appended, `Ok(Some(_))` if the key was already present,
    /// `Err(reason)` when every attempt failed.
    async fn append_with_retry(
        &self,
        record: &TransactionRecord,
    ) -> std::result::Result<Option<TransactionRecord>, String> {
        let mut last_error = String::new();
        for attempt in 1..=self.ledger_retry_attempts {
            match self.ledger.append(record.clone()).await {
                Ok(previous) => return Ok(previous),
                Err(err) => {
                    tracing::warn!(
                        key = %record.idempotency_key,
                        attempt,
                        error = %err,
                        "Ledger append failed"
                    );
                    last_error = err.to_string();
                    if attempt < self.ledger_retry_attempts {
                        tokio::time::sleep(self.ledger_retry_backoff * attempt).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    async fn after_commit(&self, record: &TransactionRecord) {
        let result = &record.result;
        {
            let mut tracker = self
                .conservation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for outcome in &result.outcomes {
                tracker.record_outcome(outcome);
            }
        }

        if result.status != SettlementStatus::Failed {
            if let Err(err) = self
                .players
                .update_winnings(&record.player_id, result.cumulative_winnings)
                .await
            {
                tracing::warn!(
                    key = %record.idempotency_key,
                    player = %record.player_id,
                    error = %err,
                    "Player winnings update failed; ledger holds the authoritative total"
                );
            }
        }

        self.cache.apply(&result.outcomes);

        tracing::info!(
            key = %record.idempotency_key,
            player = %record.player_id,
            tier = %record.tier,
            amount = %result.wager_amount,
            contributed = %result.total_contributions,
            won = %result.total_won,
            remainder = %result.house_remainder,
            status = %result.status,
            "Wager settled"
        );
    }
}

/// Whether `stored` is an earlier append of `attempted`, as opposed to a
/// record written by a different settlement under the same key.
fn is_same_settlement(stored: &TransactionRecord, attempted: &TransactionRecord) -> bool {
    stored.idempotency_key == attempted.idempotency_key
        && stored.recorded_at == attempted.recorded_at
        && stored.player_id == attempted.player_id
        && stored.result.outcomes == attempted.result.outcomes
}

/// Fold the executor's report into a settlement result. Failed pools'
/// contributions fall to the house remainder.
fn aggregate(
    key: &IdempotencyKey,
    plan: &Split,
    report: ExecutionReport,
    previous_winnings: Decimal,
) -> SettlementResult {
    let ExecutionReport {
        mut outcomes,
        mut failures,
    } = report;
    outcomes.sort_by(|a, b| a.pool.cmp(&b.pool));
    failures.sort_by(|a, b| a.pool.cmp(&b.pool));

    let total_contributions: Decimal = outcomes.iter().map(|o| o.contribution).sum();
    let total_won: Decimal = outcomes.iter().map(|o| o.amount_won).sum();
    let total_contribution_share: Decimal = plan
        .contributions
        .iter()
        .filter(|c| outcomes.iter().any(|o| o.pool == c.pool))
        .map(|c| c.share)
        .sum();
    let status = SettlementStatus::from_counts(outcomes.len(), failures.len());
    let cumulative_winnings = if status == SettlementStatus::Failed {
        previous_winnings
    } else {
        previous_winnings + total_won
    };

    SettlementResult {
        idempotency_key: key.clone(),
        wager_amount: plan.wager,
        total_contributions,
        total_won,
        house_remainder: plan.wager - total_contributions,
        total_contribution_share,
        outcomes,
        failures,
        status,
        cumulative_winnings,
    }
}
