//! End-to-end settlement tests.
//!
//! These drive the full path (service, orchestrator, executor, registry,
//! ledger and directory) in realistic scenarios: split accounting, tier
//! eligibility, idempotent retries, concurrent wagers, per-pool timeouts,
//! ledger outages and lost acknowledgements, and ledger persistence across
//! restarts.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use jackpot_pools::{ContributionRequest, PoolRegistry, PoolStore};
use jackpot_settlement::{
    FileLedger, InMemoryLedger, InMemoryPlayerDirectory, PlayerDirectory, TransactionLedger,
    WagerOrchestrator, WagerService,
};
use jackpot_types::*;
use rust_decimal::Decimal;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn dollars(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

/// A 10% tiers {1,2}, B 5% tier {1}.
fn config() -> EngineConfig {
    EngineConfig {
        pool_timeout_ms: 250,
        ledger_retry_attempts: 3,
        ledger_retry_backoff_ms: 1,
        pools: vec![
            PoolConfig::sample("A", 10, &[1, 2]),
            PoolConfig::sample("B", 5, &[1]),
        ],
        ..EngineConfig::default()
    }
}

/// Store wrapper that can stall or fail chosen pools.
struct FaultyStore {
    inner: Arc<PoolRegistry>,
    stalled: Vec<&'static str>,
    broken: Vec<&'static str>,
}

#[async_trait]
impl PoolStore for FaultyStore {
    async fn list_eligible_pools(&self, tier: &Tier) -> Result<Vec<EligiblePool>> {
        self.inner.list_eligible_pools(tier).await
    }

    async fn apply_contribution(&self, request: &ContributionRequest) -> Result<PoolOutcome> {
        if self.stalled.contains(&request.pool.as_str()) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.broken.contains(&request.pool.as_str()) {
            return Err(JackpotError::PoolUnavailable(request.pool.clone()));
        }
        self.inner.apply_contribution(request).await
    }
}

/// Ledger whose appends fail while `down` is set.
struct FlakyLedger {
    inner: InMemoryLedger,
    down: AtomicBool,
}

#[async_trait]
impl TransactionLedger for FlakyLedger {
    async fn append(&self, record: TransactionRecord) -> Result<Option<TransactionRecord>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(JackpotError::Io("ledger unreachable".into()));
        }
        self.inner.append(record).await
    }

    async fn get(&self, key: &IdempotencyKey) -> Result<Option<TransactionRecord>> {
        self.inner.get(key).await
    }
}

/// Ledger that stores each record but reports failure for the first
/// `lost_acks` appends, as if the reply never made it back.
struct LostAckLedger {
    inner: InMemoryLedger,
    lost_acks: AtomicU32,
}

#[async_trait]
impl TransactionLedger for LostAckLedger {
    async fn append(&self, record: TransactionRecord) -> Result<Option<TransactionRecord>> {
        let stored = self.inner.append(record).await?;
        let lose = self
            .lost_acks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            return Err(JackpotError::Io("connection reset".into()));
        }
        Ok(stored)
    }

    async fn get(&self, key: &IdempotencyKey) -> Result<Option<TransactionRecord>> {
        self.inner.get(key).await
    }
}

struct Harness {
    registry: Arc<PoolRegistry>,
    players: Arc<InMemoryPlayerDirectory>,
    orchestrator: Arc<WagerOrchestrator>,
    service: WagerService,
}

fn harness_with(
    config: &EngineConfig,
    registry: Arc<PoolRegistry>,
    store: Arc<dyn PoolStore>,
    ledger: Arc<dyn TransactionLedger>,
) -> Harness {
    let players = Arc::new(InMemoryPlayerDirectory::new());
    let orchestrator =
        Arc::new(WagerOrchestrator::new(config, store, ledger, players.clone()).unwrap());
    let service = WagerService::new(orchestrator.clone(), players.clone());
    Harness {
        registry,
        players,
        orchestrator,
        service,
    }
}

fn harness(ledger: Arc<dyn TransactionLedger>) -> Harness {
    let cfg = config();
    let registry = Arc::new(PoolRegistry::from_config(&cfg).unwrap());
    harness_with(&cfg, registry.clone(), registry, ledger)
}

/// Single MEGA pool, 10% from tier 1, paying out in full at 1000.
fn mega_harness(ledger: Arc<dyn TransactionLedger>) -> Harness {
    let cfg = EngineConfig {
        pools: vec![
            PoolConfig::sample("MEGA", 10, &[1])
                .with_balance(dollars(995))
                .with_trigger(TriggerRule::Threshold {
                    trigger_at: dollars(1000),
                    payout_share: Decimal::ONE,
                }),
        ],
        ..config()
    };
    let registry = Arc::new(PoolRegistry::from_config(&cfg).unwrap());
    harness_with(&cfg, registry.clone(), registry, ledger)
}

fn add_player(players: &InMemoryPlayerDirectory, id: &str, tier: u32) -> PlayerId {
    let id = PlayerId::from(id);
    players
        .register_player(Player::new(id.clone(), Tier::from(tier)))
        .unwrap();
    id
}

// ---------------------------------------------------------------------------
// Accounting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hundred_dollar_wagers_by_tier() {
    init_tracing();
    let ledger = Arc::new(InMemoryLedger::new());
    let h = harness(ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);
    let silver = add_player(&h.players, "SILV01", 2);

    let r1 = h.service.place_wager(&gold, dollars(100)).await.unwrap();
    assert_eq!(r1.status, SettlementStatus::Completed);
    assert_eq!(r1.outcome("A").unwrap().contribution, dollars(10));
    assert_eq!(r1.outcome("B").unwrap().contribution, dollars(5));
    assert_eq!(r1.house_remainder, dollars(85));

    let r2 = h.service.place_wager(&silver, dollars(100)).await.unwrap();
    assert_eq!(r2.outcomes.len(), 1);
    assert_eq!(r2.outcome("A").unwrap().contribution, dollars(10));
    assert_eq!(r2.house_remainder, dollars(90));

    assert_eq!(h.registry.balance("A").await.unwrap(), dollars(20));
    assert_eq!(h.registry.balance("B").await.unwrap(), dollars(5));
    assert_eq!(ledger.len(), 2);
    h.orchestrator
        .audit_pools(&h.registry.snapshot().await)
        .unwrap();
}

#[tokio::test]
async fn sub_cent_fractions_go_to_house() {
    let h = harness(Arc::new(InMemoryLedger::new()));
    let gold = add_player(&h.players, "GOLD01", 1);

    let result = h
        .service
        .place_wager(&gold, Decimal::new(1999, 2))
        .await
        .unwrap();
    // 19.99 × 10% = 1.999 → 1.99; × 5% = 0.9995 → 0.99
    assert_eq!(result.outcome("A").unwrap().contribution, Decimal::new(199, 2));
    assert_eq!(result.outcome("B").unwrap().contribution, Decimal::new(99, 2));
    assert_eq!(result.house_remainder, Decimal::new(1701, 2));
    assert_eq!(
        result.total_contributions + result.house_remainder,
        result.wager_amount
    );
}

#[tokio::test]
async fn zero_wager_leaves_no_trace() {
    let ledger = Arc::new(InMemoryLedger::new());
    let h = harness(ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);

    let err = h.service.place_wager(&gold, Decimal::ZERO).await.unwrap_err();
    assert!(matches!(err, JackpotError::InvalidWager { .. }));
    let err = h.service.place_wager(&gold, dollars(-5)).await.unwrap_err();
    assert!(matches!(err, JackpotError::InvalidWager { .. }));

    assert!(ledger.is_empty());
    assert_eq!(h.registry.balance("A").await.unwrap(), Decimal::ZERO);
    assert!(h.service.pool_balances().is_empty());
}

#[tokio::test]
async fn tier_never_reaches_excluded_pool() {
    let h = harness(Arc::new(InMemoryLedger::new()));
    for (n, tier) in [1u32, 2, 1, 2, 2].into_iter().enumerate() {
        let player = add_player(&h.players, &format!("P{n}"), tier);
        let result = h.service.place_wager(&player, dollars(40)).await.unwrap();
        for outcome in &result.outcomes {
            let snap = h.registry.pool(&outcome.pool).await.unwrap();
            assert!(snap.eligible_tiers.contains(&Tier::from(tier)));
        }
    }
    // Only the two tier-1 wagers reached B.
    assert_eq!(h.registry.balance("B").await.unwrap(), dollars(4));
    assert_eq!(h.registry.balance("A").await.unwrap(), dollars(20));
}

#[tokio::test]
async fn jackpot_win_credits_player() {
    let h = mega_harness(Arc::new(InMemoryLedger::new()));
    let gold = add_player(&h.players, "GOLD01", 1);

    let small = h.service.place_wager(&gold, dollars(10)).await.unwrap();
    assert!(!small.is_win());

    let big = h.service.place_wager(&gold, dollars(40)).await.unwrap();
    assert!(big.is_win());
    // 995 + 1 + 4 = 1000, paid out in full.
    assert_eq!(big.total_won, dollars(1000));
    assert_eq!(big.outcome("MEGA").unwrap().new_balance, Decimal::ZERO);
    assert_eq!(big.cumulative_winnings, dollars(1000));

    let player = h.players.get_player(&gold).await.unwrap();
    assert_eq!(player.cumulative_winnings, dollars(1000));
    h.orchestrator
        .audit_pools(&h.registry.snapshot().await)
        .unwrap();
}

// ---------------------------------------------------------------------------
// Idempotency and concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_retries_settle_once() {
    let ledger = Arc::new(InMemoryLedger::new());
    let h = Arc::new(harness(ledger.clone()));
    let gold = add_player(&h.players, "GOLD01", 1);
    let key = IdempotencyKey::from("wager-42");

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let h = Arc::clone(&h);
            let gold = gold.clone();
            let key = key.clone();
            tokio::spawn(async move {
                h.service
                    .place_wager_with_key(&gold, dollars(100), key)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(ledger.len(), 1);
    assert_eq!(h.registry.balance("A").await.unwrap(), dollars(10));
    assert_eq!(h.registry.balance("B").await.unwrap(), dollars(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_wagers_accumulate_exactly() {
    const N: i64 = 100;
    let cfg = EngineConfig {
        pools: vec![PoolConfig::sample("A", 10, &[1]).with_balance(dollars(1000))],
        ..config()
    };
    let registry = Arc::new(PoolRegistry::from_config(&cfg).unwrap());
    let ledger = Arc::new(InMemoryLedger::new());
    let h = Arc::new(harness_with(
        &cfg,
        registry.clone(),
        registry,
        ledger.clone(),
    ));

    let handles: Vec<_> = (0..N)
        .map(|n| {
            let h = Arc::clone(&h);
            let player = add_player(&h.players, &format!("P{n}"), 1);
            tokio::spawn(async move {
                h.service
                    .place_wager(&player, Decimal::new(1250, 2))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().status, SettlementStatus::Completed);
    }

    // B + N × C with C = 1.25
    let expected = dollars(1000) + Decimal::new(125, 2) * Decimal::from(N);
    assert_eq!(h.registry.balance("A").await.unwrap(), expected);
    assert_eq!(ledger.len(), 100);
    h.orchestrator
        .audit_pools(&h.registry.snapshot().await)
        .unwrap();
}

// ---------------------------------------------------------------------------
// Partial failure
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn timed_out_pool_yields_partial_failure() {
    init_tracing();
    let cfg = config();
    let registry = Arc::new(PoolRegistry::from_config(&cfg).unwrap());
    let store = Arc::new(FaultyStore {
        inner: registry.clone(),
        stalled: vec!["B"],
        broken: Vec::new(),
    });
    let ledger = Arc::new(InMemoryLedger::new());
    let h = harness_with(&cfg, registry, store, ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);

    let result = h.service.place_wager(&gold, dollars(100)).await.unwrap();
    assert_eq!(result.status, SettlementStatus::PartiallyFailed);
    assert_eq!(result.outcome("A").unwrap().contribution, dollars(10));
    assert_eq!(
        result.failure("B").unwrap().reason,
        PoolFailureReason::Timeout { timeout_ms: 250 }
    );
    assert_eq!(result.house_remainder, dollars(90));

    assert_eq!(ledger.len(), 1);
    assert_eq!(
        ledger.records()[0].status,
        SettlementStatus::PartiallyFailed
    );
    assert_eq!(h.registry.balance("A").await.unwrap(), dollars(10));
    assert_eq!(h.registry.balance("B").await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn all_pools_failing_is_recorded_as_failed() {
    let cfg = config();
    let registry = Arc::new(PoolRegistry::from_config(&cfg).unwrap());
    let store = Arc::new(FaultyStore {
        inner: registry.clone(),
        stalled: Vec::new(),
        broken: vec!["A", "B"],
    });
    let ledger = Arc::new(InMemoryLedger::new());
    let h = harness_with(&cfg, registry, store, ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);
    h.players.update_winnings(&gold, dollars(7)).await.unwrap();

    let result = h.service.place_wager(&gold, dollars(100)).await.unwrap();
    assert_eq!(result.status, SettlementStatus::Failed);
    assert!(result.outcomes.is_empty());
    assert_eq!(result.failures.len(), 2);
    assert_eq!(result.house_remainder, dollars(100));
    assert_eq!(result.cumulative_winnings, dollars(7));

    assert_eq!(ledger.len(), 1);
    assert_eq!(
        h.players.get_player(&gold).await.unwrap().cumulative_winnings,
        dollars(7)
    );
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ledger_outage_is_retried_without_reapplying_pools() {
    init_tracing();
    let ledger = Arc::new(FlakyLedger {
        inner: InMemoryLedger::new(),
        down: AtomicBool::new(true),
    });
    let h = harness(ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);
    let key = IdempotencyKey::from("outage-1");

    let err = h
        .service
        .place_wager_with_key(&gold, dollars(100), key.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, JackpotError::LedgerAppendFailure { ref key, .. } if key.as_str() == "outage-1"));
    assert!(!err.is_rejection());
    // Pools committed before the append failed.
    assert_eq!(h.registry.balance("A").await.unwrap(), dollars(10));
    assert_eq!(h.orchestrator.pending_records(), 1);
    assert!(ledger.inner.is_empty());

    // Still down: retry fails again and the record stays parked.
    assert!(
        h.service
            .place_wager_with_key(&gold, dollars(100), key.clone())
            .await
            .is_err()
    );
    assert_eq!(h.orchestrator.pending_records(), 1);

    ledger.down.store(false, Ordering::SeqCst);
    let result = h
        .service
        .place_wager_with_key(&gold, dollars(100), key.clone())
        .await
        .unwrap();
    assert_eq!(result.status, SettlementStatus::Completed);
    assert_eq!(result.house_remainder, dollars(85));
    assert_eq!(ledger.inner.len(), 1);
    assert_eq!(h.orchestrator.pending_records(), 0);
    assert_eq!(h.registry.balance("A").await.unwrap(), dollars(10));
    assert_eq!(h.registry.balance("B").await.unwrap(), dollars(5));

    // Later retries hit the ledger.
    let again = h
        .service
        .place_wager_with_key(&gold, dollars(100), key)
        .await
        .unwrap();
    assert_eq!(again, result);
    h.orchestrator
        .audit_pools(&h.registry.snapshot().await)
        .unwrap();
}

#[tokio::test]
async fn parked_win_is_credited_on_retry() {
    init_tracing();
    let ledger = Arc::new(FlakyLedger {
        inner: InMemoryLedger::new(),
        down: AtomicBool::new(true),
    });
    let h = mega_harness(ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);
    let key = IdempotencyKey::from("parked-win");

    let err = h
        .service
        .place_wager_with_key(&gold, dollars(100), key.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, JackpotError::LedgerAppendFailure { .. }));
    // 995 + 10 crossed the threshold and paid out before the append failed.
    assert_eq!(h.registry.balance("MEGA").await.unwrap(), Decimal::ZERO);
    assert_eq!(h.orchestrator.pending_records(), 1);
    let player = h.players.get_player(&gold).await.unwrap();
    assert_eq!(player.cumulative_winnings, Decimal::ZERO);

    // Winnings credited elsewhere while the record sat parked.
    h.players.update_winnings(&gold, dollars(50)).await.unwrap();

    ledger.down.store(false, Ordering::SeqCst);
    let result = h
        .service
        .place_wager_with_key(&gold, dollars(100), key)
        .await
        .unwrap();
    assert!(result.is_win());
    assert_eq!(result.total_won, dollars(1005));
    assert_eq!(result.cumulative_winnings, dollars(1055));

    let player = h.players.get_player(&gold).await.unwrap();
    assert_eq!(player.cumulative_winnings, dollars(1055));
    assert_eq!(ledger.inner.len(), 1);
    assert_eq!(ledger.inner.records()[0].result, result);
    assert_eq!(h.orchestrator.pending_records(), 0);
    // Not re-contributed: a second apply would have left 10 behind.
    assert_eq!(h.registry.balance("MEGA").await.unwrap(), Decimal::ZERO);
    assert_eq!(h.service.pool_balances().get("MEGA"), Some(&Decimal::ZERO));
    h.orchestrator
        .audit_pools(&h.registry.snapshot().await)
        .unwrap();
}

#[tokio::test]
async fn lost_append_ack_still_completes_settlement() {
    init_tracing();
    let ledger = Arc::new(LostAckLedger {
        inner: InMemoryLedger::new(),
        lost_acks: AtomicU32::new(1),
    });
    let h = mega_harness(ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);

    let result = h.service.place_wager(&gold, dollars(100)).await.unwrap();
    assert!(result.is_win());
    assert_eq!(result.total_won, dollars(1005));
    assert_eq!(result.cumulative_winnings, dollars(1005));

    let player = h.players.get_player(&gold).await.unwrap();
    assert_eq!(player.cumulative_winnings, result.cumulative_winnings);
    assert_eq!(h.service.pool_balances().get("MEGA"), Some(&Decimal::ZERO));
    assert_eq!(ledger.inner.len(), 1);
    assert_eq!(h.orchestrator.pending_records(), 0);
    h.orchestrator
        .audit_pools(&h.registry.snapshot().await)
        .unwrap();
}

#[tokio::test]
async fn lost_acks_on_every_attempt_complete_on_caller_retry() {
    init_tracing();
    let ledger = Arc::new(LostAckLedger {
        inner: InMemoryLedger::new(),
        // Every configured attempt loses its ack.
        lost_acks: AtomicU32::new(3),
    });
    let h = mega_harness(ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);
    let key = IdempotencyKey::from("lost-acks");

    let err = h
        .service
        .place_wager_with_key(&gold, dollars(100), key.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, JackpotError::LedgerAppendFailure { .. }));
    assert_eq!(ledger.inner.len(), 1);
    assert_eq!(h.orchestrator.pending_records(), 1);

    let result = h
        .service
        .place_wager_with_key(&gold, dollars(100), key)
        .await
        .unwrap();
    assert_eq!(result.total_won, dollars(1005));
    let player = h.players.get_player(&gold).await.unwrap();
    assert_eq!(player.cumulative_winnings, dollars(1005));
    assert_eq!(h.service.pool_balances().get("MEGA"), Some(&Decimal::ZERO));
    assert_eq!(h.orchestrator.pending_records(), 0);
    h.orchestrator
        .audit_pools(&h.registry.snapshot().await)
        .unwrap();
}

#[tokio::test]
async fn file_ledger_answers_retries_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wagers.jsonl");
    let key = IdempotencyKey::from("persisted-1");

    let first = {
        let ledger = Arc::new(FileLedger::open(&path).await.unwrap());
        let h = harness(ledger);
        let gold = add_player(&h.players, "GOLD01", 1);
        h.service
            .place_wager_with_key(&gold, dollars(100), key.clone())
            .await
            .unwrap()
    };

    // Fresh process: new registry, same ledger file.
    let ledger = Arc::new(FileLedger::open(&path).await.unwrap());
    assert_eq!(ledger.len().await, 1);
    let h = harness(ledger.clone());
    let gold = add_player(&h.players, "GOLD01", 1);

    let replayed = h
        .service
        .place_wager_with_key(&gold, dollars(100), key.clone())
        .await
        .unwrap();
    assert_eq!(replayed, first);
    assert_eq!(h.registry.balance("A").await.unwrap(), Decimal::ZERO);

    let stored = ledger.get(&key).await.unwrap().unwrap();
    assert_eq!(stored.result, first);
    assert_eq!(stored.player_id, gold);
}

#[tokio::test]
async fn engine_from_json_config() {
    let json = r#"{
        "pool_timeout_ms": 500,
        "pools": [
            { "name": "mini",  "share": "0.02", "eligible_tiers": ["1", "2", "3"] },
            { "name": "major", "share": "0.03", "eligible_tiers": ["2", "3"],
              "initial_balance": "5000" }
        ]
    }"#;
    let cfg = EngineConfig::from_json_str(json).unwrap();
    let registry = Arc::new(PoolRegistry::from_config(&cfg).unwrap());
    let h = harness_with(
        &cfg,
        registry.clone(),
        registry.clone(),
        Arc::new(InMemoryLedger::new()),
    );

    let player = h
        .players
        .register_with_random_tier(&registry.tiers())
        .unwrap();
    let result = h.service.place_wager(&player.id, dollars(50)).await.unwrap();
    assert_eq!(result.outcome("mini").unwrap().contribution, dollars(1));
    if player.tier == Tier::from(1) {
        assert!(result.outcome("major").is_none());
    } else {
        assert_eq!(
            result.outcome("major").unwrap().new_balance,
            Decimal::new(500_150, 2)
        );
    }
}
