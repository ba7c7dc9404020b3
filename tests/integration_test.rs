//! Integration Tests - End-to-end Swap Engine Flows
//!
//! Exercises the swap executor and query service over the in-memory
//! store, plus mocked-store tests for the optimistic-lock retry loop.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;

use chrono::Utc;
use mockall::mock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use predata_amm::adapters::persistence::InMemoryStore;
use predata_amm::config::EngineConfig;
use predata_amm::domain::error::AmmError;
use predata_amm::domain::pool::{MarketPool, PoolStatus, QuestionId};
use predata_amm::domain::shares::UserShares;
use predata_amm::domain::swap::{
    MemberId, Outcome, SwapAction, SwapRecord, SwapRequest,
};
use predata_amm::ports::store::{
    CommitOutcome, MarketStore, Page, PageRequest, SortOrder,
};
use predata_amm::usecases::market_queries::MarketQueries;
use predata_amm::usecases::swap_executor::SwapExecutor;

const QUESTION: QuestionId = 7;
const ALICE: MemberId = 1;
const BOB: MemberId = 2;

fn engine_config() -> EngineConfig {
    EngineConfig {
        min_trade_amount: dec!(1),
        max_swap_attempts: 8,
        retry_base_delay_ms: 1,
    }
}

/// Store + executor over a pool seeded with 1000 USDC at a 1% fee.
async fn seeded_engine() -> (Arc<InMemoryStore>, SwapExecutor<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let executor = SwapExecutor::new(Arc::clone(&store), &engine_config());
    executor
        .seed_pool(QUESTION, dec!(1000), dec!(0.01))
        .await
        .unwrap();
    (store, executor)
}

// ---- Seeding and lifecycle ----

#[tokio::test]
async fn test_seed_initializes_even_pool() {
    let (store, _executor) = seeded_engine().await;

    let pool = store.load_pool(QUESTION).await.unwrap().unwrap();
    assert_eq!(pool.yes_shares, dec!(1000));
    assert_eq!(pool.no_shares, dec!(1000));
    assert_eq!(pool.k, dec!(1000000));
    assert_eq!(pool.collateral_locked, dec!(1000));
    assert_eq!(pool.status, PoolStatus::Active);
    assert_eq!(pool.version, 0);
}

#[tokio::test]
async fn test_seed_twice_rejected() {
    let (_store, executor) = seeded_engine().await;

    let err = executor
        .seed_pool(QUESTION, dec!(500), dec!(0.02))
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::AlreadySeeded { question_id: QUESTION }));
}

#[tokio::test]
async fn test_swap_on_unseeded_question_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let executor = SwapExecutor::new(Arc::clone(&store), &engine_config());

    let err = executor
        .swap(ALICE, &SwapRequest::buy(99, Outcome::Yes, dec!(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::PoolNotFound { question_id: 99 }));
}

#[tokio::test]
async fn test_pause_resume_close_gate_swaps() {
    let (_store, executor) = seeded_engine().await;
    let buy = SwapRequest::buy(QUESTION, Outcome::Yes, dec!(10));

    executor.pause_pool(QUESTION).await.unwrap();
    let err = executor.swap(ALICE, &buy).await.unwrap_err();
    assert!(matches!(
        err,
        AmmError::PoolNotActive {
            status: PoolStatus::Paused,
            ..
        }
    ));

    executor.resume_pool(QUESTION).await.unwrap();
    assert!(executor.swap(ALICE, &buy).await.is_ok());

    let closed = executor.close_pool(QUESTION).await.unwrap();
    assert_eq!(closed.status, PoolStatus::Closed);
    let err = executor.swap(ALICE, &buy).await.unwrap_err();
    assert!(matches!(
        err,
        AmmError::PoolNotActive {
            status: PoolStatus::Closed,
            ..
        }
    ));

    // Closed is terminal.
    let err = executor.resume_pool(QUESTION).await.unwrap_err();
    assert!(matches!(err, AmmError::PoolNotActive { .. }));
}

// ---- BUY path ----

#[tokio::test]
async fn test_buy_yes_scenario() {
    let (store, executor) = seeded_engine().await;

    let result = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap();

    // fee off the top, net 99 swapped against k = 1,000,000
    assert_eq!(result.fee_usdc, dec!(1));
    assert_eq!(result.usdc_amount, dec!(100));
    assert!(result.shares_amount > dec!(189) && result.shares_amount < dec!(190));
    assert_eq!(result.price_before.yes, dec!(0.5));
    assert!(result.price_after.yes > dec!(0.5));

    let pool = store.load_pool(QUESTION).await.unwrap().unwrap();
    assert_eq!(pool.no_shares, dec!(1099));
    assert!(pool.yes_shares < dec!(1000));
    assert_eq!(pool.collateral_locked, dec!(1099));
    assert_eq!(pool.total_volume_usdc, dec!(100));
    assert_eq!(pool.total_fees_usdc, dec!(1));
    assert_eq!(pool.version, 1);
    assert!(pool.k >= dec!(1000000));

    // The caller's ledger reflects the purchase at gross cost.
    assert_eq!(result.caller_shares.yes_shares, result.shares_amount);
    assert_eq!(result.caller_shares.yes_cost_basis, dec!(100));
    assert_eq!(result.caller_shares.no_shares, Decimal::ZERO);
}

#[tokio::test]
async fn test_buy_amount_validation() {
    let (_store, executor) = seeded_engine().await;

    let err = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::InvalidAmount { .. }));

    // Below the configured minimum of 1 USDC.
    let err = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(0.5)))
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::InvalidAmount { .. }));

    // A BUY without usdc_in is malformed.
    let malformed = SwapRequest {
        usdc_in: None,
        ..SwapRequest::buy(QUESTION, Outcome::Yes, dec!(10))
    };
    let err = executor.swap(ALICE, &malformed).await.unwrap_err();
    assert!(matches!(err, AmmError::InvalidAmount { .. }));
}

#[tokio::test]
async fn test_buy_slippage_bound_leaves_pool_unchanged() {
    let (store, executor) = seeded_engine().await;
    let before = store.load_pool(QUESTION).await.unwrap().unwrap();

    // True output is ~189.08 shares; demand more.
    let err = executor
        .swap(
            ALICE,
            &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100))
                .with_min_shares_out(dec!(200)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::SlippageExceeded { .. }));

    let after = store.load_pool(QUESTION).await.unwrap().unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(after.yes_shares, before.yes_shares);
    assert_eq!(after.no_shares, before.no_shares);
    assert_eq!(after.total_volume_usdc, before.total_volume_usdc);

    let page = store
        .swaps_by_question(QUESTION, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

// ---- SELL path ----

#[tokio::test]
async fn test_sell_returns_less_than_paid() {
    let (store, executor) = seeded_engine().await;

    let buy = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap();

    let sell = executor
        .swap(
            ALICE,
            &SwapRequest::sell(QUESTION, Outcome::Yes, buy.shares_amount),
        )
        .await
        .unwrap();

    // Fees make the round trip strictly lossy.
    assert!(sell.usdc_amount < dec!(100));
    assert!(sell.fee_usdc > Decimal::ZERO);
    assert_eq!(sell.shares_amount, buy.shares_amount);

    // Holdings are emptied, basis released.
    assert_eq!(sell.caller_shares.yes_shares, Decimal::ZERO);
    assert_eq!(sell.caller_shares.yes_cost_basis, Decimal::ZERO);

    let pool = store.load_pool(QUESTION).await.unwrap().unwrap();
    assert_eq!(pool.version, 2);
    assert!(pool.k >= dec!(1000000));
    assert!(pool.collateral_locked > dec!(1000));
}

#[tokio::test]
async fn test_sell_partial_releases_proportional_basis() {
    let (_store, executor) = seeded_engine().await;

    let buy = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::No, dec!(80)))
        .await
        .unwrap();

    let half = buy.shares_amount / Decimal::TWO;
    let sell = executor
        .swap(ALICE, &SwapRequest::sell(QUESTION, Outcome::No, half))
        .await
        .unwrap();

    assert_eq!(sell.caller_shares.no_shares, buy.shares_amount - half);
    // Half the holding releases half the 80 USDC basis (within rounding).
    let remaining = sell.caller_shares.no_cost_basis;
    assert!((remaining - dec!(40)).abs() < dec!(0.0001));
}

#[tokio::test]
async fn test_sell_without_holdings_rejected() {
    let (_store, executor) = seeded_engine().await;

    let err = executor
        .swap(BOB, &SwapRequest::sell(QUESTION, Outcome::Yes, dec!(10)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AmmError::InsufficientShares { held, .. } if held == Decimal::ZERO
    ));
}

#[tokio::test]
async fn test_sell_more_than_held_rejected() {
    let (store, executor) = seeded_engine().await;

    let buy = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(50)))
        .await
        .unwrap();

    let err = executor
        .swap(
            ALICE,
            &SwapRequest::sell(QUESTION, Outcome::Yes, buy.shares_amount + dec!(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::InsufficientShares { .. }));

    // Nothing was persisted for the failed attempt.
    let pool = store.load_pool(QUESTION).await.unwrap().unwrap();
    assert_eq!(pool.version, 1);
}

#[tokio::test]
async fn test_sell_slippage_bound() {
    let (_store, executor) = seeded_engine().await;

    let buy = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap();

    let err = executor
        .swap(
            ALICE,
            &SwapRequest::sell(QUESTION, Outcome::Yes, buy.shares_amount)
                .with_min_usdc_out(dec!(100)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AmmError::SlippageExceeded { .. }));
}

// ---- Simulation ----

#[tokio::test]
async fn test_simulate_matches_swap_exactly() {
    let (_store, executor) = seeded_engine().await;

    let preview = executor
        .simulate(QUESTION, SwapAction::Buy, Outcome::Yes, dec!(100))
        .await
        .unwrap();

    let result = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap();

    assert_eq!(preview.shares_out, Some(result.shares_amount));
    assert_eq!(preview.fee_usdc, result.fee_usdc);
    assert_eq!(preview.effective_price, result.effective_price);
    assert_eq!(preview.price_after, result.price_after);
    assert!(preview.slippage > Decimal::ZERO);
    assert_eq!(preview.min_received, result.shares_amount);
}

#[tokio::test]
async fn test_simulate_persists_nothing() {
    let (store, executor) = seeded_engine().await;

    executor
        .simulate(QUESTION, SwapAction::Buy, Outcome::No, dec!(250))
        .await
        .unwrap();

    let pool = store.load_pool(QUESTION).await.unwrap().unwrap();
    assert_eq!(pool.version, 0);
    assert_eq!(pool.yes_shares, dec!(1000));
}

// ---- Queries ----

#[tokio::test]
async fn test_pool_state_view() {
    let (store, executor) = seeded_engine().await;
    let queries = MarketQueries::new(Arc::clone(&store));

    executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap();

    let view = queries.pool_state(QUESTION).await.unwrap();
    assert_eq!(view.question_id, QUESTION);
    assert_eq!(view.version, 1);
    assert_eq!(view.total_volume_usdc, dec!(100));
    assert!(view.current_price.yes > dec!(0.5));
    assert_eq!(view.current_price.yes + view.current_price.no, Decimal::ONE);

    let err = queries.pool_state(99).await.unwrap_err();
    assert!(matches!(err, AmmError::PoolNotFound { .. }));
}

#[tokio::test]
async fn test_price_history_replays_swaps() {
    let (store, executor) = seeded_engine().await;
    let queries = MarketQueries::new(Arc::clone(&store));

    executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap();
    executor
        .swap(BOB, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(50)))
        .await
        .unwrap();

    let history = queries.price_history(QUESTION, 100).await.unwrap();
    assert_eq!(history.len(), 3);

    // Synthetic 50/50 point at seeding, then rising YES prices.
    assert_eq!(history[0].yes_price, dec!(0.50));
    assert_eq!(history[0].no_price, dec!(0.50));
    assert!(history[1].yes_price > dec!(0.5));
    assert!(history[2].yes_price > history[1].yes_price);
    for point in &history {
        assert_eq!(point.yes_price + point.no_price, Decimal::ONE);
    }
    assert!(history[0].timestamp <= history[1].timestamp);
    assert!(history[1].timestamp <= history[2].timestamp);

    // Unseeded question charts as empty rather than erroring.
    assert!(queries.price_history(99, 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_swap_history_pagination() {
    let (store, executor) = seeded_engine().await;
    let queries = MarketQueries::new(Arc::clone(&store));

    for amount in [dec!(10), dec!(20), dec!(30)] {
        executor
            .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, amount))
            .await
            .unwrap();
    }

    let desc = queries
        .swap_history_by_question(
            QUESTION,
            PageRequest::new(0, 2, SortOrder::Descending),
        )
        .await
        .unwrap();
    assert_eq!(desc.total, 3);
    assert_eq!(desc.items.len(), 2);
    // Newest first: the 30 USDC buy leads.
    assert_eq!(desc.items[0].usdc_in, dec!(30));

    let asc = queries
        .swap_history_by_question(
            QUESTION,
            PageRequest::new(0, 10, SortOrder::Ascending),
        )
        .await
        .unwrap();
    assert_eq!(asc.items.len(), 3);
    assert_eq!(asc.items[0].usdc_in, dec!(10));

    let offset = queries
        .swap_history_by_question(
            QUESTION,
            PageRequest::new(2, 2, SortOrder::Ascending),
        )
        .await
        .unwrap();
    assert_eq!(offset.items.len(), 1);
    assert_eq!(offset.items[0].usdc_in, dec!(30));

    let by_member = queries
        .swap_history_by_member(ALICE, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_member.total, 3);
    assert!(queries
        .swap_history_by_member(BOB, PageRequest::default())
        .await
        .unwrap()
        .items
        .is_empty());
}

#[tokio::test]
async fn test_user_shares_snapshot_covers_both_outcomes() {
    let (store, executor) = seeded_engine().await;
    let queries = MarketQueries::new(Arc::clone(&store));

    executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(60)))
        .await
        .unwrap();
    executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::No, dec!(40)))
        .await
        .unwrap();

    let snap = queries.user_shares(ALICE, QUESTION).await.unwrap();
    assert!(snap.yes_shares > Decimal::ZERO);
    assert!(snap.no_shares > Decimal::ZERO);
    assert_eq!(snap.yes_cost_basis, dec!(60));
    assert_eq!(snap.no_cost_basis, dec!(40));

    let empty = queries.user_shares(BOB, QUESTION).await.unwrap();
    assert_eq!(empty.yes_shares, Decimal::ZERO);
    assert_eq!(empty.no_cost_basis, Decimal::ZERO);
}

#[tokio::test]
async fn test_accumulators_are_monotonic() {
    let (store, executor) = seeded_engine().await;

    let mut last_volume = Decimal::ZERO;
    let mut last_fees = Decimal::ZERO;

    let buy = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap();

    for request in [
        SwapRequest::buy(QUESTION, Outcome::No, dec!(25)),
        SwapRequest::sell(QUESTION, Outcome::Yes, buy.shares_amount / Decimal::TWO),
        SwapRequest::buy(QUESTION, Outcome::Yes, dec!(5)),
    ] {
        executor.swap(ALICE, &request).await.unwrap();
        let pool = store.load_pool(QUESTION).await.unwrap().unwrap();
        assert!(pool.total_volume_usdc > last_volume);
        assert!(pool.total_fees_usdc > last_fees);
        last_volume = pool.total_volume_usdc;
        last_fees = pool.total_fees_usdc;
    }
}

// ---- Mocked store: retry behaviour ----

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl MarketStore for Store {
        async fn insert_pool(&self, pool: &MarketPool) -> Result<(), AmmError>;
        async fn load_pool(
            &self,
            question_id: QuestionId,
        ) -> Result<Option<MarketPool>, AmmError>;
        async fn update_pool(
            &self,
            expected_version: u64,
            pool: &MarketPool,
        ) -> Result<CommitOutcome, AmmError>;
        async fn commit_swap(
            &self,
            expected_version: u64,
            pool: &MarketPool,
            record: &SwapRecord,
            shares: &UserShares,
        ) -> Result<CommitOutcome, AmmError>;
        async fn load_shares(
            &self,
            member_id: MemberId,
            question_id: QuestionId,
            outcome: Outcome,
        ) -> Result<Option<UserShares>, AmmError>;
        async fn shares_for_question(
            &self,
            member_id: MemberId,
            question_id: QuestionId,
        ) -> Result<Vec<UserShares>, AmmError>;
        async fn swaps_by_question(
            &self,
            question_id: QuestionId,
            page: PageRequest,
        ) -> Result<Page<SwapRecord>, AmmError>;
        async fn swaps_by_member(
            &self,
            member_id: MemberId,
            page: PageRequest,
        ) -> Result<Page<SwapRecord>, AmmError>;
        async fn is_healthy(&self) -> bool;
    }
}

fn mock_pool() -> MarketPool {
    MarketPool::seed(QUESTION, dec!(1000), dec!(0.01), Utc::now()).unwrap()
}

#[tokio::test]
async fn test_swap_retries_after_single_conflict() {
    let mut store = MockStore::new();

    store
        .expect_load_pool()
        .times(2)
        .returning(|_| Ok(Some(mock_pool())));
    store
        .expect_load_shares()
        .times(2)
        .returning(|_, _, _| Ok(None));
    // First commit loses the version race, the retry wins.
    store
        .expect_commit_swap()
        .times(1)
        .returning(|_, _, _, _| Ok(CommitOutcome::VersionConflict));
    store
        .expect_commit_swap()
        .times(1)
        .returning(|_, _, _, _| Ok(CommitOutcome::Committed));
    store
        .expect_shares_for_question()
        .times(1)
        .returning(|_, _| Ok(Vec::new()));

    let executor = SwapExecutor::new(Arc::new(store), &engine_config());
    let result = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap();
    assert_eq!(result.fee_usdc, dec!(1));
}

#[tokio::test]
async fn test_persistent_conflicts_exhaust_attempt_budget() {
    let mut store = MockStore::new();

    store
        .expect_load_pool()
        .times(3)
        .returning(|_| Ok(Some(mock_pool())));
    store
        .expect_load_shares()
        .times(3)
        .returning(|_, _, _| Ok(None));
    store
        .expect_commit_swap()
        .times(3)
        .returning(|_, _, _, _| Ok(CommitOutcome::VersionConflict));

    let config = EngineConfig {
        min_trade_amount: dec!(1),
        max_swap_attempts: 3,
        retry_base_delay_ms: 1,
    };
    let executor = SwapExecutor::new(Arc::new(store), &config);
    let err = executor
        .swap(ALICE, &SwapRequest::buy(QUESTION, Outcome::Yes, dec!(100)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AmmError::ConcurrentModification { attempts: 3, .. }
    ));
}
