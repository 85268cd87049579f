//! Sync pipeline tests against an in-memory SQLite store.

use proptest::prelude::*;
use roscoe_api::{FlagService, SyncService};
use roscoe_core::{SyncConfig, SyncError};
use roscoe_storage::schema::{LIVE_TABLE, STAGING_TABLE};
use roscoe_test_utils::{
    fixtures, generators, memory_store, CountingExecutor, Fault, FaultyExecutor, StaticSource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type TestResult = Result<(), Box<dyn std::error::Error>>;

// ============================================================================
// FULL PIPELINE
// ============================================================================

#[tokio::test]
async fn sync_writes_batches_and_swaps() -> TestResult {
    let store = memory_store().await?;
    let service = SyncService::new(store.clone(), SyncConfig::default())?;

    let report = service
        .run(&StaticSource::new(fixtures::records(60)), &CancellationToken::new())
        .await?;

    assert!(report.swapped);
    assert_eq!(report.records, 60);
    assert_eq!(report.batches, 3);
    assert_eq!(report.duplicates, 0);

    let live = fixtures::live_user_ids(&*store).await?;
    assert_eq!(live, (1..=60).collect::<Vec<_>>());
    assert!(!fixtures::table_exists(&*store, STAGING_TABLE).await?);
    assert!(!fixtures::table_exists(&*store, "old_flags").await?);
    Ok(())
}

#[tokio::test]
async fn rerun_with_same_source_is_idempotent() -> TestResult {
    let store = memory_store().await?;
    let service = SyncService::new(store.clone(), SyncConfig::default())?;
    let source = StaticSource::new(fixtures::records(60));

    service.run(&source, &CancellationToken::new()).await?;
    service.run(&source, &CancellationToken::new()).await?;

    assert_eq!(fixtures::count_rows(&*store, LIVE_TABLE).await?, 60);
    Ok(())
}

#[tokio::test]
async fn new_generation_replaces_old_one() -> TestResult {
    let store = memory_store().await?;
    let service = SyncService::new(store.clone(), SyncConfig::default())?;

    service
        .run(&StaticSource::new(fixtures::records(10)), &CancellationToken::new())
        .await?;
    service
        .run(
            &StaticSource::new(vec![fixtures::confirmed(100)]),
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(fixtures::live_user_ids(&*store).await?, vec![100]);
    Ok(())
}

#[tokio::test]
async fn duplicate_ids_collapse_to_confirmed() -> TestResult {
    let store = memory_store().await?;
    let service = SyncService::new(store.clone(), SyncConfig::default())?;
    let source = StaticSource::new(vec![
        fixtures::flagged(5),
        fixtures::confirmed(5),
        fixtures::flagged(6),
    ]);

    let report = service.run(&source, &CancellationToken::new()).await?;
    assert_eq!(report.records, 2);
    assert_eq!(report.duplicates, 1);

    let view = FlagService::new(store.clone()).resolve_one(5).await?;
    assert_eq!(view.flag_code(), 2);
    Ok(())
}

// ============================================================================
// LIVE TABLE PROTECTION
// ============================================================================

#[tokio::test]
async fn empty_source_leaves_live_table() -> TestResult {
    let store = memory_store().await?;
    fixtures::insert_live(&*store, &fixtures::flagged(1000)).await?;
    let service = SyncService::new(store.clone(), SyncConfig::default())?;

    let report = service
        .run(&StaticSource::new(Vec::new()), &CancellationToken::new())
        .await?;

    assert!(!report.swapped);
    assert_eq!(report.records, 0);
    assert_eq!(fixtures::live_user_ids(&*store).await?, vec![1000]);
    Ok(())
}

#[tokio::test]
async fn source_failure_leaves_live_table() -> TestResult {
    let store = memory_store().await?;
    fixtures::insert_live(&*store, &fixtures::flagged(1000)).await?;
    let service = SyncService::new(store.clone(), SyncConfig::default())?;

    let result = service
        .run(&StaticSource::failing("connection refused"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SyncError::Source(_))));
    assert_eq!(fixtures::live_user_ids(&*store).await?, vec![1000]);
    Ok(())
}

#[tokio::test]
async fn failed_batch_prevents_swap() -> TestResult {
    let store = memory_store().await?;
    fixtures::insert_live(&*store, &fixtures::flagged(1000)).await?;
    // User 30 lands in the second batch of 25.
    let faulty = Arc::new(FaultyExecutor::new(store.clone(), Fault::StagingRow(30)));
    let service = SyncService::new(faulty.clone(), SyncConfig::default())?;

    let result = service
        .run(&StaticSource::new(fixtures::records(60)), &CancellationToken::new())
        .await;

    match result {
        Err(SyncError::Batch { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected batch failure, got {:?}", other),
    }
    assert_eq!(faulty.failures(), 1);
    assert_eq!(fixtures::live_user_ids(&*store).await?, vec![1000]);
    Ok(())
}

#[tokio::test]
async fn failed_swap_is_reported() -> TestResult {
    let store = memory_store().await?;
    fixtures::insert_live(&*store, &fixtures::flagged(1000)).await?;
    let faulty = Arc::new(FaultyExecutor::new(
        store.clone(),
        Fault::Statement("RENAME TO old_flags"),
    ));
    let service = SyncService::new(faulty, SyncConfig::default())?;

    let result = service
        .run(&StaticSource::new(fixtures::records(5)), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SyncError::Swap(_))));
    assert_eq!(fixtures::live_user_ids(&*store).await?, vec![1000]);
    Ok(())
}

// ============================================================================
// WORKER POOL
// ============================================================================

#[tokio::test]
async fn worker_pool_stays_within_limit() -> TestResult {
    let store = memory_store().await?;
    let counting = Arc::new(CountingExecutor::new(store.clone(), Duration::from_millis(20)));
    let service = SyncService::new(counting.clone(), SyncConfig::default())?;

    let report = service
        .run(&StaticSource::new(fixtures::records(500)), &CancellationToken::new())
        .await?;

    assert_eq!(report.batches, 20);
    assert_eq!(counting.staging_calls(), 20);
    assert!(counting.max_in_flight() <= 5);
    assert!(counting.max_in_flight() >= 2);
    assert_eq!(fixtures::count_rows(&*store, LIVE_TABLE).await?, 500);
    Ok(())
}

#[tokio::test]
async fn batches_split_into_statements() -> TestResult {
    let store = memory_store().await?;
    let counting = Arc::new(CountingExecutor::new(store.clone(), Duration::ZERO));
    let config = SyncConfig {
        batch_size: 10,
        max_concurrent: 2,
        rows_per_statement: 4,
    };
    let service = SyncService::new(counting.clone(), config)?;

    let report = service
        .run(&StaticSource::new(fixtures::records(25)), &CancellationToken::new())
        .await?;

    // Batches of 10, 10, 5 written as 4+4+2, 4+4+2, 4+1.
    assert_eq!(report.batches, 3);
    assert_eq!(counting.staging_calls(), 8);
    assert!(counting.max_in_flight() <= 2);
    assert_eq!(fixtures::count_rows(&*store, LIVE_TABLE).await?, 25);
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_sync_without_swap() -> TestResult {
    let store = memory_store().await?;
    fixtures::insert_live(&*store, &fixtures::flagged(1000)).await?;
    let slow = Arc::new(CountingExecutor::new(store.clone(), Duration::from_secs(10)));
    let service = SyncService::new(slow, SyncConfig::default())?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        service.run(&StaticSource::new(fixtures::records(100)), &cancel),
    )
    .await?;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(fixtures::live_user_ids(&*store).await?, vec![1000]);
    Ok(())
}

#[tokio::test]
async fn cancelled_token_refuses_to_start() -> TestResult {
    let store = memory_store().await?;
    let service = SyncService::new(store.clone(), SyncConfig::default())?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = service
        .run(&StaticSource::new(fixtures::records(3)), &cancel)
        .await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(fixtures::count_rows(&*store, LIVE_TABLE).await?, 0);
    Ok(())
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// After a successful run the live table holds exactly the source ids.
    #[test]
    fn prop_sync_yields_exact_input(records in generators::arb_unique_records(120)) {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))?;

        let (expected, live, swapped) = rt
            .block_on(async {
                let store = memory_store().await?;
                let service = SyncService::new(store.clone(), SyncConfig::default())
                    .map_err(|e| e.to_string())?;
                let mut expected: Vec<u64> = records.iter().map(|r| r.user_id).collect();
                expected.sort_unstable();

                let report = service
                    .run(&StaticSource::new(records.clone()), &CancellationToken::new())
                    .await
                    .map_err(|e| e.to_string())?;
                let live = fixtures::live_user_ids(&*store).await?;
                Ok::<_, Box<dyn std::error::Error>>((expected, live, report.swapped))
            })
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(swapped, !expected.is_empty());
        prop_assert_eq!(live, expected);
    }
}
