//! Consistency properties of the read strategies
//!
//! Timed tests run on a paused clock so the interleavings are reproducible;
//! see `tornread_test_utils::interleaving_store` for the schedule.

use proptest::prelude::*;
use tornread_core::{
    check, run_reads, run_writes, ErrorKind, IsolationLevel, ReadStrategy, StorageGateway,
};
use tornread_memstore::MemoryStore;
use tornread_test_utils::{interleaving_store, jittered_store, quick_config, runner, PAIR};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[tokio::test]
async fn python_scenario_update_then_read() {
    let store = MemoryStore::new();
    store.reset_pair("Python", 999).await.unwrap();
    store.update_pair("Python", 5).await.unwrap();

    for strategy in ReadStrategy::ALL {
        let view = strategy
            .read(&store, "Python", IsolationLevel::RepeatableRead)
            .await
            .unwrap();
        assert_eq!(view.head.value, 5, "{strategy}");
        assert_eq!(view.segment_value(), Some(5), "{strategy}");
        assert!(check(&view, 0).is_ok(), "{strategy}");
    }
}

proptest! {
    #[test]
    fn prop_committed_update_is_read_back_by_every_strategy(value in any::<i64>()) {
        let views = block_on(async {
            let store = MemoryStore::new();
            store.reset_pair(PAIR, 999).await.unwrap();
            store.update_pair(PAIR, value).await.unwrap();

            let mut views = Vec::new();
            for strategy in ReadStrategy::ALL {
                views.push(
                    strategy
                        .read(&store, PAIR, IsolationLevel::ReadCommitted)
                        .await
                        .unwrap(),
                );
            }
            views
        });

        for view in views {
            prop_assert_eq!(view.head.value, value);
            prop_assert_eq!(view.segment_value(), Some(value));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn raw_scenario_over_100_iterations_succeeds() {
    let store = interleaving_store();
    let runner = runner(&store, quick_config(100));

    let report = runner.run_scenario(ReadStrategy::Raw).await;

    assert!(report.passed(), "{}", report.line());
    assert_eq!(report.reader.completed, 100);
    assert_eq!(report.writer.completed, 100);
    assert_eq!(store.peek(PAIR).map(|v| v.head.value), Some(99));
    assert_eq!(store.peek(PAIR).and_then(|v| v.segment_value()), Some(99));
}

#[tokio::test(start_paused = true)]
async fn raw_strategy_never_tears_under_jitter() {
    for (seed, run_for) in [(1, 1), (7, 25), (42, 100), (1234, 300)] {
        let store = jittered_store(seed);
        let report = runner(&store, quick_config(run_for))
            .run_scenario(ReadStrategy::Raw)
            .await;
        assert!(report.passed(), "seed {seed}: {}", report.line());
    }
}

#[tokio::test(start_paused = true)]
async fn declared_and_interactive_transactions_agree() {
    for isolation in [
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable,
    ] {
        let mut outcomes = Vec::new();
        for strategy in [
            ReadStrategy::NestedWithTransaction,
            ReadStrategy::NestedWithInteractiveTransaction,
        ] {
            let store = interleaving_store();
            let config = quick_config(40).with_isolation(isolation);
            let report = runner(&store, config).run_scenario(strategy).await;
            outcomes.push((report.outcome, report.anomaly));
        }
        assert_eq!(outcomes[0], outcomes[1], "{isolation}");
    }
}

#[tokio::test(start_paused = true)]
async fn independent_tears_without_snapshot_isolation() {
    let store = interleaving_store();
    let config = quick_config(40).with_isolation(IsolationLevel::ReadCommitted);

    let report = runner(&store, config)
        .run_scenario(ReadStrategy::Independent)
        .await;

    let anomaly = report.anomaly.expect("torn read under read-committed");
    assert_eq!(anomaly.iteration, 0);
    assert_eq!(anomaly.expected_head_value, 999);
    assert_eq!(anomaly.observed_segment_value, Some(0));
}

#[tokio::test(start_paused = true)]
async fn independent_is_clean_under_repeatable_read() {
    let store = interleaving_store();
    let report = runner(&store, quick_config(40))
        .run_scenario(ReadStrategy::Independent)
        .await;
    assert!(report.passed(), "{}", report.line());

    for seed in [3, 17, 2024] {
        let store = jittered_store(seed);
        let report = runner(&store, quick_config(60))
            .run_scenario(ReadStrategy::Independent)
            .await;
        assert!(report.passed(), "seed {seed}: {}", report.line());
    }
}

#[tokio::test(start_paused = true)]
async fn reader_stops_after_first_anomaly() {
    let store = interleaving_store();
    store.reset_pair(PAIR, 999).await.unwrap();

    let (writes, reads) = tokio::join!(
        run_writes(&store, PAIR, 30),
        run_reads(
            &store,
            PAIR,
            30,
            ReadStrategy::Nested,
            IsolationLevel::RepeatableRead
        ),
    );

    let failure = reads.unwrap_err();
    assert_eq!(failure.error.kind(), ErrorKind::Anomaly);
    assert_eq!(failure.iteration, 0);
    assert_eq!(failure.attempted(), 1);
    // The writer is not cancelled by the reader's failure.
    assert_eq!(writes, Ok(30));
}

#[tokio::test]
async fn reads_before_reset_are_not_found() {
    let store = MemoryStore::new();

    for strategy in ReadStrategy::ALL {
        let err = strategy
            .read(&store, PAIR, IsolationLevel::RepeatableRead)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{strategy}");
    }
}

#[tokio::test]
async fn unsupported_isolation_fails_transactional_strategies_only() {
    let store = MemoryStore::new();
    store.reset_pair(PAIR, 1).await.unwrap();

    for strategy in ReadStrategy::ALL {
        let result = strategy.read(&store, PAIR, IsolationLevel::Snapshot).await;
        if strategy.is_transactional() {
            assert_eq!(
                result.unwrap_err().kind(),
                ErrorKind::Transaction,
                "{strategy}"
            );
        } else {
            assert!(result.is_ok(), "{strategy}");
        }
    }
}
