//! State transitions, persistence, caching and flush policies.

use super::*;
use crate::config::FlushPolicy;
use crate::manager::Initialized;
use crate::persistence;
use crate::types::{LifecycleState, MetadataValue, OutcomeStatus, SearchStrategy};
use std::collections::BTreeMap;
use tempfile::TempDir;

#[tokio::test]
async fn test_initialize_without_inputs_fails() {
    let temp = TempDir::new().unwrap();
    let manager = manager(temp.path());

    let err = manager.initialize(None).await.unwrap_err();
    assert!(matches!(err, IndexError::Configuration(_)));

    let err = manager.initialize(Some(Vec::new())).await.unwrap_err();
    assert!(matches!(err, IndexError::Configuration(_)));
    assert_eq!(manager.state(), LifecycleState::Uninitialized);
}

#[tokio::test]
async fn test_search_before_initialize_fails() {
    let temp = TempDir::new().unwrap();
    let manager = manager(temp.path());

    let err = manager.search(&embed("robots").await, 3).unwrap_err();
    assert!(matches!(err, IndexError::Configuration(_)));
}

#[tokio::test]
async fn test_initialize_builds_then_loads() {
    let temp = TempDir::new().unwrap();

    let first = manager(temp.path());
    let outcome = first.initialize(Some(corpus("m", 12))).await.unwrap();
    assert!(matches!(outcome, Initialized::Built(ref report) if report.indexed() == 12));
    assert_eq!(first.state(), LifecycleState::Loaded);
    assert!(first.pending_updates().is_empty());
    assert!(first.has_snapshot());

    let second = manager(temp.path());
    let outcome = second.initialize(None).await.unwrap();
    assert_eq!(outcome, Initialized::Loaded { documents: 12 });
    assert_eq!(second.state(), LifecycleState::Loaded);
    assert_eq!(second.get("m3").unwrap(), first.get("m3").unwrap());
}

#[tokio::test]
async fn test_round_trip_exact_and_approximate() {
    let temp = TempDir::new().unwrap();
    let original = manager(temp.path());
    original.build(corpus("m", 40)).await.unwrap();
    original.optimize().await.unwrap();
    original.persist().await.unwrap();

    let restored = manager(temp.path());
    restored.load().await.unwrap();

    let queries = probe_queries().await;
    for approximate in [false, true] {
        original.select_strategy(approximate).await;
        restored.select_strategy(approximate).await;
        for query in &queries {
            for k in [1, 3, 10, 100] {
                assert_eq!(
                    original.search(query, k).unwrap(),
                    restored.search(query, k).unwrap(),
                    "approximate={} k={}",
                    approximate,
                    k
                );
            }
        }
    }

    let stats = restored.stats();
    assert!(stats.trained);
    assert_eq!(stats.clusters, original.stats().clusters);
    assert_eq!(stats.vectors, 40);
}

#[tokio::test]
async fn test_load_failure_leaves_uninitialized() {
    let temp = TempDir::new().unwrap();
    manager(temp.path()).build(corpus("m", 5)).await.unwrap();

    let index_path = persistence::index_path(&temp.path().join("store"));
    let raw = std::fs::read(&index_path).unwrap();
    std::fs::write(&index_path, &raw[..raw.len() - 3]).unwrap();

    let fresh = manager(temp.path());
    let err = fresh.load().await.unwrap_err();
    assert!(matches!(err, IndexError::Persistence(_)));
    assert_eq!(fresh.state(), LifecycleState::Uninitialized);
    assert!(fresh.get("m0").is_err());
}

#[tokio::test]
async fn test_load_rejects_dimension_mismatch() {
    let temp = TempDir::new().unwrap();
    manager(temp.path()).build(corpus("m", 5)).await.unwrap();

    let config = IndexConfig {
        dimension: DIM * 2,
        ..test_config(temp.path())
    };
    let wider = manager_with(config);
    assert!(matches!(
        wider.load().await,
        Err(IndexError::Persistence(_))
    ));
}

#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let config = IndexConfig {
        flush_policy: FlushPolicy::Explicit,
        ..test_config(temp.path())
    };
    let manager = manager_with(config);
    manager.build(corpus("m", 8)).await.unwrap();
    manager
        .update(vec![doc("new", "a boxing story in the rain")])
        .await
        .unwrap();
    manager.search(&embed("boxing").await, 2).unwrap();
    assert_eq!(manager.state(), LifecycleState::Dirty);

    manager.cleanup().await.unwrap();
    let after_first = manager.stats();
    let bytes_first = std::fs::read(persistence::index_path(&temp.path().join("store"))).unwrap();

    manager.cleanup().await.unwrap();
    let after_second = manager.stats();
    let bytes_second = std::fs::read(persistence::index_path(&temp.path().join("store"))).unwrap();

    assert_eq!(after_first.state, "loaded");
    assert_eq!(after_second.state, "loaded");
    assert_eq!(after_first.pending_updates, 0);
    assert_eq!(after_second.cache_entries, 0);
    assert_eq!(after_first.last_persisted, after_second.last_persisted);
    assert_eq!(bytes_first, bytes_second);
}

#[tokio::test]
async fn test_cache_is_transparent() {
    let cached_dir = TempDir::new().unwrap();
    let uncached_dir = TempDir::new().unwrap();

    let cached = manager(cached_dir.path());
    let uncached = manager_with(IndexConfig {
        cache_size: 0,
        ..test_config(uncached_dir.path())
    });

    for m in [&cached, &uncached] {
        m.build(corpus("m", 30)).await.unwrap();
    }

    let queries = probe_queries().await;
    let ks = [5, 2, 5, 50, 1, 50, 3];

    for round in 0..3 {
        for (i, query) in queries.iter().enumerate() {
            let k = ks[(i + round) % ks.len()];
            assert_eq!(cached.search(query, k).unwrap(), uncached.search(query, k).unwrap());
        }
        if round == 1 {
            for m in [&cached, &uncached] {
                m.update(corpus("extra", 6)).await.unwrap();
                m.select_strategy(true).await;
            }
        }
    }

    assert!(cached.stats().cache_hits > 0);
    assert_eq!(uncached.stats().cache_hits, 0);
}

#[tokio::test]
async fn test_strategy_switch_and_optimize_invalidate_cache() {
    let temp = TempDir::new().unwrap();
    let manager = manager(temp.path());
    manager.build(corpus("m", 30)).await.unwrap();

    let query = embed("pirates").await;
    let exact = manager.search(&query, 5).unwrap();
    assert_eq!(manager.stats().cache_entries, 1);

    manager.select_strategy(true).await;
    assert_eq!(manager.stats().cache_entries, 0);
    assert_eq!(manager.strategy(), SearchStrategy::Approximate);

    // Untrained approximate search scans everything.
    assert_eq!(manager.search(&query, 5).unwrap(), exact);

    let misses = manager.stats().cache_misses;
    manager.optimize().await.unwrap();
    assert_eq!(manager.stats().cache_entries, 0);

    manager.search(&query, 5).unwrap();
    assert_eq!(manager.stats().cache_misses, misses + 1);
}

#[tokio::test]
async fn test_dimension_guard_on_search() {
    let temp = TempDir::new().unwrap();
    let manager = manager(temp.path());
    manager.build(corpus("m", 10)).await.unwrap();
    let before = manager.stats();

    let err = manager.search(&[1.0; DIM - 1], 3).unwrap_err();
    assert!(matches!(
        err,
        IndexError::DimensionMismatch {
            expected: DIM,
            actual
        } if actual == DIM - 1
    ));

    let after = manager.stats();
    assert_eq!(after.vectors, before.vectors);
    assert_eq!(after.cache_entries, before.cache_entries);
    assert_eq!(after.state, before.state);
}

#[tokio::test]
async fn test_wrong_length_embedding_is_rejected_per_document() {
    let temp = TempDir::new().unwrap();
    let manager =
        IndexManager::with_provider(test_config(temp.path()), Arc::new(ShortVectorProvider::new()))
            .unwrap();
    manager.build(corpus("m", 4)).await.unwrap();

    let report = manager
        .update(vec![
            doc("ok", "volcano rescue"),
            doc("bad", "SHORT vector please"),
        ])
        .await
        .unwrap();

    assert_eq!(report.indexed(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(manager.stats().vectors, 5);
    assert!(matches!(manager.get("bad"), Err(IndexError::NotFound(_))));
}

#[tokio::test]
async fn test_batch_size_does_not_change_results() {
    let small_dir = TempDir::new().unwrap();
    let large_dir = TempDir::new().unwrap();

    let small = manager_with(IndexConfig {
        build_batch_size: 1,
        ..test_config(small_dir.path())
    });
    let large = manager_with(IndexConfig {
        build_batch_size: 1000,
        ..test_config(large_dir.path())
    });

    let mut docs = corpus("m", 25);
    // Duplicate id: the later copy wins regardless of batching.
    docs.push(doc("m3", "a volcano erupts over the orchestra"));
    small.build(docs.clone()).await.unwrap();
    large.build(docs).await.unwrap();

    for query in probe_queries().await {
        for k in [1, 4, 26] {
            assert_eq!(small.search(&query, k).unwrap(), large.search(&query, k).unwrap());
        }
    }
    assert_eq!(small.get("m3").unwrap().text, "a volcano erupts over the orchestra");

    let small_update = small
        .update_with_batch_size(corpus("u", 9), 1)
        .await
        .unwrap();
    let large_update = large
        .update_with_batch_size(corpus("u", 9), 100)
        .await
        .unwrap();
    assert_eq!(small_update.outcomes, large_update.outcomes);

    for query in probe_queries().await {
        assert_eq!(small.search(&query, 10).unwrap(), large.search(&query, 10).unwrap());
    }
}

#[tokio::test]
async fn test_update_upserts() {
    let temp = TempDir::new().unwrap();
    let manager = manager(temp.path());
    manager.build(corpus("m", 10)).await.unwrap();

    let report = manager
        .update(vec![doc("m2", "samurai duel under cherry blossoms")])
        .await
        .unwrap();
    assert_eq!(report.indexed(), 1);

    let stats = manager.stats();
    assert_eq!(stats.documents, 10);
    assert_eq!(stats.vectors, 10);
    assert_eq!(manager.get("m2").unwrap().text, "samurai duel under cherry blossoms");
    assert_eq!(manager.pending_updates(), vec!["m2".to_string()]);
    assert_eq!(manager.state(), LifecycleState::Dirty);

    let hits = manager
        .search(&embed("samurai duel under cherry blossoms").await, 1)
        .unwrap();
    assert_eq!(hits, vec!["m2".to_string()]);
}

#[tokio::test]
async fn test_metadata_only_update_skips_reindexing() {
    let temp = TempDir::new().unwrap();
    let manager = manager(temp.path());
    let docs = corpus("m", 10);
    let original = docs[4].clone();
    manager.build(docs).await.unwrap();

    manager.search(&embed("heist").await, 3).unwrap();
    let embedding_before = manager.get("m4").unwrap().embedding;

    let refreshed = original.clone().with_metadata("vote_average", 8.1);
    let report = manager.update(vec![refreshed]).await.unwrap();

    assert_eq!(report.outcomes[0].status, OutcomeStatus::MetadataOnly);
    let stored = manager.get("m4").unwrap();
    assert_eq!(stored.metadata_f64("vote_average"), Some(8.1));
    assert_eq!(stored.embedding, embedding_before);
    assert_eq!(manager.stats().cache_entries, 1);
    assert_eq!(manager.pending_updates(), vec!["m4".to_string()]);

    let mut metadata = BTreeMap::new();
    metadata.insert("title".to_string(), MetadataValue::from("Renamed"));
    manager.update_metadata("m4", metadata).await.unwrap();
    assert_eq!(manager.get("m4").unwrap().metadata_str("title"), Some("Renamed"));

    let err = manager
        .update_metadata("missing", BTreeMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::NotFound(_)));
}

#[tokio::test]
async fn test_embedding_failures_are_reported_per_document() {
    let temp = TempDir::new().unwrap();
    let manager =
        IndexManager::with_provider(test_config(temp.path()), Arc::new(FlakyProvider::new()))
            .unwrap();

    let report = manager
        .build(vec![
            doc("a", "dragons over the sea"),
            doc("b", "FAIL to embed"),
            doc("c", "courtroom drama"),
        ])
        .await
        .unwrap();

    assert_eq!(report.indexed(), 2);
    assert_eq!(
        report.failures().map(|(id, _)| id).collect::<Vec<_>>(),
        vec!["b"]
    );
    assert_eq!(manager.stats().documents, 2);
}

#[tokio::test]
async fn test_build_fails_when_nothing_embeds() {
    let temp = TempDir::new().unwrap();
    let manager =
        IndexManager::with_provider(test_config(temp.path()), Arc::new(FlakyProvider::new()))
            .unwrap();

    let err = manager.build(vec![doc("x", "FAIL")]).await.unwrap_err();
    assert!(matches!(err, IndexError::Embedding(_)));
    assert_eq!(manager.state(), LifecycleState::Uninitialized);
    assert!(!manager.has_snapshot());
}

#[tokio::test]
async fn test_persist_failure_keeps_dirty_state() {
    let temp = TempDir::new().unwrap();
    let config = IndexConfig {
        flush_policy: FlushPolicy::Explicit,
        ..test_config(temp.path())
    };
    let store_dir = config.store_dir.clone();
    let manager = manager_with(config);
    manager.build(corpus("m", 6)).await.unwrap();
    manager
        .update(vec![doc("late", "zombies in a submarine")])
        .await
        .unwrap();

    // A file where the store directory should be makes every write fail.
    std::fs::remove_dir_all(&store_dir).unwrap();
    std::fs::write(&store_dir, b"not a directory").unwrap();

    let err = manager.persist().await.unwrap_err();
    assert!(matches!(err, IndexError::Persistence(_)));
    assert_eq!(manager.state(), LifecycleState::Dirty);
    assert_eq!(manager.pending_updates(), vec!["late".to_string()]);

    std::fs::remove_file(&store_dir).unwrap();
    manager.persist().await.unwrap();
    assert_eq!(manager.state(), LifecycleState::Loaded);

    let reloaded = manager_with(test_config(temp.path()));
    reloaded.load().await.unwrap();
    assert!(reloaded.get("late").is_ok());
}

#[tokio::test]
async fn test_flush_failure_mid_update_keeps_applying_and_reports() {
    let temp = TempDir::new().unwrap();
    let config = IndexConfig {
        flush_policy: FlushPolicy::PendingCount { threshold: Some(2) },
        ..test_config(temp.path())
    };
    let store_dir = config.store_dir.clone();
    let manager = manager_with(config);
    manager.build(corpus("m", 4)).await.unwrap();

    std::fs::remove_dir_all(&store_dir).unwrap();
    std::fs::write(&store_dir, b"not a directory").unwrap();

    let report = manager
        .update_with_batch_size(corpus("u", 6), 2)
        .await
        .unwrap();
    assert_eq!(report.indexed(), 6);
    assert_eq!(report.outcomes.len(), 6);
    assert!(!report.persisted);
    assert!(report.persist_error.is_some());
    assert_eq!(manager.state(), LifecycleState::Dirty);
    assert_eq!(manager.pending_updates().len(), 6);
    assert!(manager.get("u5").is_ok());

    std::fs::remove_file(&store_dir).unwrap();
    manager.cleanup().await.unwrap();
    assert_eq!(manager.state(), LifecycleState::Loaded);

    let reloaded = manager_with(test_config(temp.path()));
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.stats().documents, 10);
    assert!(reloaded.get("u5").is_ok());
}

#[tokio::test]
async fn test_build_reports_persist_failure() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    let store_dir = config.store_dir.clone();
    std::fs::write(&store_dir, b"not a directory").unwrap();
    let manager = manager_with(config);

    let report = manager.build(corpus("m", 5)).await.unwrap();
    assert_eq!(report.indexed(), 5);
    assert!(!report.persisted);
    assert!(report.persist_error.is_some());
    assert_eq!(manager.state(), LifecycleState::Dirty);
    assert_eq!(manager.pending_updates().len(), 5);
    assert!(!manager.has_snapshot());
    assert_eq!(manager.search(&embed("robots").await, 5).unwrap().len(), 5);

    std::fs::remove_file(&store_dir).unwrap();
    manager.cleanup().await.unwrap();
    assert!(manager.has_snapshot());
    assert_eq!(manager.state(), LifecycleState::Loaded);
}

#[tokio::test]
async fn test_repeated_id_in_one_batch_last_entry_wins() {
    let temp = TempDir::new().unwrap();
    let manager = manager(temp.path());
    let mut docs = corpus("m", 4);
    docs.push(doc("a", "robots in space"));
    manager.build(docs).await.unwrap();

    let report = manager
        .update_with_batch_size(
            vec![doc("a", "pirates at sea"), doc("a", "robots in space")],
            10,
        )
        .await
        .unwrap();

    assert_eq!(report.indexed(), 2);
    let stored = manager.get("a").unwrap();
    assert_eq!(stored.text, "robots in space");
    assert_eq!(stored.embedding, Some(embed("robots in space").await));
    assert_eq!(manager.stats().vectors, 5);

    let hits = manager.search(&embed("robots in space").await, 1).unwrap();
    assert_eq!(hits, vec!["a".to_string()]);

    // Same text twice after a change: one embedding, then a metadata refresh.
    let report = manager
        .update_with_batch_size(
            vec![
                doc("a", "pirates at sea"),
                doc("a", "pirates at sea").with_metadata("vote_average", 6.5),
            ],
            10,
        )
        .await
        .unwrap();
    assert_eq!(report.outcomes[0].status, OutcomeStatus::Indexed);
    assert_eq!(report.outcomes[1].status, OutcomeStatus::MetadataOnly);
    let stored = manager.get("a").unwrap();
    assert_eq!(stored.text, "pirates at sea");
    assert_eq!(stored.metadata_f64("vote_average"), Some(6.5));
}

#[tokio::test]
async fn test_repeated_id_after_failed_entry_is_not_applied() {
    let temp = TempDir::new().unwrap();
    let manager =
        IndexManager::with_provider(test_config(temp.path()), Arc::new(FlakyProvider::new()))
            .unwrap();
    manager
        .build(vec![doc("a", "dragons over the sea"), doc("b", "courtroom drama")])
        .await
        .unwrap();

    let report = manager
        .update_with_batch_size(
            vec![doc("a", "FAIL again"), doc("a", "FAIL again")],
            10,
        )
        .await
        .unwrap();

    assert_eq!(report.failed(), 2);
    assert_eq!(manager.get("a").unwrap().text, "dragons over the sea");
    assert!(manager.pending_updates().is_empty());
}

#[tokio::test]
async fn test_load_refuses_unpersisted_changes() {
    let temp = TempDir::new().unwrap();
    let manager = manager_with(IndexConfig {
        flush_policy: FlushPolicy::Explicit,
        ..test_config(temp.path())
    });
    manager.build(corpus("m", 5)).await.unwrap();
    manager
        .update(vec![doc("late", "volcano boxing")])
        .await
        .unwrap();

    let err = manager.load().await.unwrap_err();
    assert!(matches!(err, IndexError::Configuration(_)));
    assert_eq!(manager.state(), LifecycleState::Dirty);
    assert!(manager.get("late").is_ok());

    manager.persist().await.unwrap();
    assert_eq!(manager.load().await.unwrap(), 6);
    assert!(manager.get("late").is_ok());
}

#[tokio::test]
async fn test_pending_count_threshold() {
    let temp = TempDir::new().unwrap();
    let manager = manager_with(IndexConfig {
        flush_policy: FlushPolicy::PendingCount { threshold: Some(3) },
        ..test_config(temp.path())
    });
    manager.build(corpus("m", 5)).await.unwrap();

    let report = manager.update(corpus("u", 2)).await.unwrap();
    assert!(!report.persisted);
    assert_eq!(manager.pending_updates().len(), 2);

    let report = manager.update(corpus("v", 1)).await.unwrap();
    assert!(report.persisted);
    assert!(manager.pending_updates().is_empty());
}

#[tokio::test]
async fn test_interval_policy_flushes_when_elapsed() {
    let temp = TempDir::new().unwrap();
    let manager = manager_with(IndexConfig {
        flush_policy: FlushPolicy::Interval { seconds: 0 },
        ..test_config(temp.path())
    });
    manager.build(corpus("m", 5)).await.unwrap();

    let report = manager.update(corpus("u", 1)).await.unwrap();
    assert!(report.persisted);
    assert_eq!(manager.state(), LifecycleState::Loaded);
}

#[tokio::test]
async fn test_explicit_policy_never_flushes_on_update() {
    let temp = TempDir::new().unwrap();
    let manager = manager_with(IndexConfig {
        flush_policy: FlushPolicy::Explicit,
        ..test_config(temp.path())
    });
    manager.build(corpus("m", 5)).await.unwrap();

    let report = manager
        .update_with_batch_size(corpus("u", 20), 1)
        .await
        .unwrap();
    assert!(!report.persisted);
    assert_eq!(manager.pending_updates().len(), 20);
}

#[tokio::test]
async fn test_drop_flushes_pending_updates() {
    let temp = TempDir::new().unwrap();
    {
        let manager = manager_with(IndexConfig {
            flush_policy: FlushPolicy::Explicit,
            ..test_config(temp.path())
        });
        manager.build(corpus("m", 5)).await.unwrap();
        manager
            .update(vec![doc("kept", "cowboys and vampires")])
            .await
            .unwrap();
    }

    let reloaded = manager(temp.path());
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.get("kept").unwrap().text, "cowboys and vampires");
}

#[tokio::test]
async fn test_update_on_uninitialized_builds() {
    let temp = TempDir::new().unwrap();
    let manager = manager(temp.path());

    let report = manager.update(corpus("m", 3)).await.unwrap();
    assert!(report.persisted);
    assert_eq!(report.indexed(), 3);
    assert_eq!(manager.state(), LifecycleState::Loaded);
}

#[tokio::test]
async fn test_concurrent_searches() {
    let temp = TempDir::new().unwrap();
    let manager = Arc::new(manager(temp.path()));
    manager.build(corpus("m", 20)).await.unwrap();

    let query = embed("detective").await;
    let expected = manager.search(&query, 5).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        let query = query.clone();
        handles.push(tokio::spawn(async move { manager.search(&query, 5).unwrap() }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_query_hydrates_hits_during_rebuilds() {
    let temp = TempDir::new().unwrap();
    let manager = Arc::new(manager(temp.path()));
    manager.build(corpus("a", 30)).await.unwrap();

    let builder = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            for round in 0..20 {
                let prefix = if round % 2 == 0 { "b" } else { "a" };
                manager.build(corpus(prefix, 30)).await.unwrap();
            }
        })
    };

    for _ in 0..200 {
        let hits = manager.query("robots", 5).await.unwrap();
        assert_eq!(hits.len(), 5);
        tokio::task::yield_now().await;
    }
    builder.await.unwrap();
}
