use bracket_rating::{
    database::memory::MemoryStore,
    model::structures::ids::VideogameId,
    processor::sync::{FailurePolicy, SyncController, SyncError, SyncOptions, SyncReport},
    utils::test_utils::{round_robin_event, FakeStartgg, FakeTournament}
};
use serde_json::json;

use crate::common::{fake_client, init_test_env};

const KEY: &str = "tournaments_endAt";

fn tournament(n: i64, end_at: i64) -> FakeTournament {
    FakeTournament {
        slug: format!("tournament/t{n}"),
        start_at: Some(end_at - 3_600),
        end_at: Some(end_at),
        events: vec![round_robin_event(
            n,
            &format!("tournament/t{n}/event/chess"),
            (1, "Chess"),
            &[(n * 10, "a"), (n * 10 + 1, "b"), (n * 10 + 2, "c")]
        )]
    }
}

fn store(watermark: Option<i64>) -> MemoryStore {
    let store = MemoryStore::new().with_videogame(VideogameId(1), "Chess");
    match watermark {
        Some(ts) => store.with_watermark(KEY, ts),
        None => store
    }
}

fn resilient(max_failures: usize) -> SyncOptions {
    SyncOptions {
        failure_policy: FailurePolicy::Continue { max_failures },
        ..SyncOptions::default()
    }
}

fn processed_slugs(report: &SyncReport) -> Vec<&str> {
    report.processed.iter().map(|r| r.slug.as_str()).collect()
}

#[tokio::test]
async fn test_watermark_counts_only_successes() {
    init_test_env();
    let fake = FakeStartgg::new(vec![tournament(1, 100), tournament(2, 300), tournament(3, 200)]).failing("tournament/t2");
    let client = fake_client(fake);
    let store = store(Some(50));

    let report = SyncController::new(&client, &store, resilient(5)).run().await.unwrap();

    assert_eq!(processed_slugs(&report), vec!["tournament/t1", "tournament/t3"]);
    assert_eq!(report.failed, vec!["tournament/t2".to_string()]);
    assert_eq!(report.watermark_before, Some(50));
    assert_eq!(report.watermark_after, Some(200));
    assert_eq!(store.watermark(KEY), Some(200));
}

#[tokio::test]
async fn test_abort_on_first_failure() {
    init_test_env();
    let fake = FakeStartgg::new(vec![tournament(1, 100), tournament(2, 200), tournament(3, 300)]).failing("tournament/t2");
    let client = fake_client(fake);
    let store = store(Some(50));

    let err = SyncController::new(&client, &store, SyncOptions::default())
        .run()
        .await
        .unwrap_err();

    match err {
        SyncError::Tournament(e) => assert_eq!(e.slug(), "tournament/t2"),
        other => panic!("expected a tournament error, got {other}")
    }

    // t1 was persisted, but an aborted run keeps the old watermark
    assert_eq!(store.ratings(VideogameId(1)).len(), 3);
    assert_eq!(store.watermark(KEY), Some(50));
    assert_eq!(client.transport().count("TournamentEvents"), 2);
}

#[tokio::test]
async fn test_too_many_failures() {
    init_test_env();
    let fake = FakeStartgg::new(vec![tournament(1, 100), tournament(2, 200), tournament(3, 300)])
        .failing("tournament/t1")
        .failing("tournament/t2");
    let client = fake_client(fake);
    let store = store(None);

    let err = SyncController::new(&client, &store, resilient(2)).run().await.unwrap_err();

    assert!(matches!(err, SyncError::TooManyFailures { failures: 2, max: 2, .. }));
    assert_eq!(store.watermark(KEY), None);
    assert_eq!(client.transport().count("TournamentEvents"), 2);
}

#[tokio::test]
async fn test_watermark_never_moves_backwards() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament(1, 100)]));
    let store = store(Some(1_000));

    let report = SyncController::new(&client, &store, SyncOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.watermark_after, Some(1_000));
    assert_eq!(store.watermark(KEY), Some(1_000));
}

#[tokio::test]
async fn test_pages_in_search_order() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament(1, 300), tournament(2, 100), tournament(3, 200)]));
    let store = store(None);
    let options = SyncOptions {
        per_page: 2,
        ..SyncOptions::default()
    };

    let report = SyncController::new(&client, &store, options).run().await.unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.tournaments_found, 3);
    assert_eq!(
        processed_slugs(&report),
        vec!["tournament/t1", "tournament/t2", "tournament/t3"]
    );
    assert_eq!(store.watermark(KEY), Some(300));
}

#[tokio::test]
async fn test_sort_ascending_after_all_pages() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament(1, 300), tournament(2, 100), tournament(3, 200)]));
    let store = store(None);
    let options = SyncOptions {
        per_page: 2,
        sort_ascending: true,
        ..SyncOptions::default()
    };

    let report = SyncController::new(&client, &store, options).run().await.unwrap();

    assert_eq!(
        processed_slugs(&report),
        vec!["tournament/t2", "tournament/t3", "tournament/t1"]
    );
    assert_eq!(client.transport().count("TournamentSearch"), 2);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament(1, 100), tournament(2, 200)]));
    let store = store(Some(50));
    let options = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };

    let report = SyncController::new(&client, &store, options).run().await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.watermark_after, Some(200));
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.watermark(KEY), Some(50));
}

#[tokio::test]
async fn test_search_filter_from_scope_and_watermark() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament(1, 100)]));
    let store = store(Some(50));
    let options = SyncOptions {
        country: Some("US".to_string()),
        before: Some(999),
        ..SyncOptions::default()
    };

    SyncController::new(&client, &store, options).run().await.unwrap();

    let search = client
        .transport()
        .requests()
        .into_iter()
        .find(|r| r.operation_name() == Some("TournamentSearch"))
        .unwrap();
    assert_eq!(search.variables["country"], json!("US"));
    assert_eq!(search.variables["videogameIds"], json!(["1"]));
    assert_eq!(search.variables["afterDate"], json!(50));
    assert_eq!(search.variables["beforeDate"], json!(999));
    assert_eq!(search.variables["sort"], json!("endAt"));
}

#[tokio::test]
async fn test_empty_slugs_are_skipped() {
    init_test_env();
    let mut nameless = tournament(2, 500);
    nameless.slug = String::new();
    let client = fake_client(FakeStartgg::new(vec![tournament(1, 100), nameless]));
    let store = store(None);

    let report = SyncController::new(&client, &store, SyncOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.tournaments_found, 1);
    assert_eq!(processed_slugs(&report), vec!["tournament/t1"]);
    assert_eq!(store.watermark(KEY), Some(100));
}

#[tokio::test]
async fn test_second_run_does_not_recount() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament(1, 100), tournament(2, 200)]));
    let store = store(None);

    let first = SyncController::new(&client, &store, SyncOptions::default())
        .run()
        .await
        .unwrap();
    let ratings = store.ratings(VideogameId(1));

    // The fake ignores afterDate, so the same tournaments come back
    let second = SyncController::new(&client, &store, SyncOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(first.processed.iter().map(|r| r.matches).sum::<usize>(), 6);
    assert_eq!(second.processed.iter().map(|r| r.matches).sum::<usize>(), 0);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.watermark_before, Some(200));

    let after = store.ratings(VideogameId(1));
    for (b, a) in ratings.iter().zip(&after) {
        assert_eq!(b.player_id, a.player_id);
        assert_eq!(b.rating, a.rating);
        assert_eq!(b.appearances, a.appearances);
    }
}
