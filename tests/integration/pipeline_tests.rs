use approx::assert_abs_diff_eq;
use bracket_rating::{
    api::error::ApiError,
    database::{memory::MemoryStore, store::Store},
    model::{
        rating_engine::RatingEngine,
        rating_tracker::RatingTracker,
        structures::ids::{PlayerId, VideogameId}
    },
    processor::{
        context::RunContext,
        tournament::{ProcessOptions, ProcessingError, TournamentProcessor}
    },
    utils::test_utils::{
        generate_match, round_robin_event, FakeEntrant, FakeEvent, FakeSet, FakeStartgg, FakeTournament
    }
};

use crate::common::{fake_client, init_test_env};

const CHESS: (i64, &str) = (1, "Chess");
const GO: (i64, &str) = (2, "Go");
const SLUG: &str = "tournament/t";

const SAVED: ProcessOptions = ProcessOptions {
    saved_games: true,
    dry_run: false
};

fn tournament_t() -> FakeTournament {
    FakeTournament {
        slug: SLUG.to_string(),
        start_at: Some(1_700_000_000),
        end_at: Some(1_700_086_400),
        events: vec![
            round_robin_event(
                1,
                "tournament/t/event/chess",
                CHESS,
                &[(1, "p1"), (2, "p2"), (3, "p3"), (4, "p4")]
            ),
            round_robin_event(
                2,
                "tournament/t/event/chess-saved",
                CHESS,
                &[(5, "p5"), (6, "p6"), (7, "p7"), (8, "p8")]
            ),
        ]
    }
}

fn chess_store() -> MemoryStore {
    MemoryStore::new().with_videogame(VideogameId(CHESS.0), CHESS.1)
}

async fn context(store: &MemoryStore) -> RunContext {
    RunContext::new(
        store.load_names().await.unwrap(),
        store.load_videogames().await.unwrap()
    )
}

#[tokio::test]
async fn test_end_to_end_ranking() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament_t()]));
    let store = chess_store();
    let mut ctx = context(&store).await;

    let report = TournamentProcessor::new(&client, &store, SAVED)
        .process(&mut ctx, SLUG)
        .await
        .unwrap();

    assert_eq!(report.events, 2);
    assert_eq!(report.matches, 12);
    assert_eq!(report.discarded_sets, 0);
    assert_eq!(report.dropped_matches, 0);
    // One period update per player
    assert_eq!(report.players_rated, 8);
    assert_eq!(report.new_players, 8);

    let rows = store.ratings(VideogameId(CHESS.0));
    assert_eq!(rows.len(), 8);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.rank, i as u32 + 1);
        assert_eq!(row.appearances, 1);
        assert!(row.deviation < 350.0);
    }
    for pair in rows.windows(2) {
        assert!(pair[0].rating >= pair[1].rating);
    }

    // Equal records tie; the earlier event's player keeps the better rank
    let order: Vec<PlayerId> = rows.iter().map(|r| r.player_id).collect();
    assert_eq!(order[0], PlayerId(1));
    assert_eq!(order[1], PlayerId(5));
    assert_eq!(order[6], PlayerId(4));
    assert_eq!(order[7], PlayerId(8));
    assert_eq!(rows[0].rating, rows[1].rating);
    assert_eq!(rows[0].name, "p1");

    assert_eq!(store.names().get(&PlayerId(3)).map(String::as_str), Some("p3"));

    let history = store.history();
    assert_eq!(history.len(), 12);
    assert!(history.iter().all(|row| row.occurred_at.is_some()));

    assert_eq!(ctx.book(VideogameId(CHESS.0)).map(RatingTracker::len), Some(8));
}

#[tokio::test]
async fn test_batches_and_pages_requested() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament_t()]));
    let store = chess_store();
    let mut ctx = context(&store).await;

    TournamentProcessor::new(&client, &store, SAVED)
        .process(&mut ctx, SLUG)
        .await
        .unwrap();

    let fake = client.transport();
    assert_eq!(fake.count("TournamentEvents"), 1);
    // One event per batch, four entrants over pages of three
    assert_eq!(fake.count("EventEntrants"), 4);
    // Two entrants per batch, three sets each over pages of two
    assert_eq!(fake.count("EntrantSets"), 8);
    assert!(client.clock().sleeps().is_empty());
}

#[tokio::test]
async fn test_unmapped_entrant_does_not_affect_ratings() {
    init_test_env();
    let event = FakeEvent {
        id: 3,
        slug: "tournament/u/event/chess".to_string(),
        start_at: None,
        videogame: Some((CHESS.0, CHESS.1.to_string())),
        entrants: vec![
            FakeEntrant {
                id: 300,
                player: Some((1, "p1".to_string()))
            },
            FakeEntrant {
                id: 301,
                player: Some((2, "p2".to_string()))
            },
            FakeEntrant { id: 302, player: None },
        ],
        sets: vec![
            FakeSet {
                id: "a".to_string(),
                winner: Some(300),
                slots: vec![Some(300), Some(301)]
            },
            FakeSet {
                id: "b".to_string(),
                winner: Some(300),
                slots: vec![Some(300), Some(302)]
            },
            FakeSet {
                id: "c".to_string(),
                winner: Some(302),
                slots: vec![Some(302), Some(301)]
            },
            FakeSet {
                id: "d".to_string(),
                winner: Some(301),
                slots: vec![Some(301), None]
            },
        ]
    };
    let client = fake_client(FakeStartgg::new(vec![FakeTournament {
        slug: "tournament/u".to_string(),
        start_at: None,
        end_at: Some(10),
        events: vec![event]
    }]));
    let store = chess_store();
    let mut ctx = context(&store).await;

    let report = TournamentProcessor::new(&client, &store, SAVED)
        .process(&mut ctx, "tournament/u")
        .await
        .unwrap();

    assert_eq!(report.matches, 1);
    assert_eq!(report.discarded_sets, 3);
    assert_eq!(report.players_rated, 2);

    let mut reference = RatingTracker::new(VideogameId(CHESS.0));
    reference.get_or_create(PlayerId(1));
    reference.get_or_create(PlayerId(2));
    RatingEngine::default().apply_period(&mut reference, &[generate_match("a", 1, 2)]);

    let book = ctx.book(VideogameId(CHESS.0)).unwrap();
    assert_eq!(book.len(), 2);
    for id in [PlayerId(1), PlayerId(2)] {
        assert_abs_diff_eq!(
            book.get_rating(id).unwrap().rating,
            reference.get_rating(id).unwrap().rating,
            epsilon = 1e-9
        );
    }
}

fn mixed_games() -> FakeTournament {
    let mut no_game = round_robin_event(6, "tournament/m/event/unknown", CHESS, &[(60, "x"), (61, "y")]);
    no_game.videogame = None;

    FakeTournament {
        slug: "tournament/m".to_string(),
        start_at: None,
        end_at: Some(10),
        events: vec![
            round_robin_event(4, "tournament/m/event/chess", CHESS, &[(40, "a"), (41, "b")]),
            round_robin_event(5, "tournament/m/event/go", GO, &[(50, "c"), (51, "d")]),
            no_game,
        ]
    }
}

#[tokio::test]
async fn test_saved_games_skips_unknown_games() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![mixed_games()]));
    let store = chess_store();
    let mut ctx = context(&store).await;

    let report = TournamentProcessor::new(&client, &store, SAVED)
        .process(&mut ctx, "tournament/m")
        .await
        .unwrap();

    assert_eq!(report.events, 1);
    assert_eq!(report.skipped_events, 2);
    assert_eq!(report.new_games, 0);
    assert_eq!(store.videogames().len(), 1);
    assert!(store.ratings(VideogameId(GO.0)).is_empty());
}

#[tokio::test]
async fn test_all_games_records_new_videogames() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![mixed_games()]));
    let store = chess_store();
    let mut ctx = context(&store).await;
    let options = ProcessOptions {
        saved_games: false,
        dry_run: false
    };

    let report = TournamentProcessor::new(&client, &store, options)
        .process(&mut ctx, "tournament/m")
        .await
        .unwrap();

    assert_eq!(report.events, 2);
    assert_eq!(report.skipped_events, 1);
    assert_eq!(report.new_games, 1);
    assert_eq!(store.videogames().get(&VideogameId(GO.0)).map(String::as_str), Some(GO.1));
    assert!(ctx.scope.contains(VideogameId(GO.0)));
    assert_eq!(store.ratings(VideogameId(GO.0)).len(), 2);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament_t()]));
    let store = chess_store();
    let mut ctx = context(&store).await;
    let options = ProcessOptions {
        saved_games: true,
        dry_run: true
    };

    let report = TournamentProcessor::new(&client, &store, options)
        .process(&mut ctx, SLUG)
        .await
        .unwrap();

    assert_eq!(report.matches, 12);
    assert_eq!(store.write_count(), 0);
    assert!(store.ratings(VideogameId(CHESS.0)).is_empty());
    assert!(store.history().is_empty());
    assert_eq!(ctx.book(VideogameId(CHESS.0)).map(RatingTracker::len), Some(8));
}

#[tokio::test]
async fn test_failed_tournament_leaves_context_untouched() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament_t()]));
    let broken = chess_store();
    broken.fail_writes_to("ranking");
    let mut ctx = context(&broken).await;

    let err = TournamentProcessor::new(&client, &broken, SAVED)
        .process(&mut ctx, SLUG)
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessingError::Store { .. }));
    assert_eq!(err.slug(), SLUG);
    assert!(ctx.seen.is_empty());
    assert!(ctx.book(VideogameId(CHESS.0)).is_none());
    assert!(broken.history().is_empty());

    // The same run can still process the tournament in full
    let store = chess_store();
    let report = TournamentProcessor::new(&client, &store, SAVED)
        .process(&mut ctx, SLUG)
        .await
        .unwrap();

    assert_eq!(report.matches, 12);
    assert_eq!(ctx.seen.len(), 12);
}

#[tokio::test]
async fn test_history_failure_is_not_fatal() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament_t()]));
    let store = chess_store();
    store.fail_writes_to("history");
    let mut ctx = context(&store).await;

    let report = TournamentProcessor::new(&client, &store, SAVED)
        .process(&mut ctx, SLUG)
        .await
        .unwrap();

    assert_eq!(report.matches, 12);
    assert_eq!(store.ratings(VideogameId(CHESS.0)).len(), 8);
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn test_reingest_does_not_recount() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament_t()]));
    let store = chess_store();

    let mut first = context(&store).await;
    TournamentProcessor::new(&client, &store, SAVED)
        .process(&mut first, SLUG)
        .await
        .unwrap();
    let before = store.ratings(VideogameId(CHESS.0));

    // A later invocation starts from what the store recorded
    let mut second = context(&store).await;
    let report = TournamentProcessor::new(&client, &store, SAVED)
        .process(&mut second, SLUG)
        .await
        .unwrap();

    assert_eq!(report.matches, 0);
    assert_eq!(report.players_rated, 0);
    assert_eq!(report.new_players, 0);

    let after = store.ratings(VideogameId(CHESS.0));
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.player_id, a.player_id);
        assert_eq!(b.rating, a.rating);
        assert_eq!(b.deviation, a.deviation);
        assert_eq!(b.appearances, a.appearances);
    }
    assert_eq!(store.history().len(), 12);
}

#[tokio::test]
async fn test_tournament_errors_carry_slug() {
    init_test_env();
    let client = fake_client(FakeStartgg::new(vec![tournament_t()]).failing(SLUG));
    let store = chess_store();
    let mut ctx = context(&store).await;
    let processor = TournamentProcessor::new(&client, &store, SAVED);

    let err = processor.process(&mut ctx, SLUG).await.unwrap_err();
    assert!(matches!(
        err,
        ProcessingError::Api {
            source: ApiError::GraphQl { .. },
            ..
        }
    ));
    assert!(err.to_string().contains(SLUG));

    let missing = processor.process(&mut ctx, "tournament/nope").await.unwrap_err();
    assert!(matches!(
        missing,
        ProcessingError::Api {
            source: ApiError::MissingData(_),
            ..
        }
    ));
    assert_eq!(store.write_count(), 0);
}
