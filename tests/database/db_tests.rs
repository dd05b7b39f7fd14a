use bracket_rating::{
    database::{
        db::DbClient,
        db_structs::{HistoryRow, PlayerNameRow, RatingRow, VideogameRow},
        store::Store
    },
    model::structures::ids::{PlayerId, SetId, VideogameId}
};
use chrono::{TimeZone, Utc};
use serial_test::serial;

use super::test_helpers::TestDatabase;
use crate::common::init_test_env;

fn rating_row(player: i64, rating: f64, rank: u32) -> RatingRow {
    RatingRow {
        player_id: PlayerId(player),
        game_id: VideogameId(1386),
        name: format!("player {player}"),
        rating,
        deviation: 120.0,
        volatility: 0.06,
        rank,
        appearances: 1
    }
}

fn history_row(set_id: &str, event_slug: &str) -> HistoryRow {
    HistoryRow {
        set_id: SetId::from(set_id),
        event_slug: event_slug.to_string(),
        winner_id: PlayerId(1),
        loser_id: PlayerId(2),
        occurred_at: Utc.timestamp_opt(1_700_000_000, 0).single()
    }
}

#[tokio::test]
#[serial]
async fn test_apply_schema_is_idempotent() {
    init_test_env();
    let test_db = TestDatabase::new();
    let db = test_db.client().await;

    db.upsert_videogames(&[VideogameRow {
        id: VideogameId(1386),
        name: "Smash Ultimate".to_string()
    }])
    .await
    .unwrap();

    // A second application neither fails nor drops existing rows
    db.apply_schema().await.unwrap();
    let reconnected = DbClient::connect(&test_db.connection_string).await.unwrap();
    reconnected.apply_schema().await.unwrap();

    let scope = reconnected.load_videogames().await.unwrap();
    assert_eq!(scope.ids(), vec![VideogameId(1386)]);
}

#[tokio::test]
#[serial]
async fn test_upsert_ratings_replaces_by_key() {
    init_test_env();
    let test_db = TestDatabase::new();
    let db = test_db.client().await;

    db.upsert_ratings(&[rating_row(1, 1600.0, 1), rating_row(2, 1500.0, 2)])
        .await
        .unwrap();

    let mut replaced = rating_row(1, 1450.0, 2);
    replaced.appearances = 3;
    db.upsert_ratings(&[replaced, rating_row(2, 1500.0, 1)]).await.unwrap();

    let players = db.load_ratings(VideogameId(1386)).await.unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].id, PlayerId(2));
    assert_eq!(players[1].id, PlayerId(1));
    assert_eq!(players[1].rating, 1450.0);
    assert_eq!(players[1].deviation, 120.0);
    assert_eq!(players[1].appearances, 3);

    // Ratings are kept per game
    assert!(db.load_ratings(VideogameId(1)).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_player_names_upsert() {
    init_test_env();
    let test_db = TestDatabase::new();
    let db = test_db.client().await;

    db.upsert_player_names(&[PlayerNameRow {
        player_id: PlayerId(7),
        name: "old".to_string()
    }])
    .await
    .unwrap();
    db.upsert_player_names(&[PlayerNameRow {
        player_id: PlayerId(7),
        name: "new".to_string()
    }])
    .await
    .unwrap();

    let names = db.load_names().await.unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names.get(&PlayerId(7)).map(String::as_str), Some("new"));
}

#[tokio::test]
#[serial]
async fn test_watermark_get_and_set() {
    init_test_env();
    let test_db = TestDatabase::new();
    let db = test_db.client().await;

    assert_eq!(db.get_watermark("tournaments_endAt").await.unwrap(), None);

    db.set_watermark("tournaments_endAt", 100).await.unwrap();
    db.set_watermark("tournaments_endAt", 200).await.unwrap();

    assert_eq!(db.get_watermark("tournaments_endAt").await.unwrap(), Some(200));
    assert_eq!(db.get_watermark("other").await.unwrap(), None);
}

#[tokio::test]
#[serial]
async fn test_history_and_seen_set_ids() {
    init_test_env();
    let test_db = TestDatabase::new();
    let db = test_db.client().await;

    let mut undated = history_row("12", "tournament/a/event/singles");
    undated.occurred_at = None;
    db.record_match_history(&[
        history_row("11", "tournament/a/event/singles"),
        undated,
        history_row("11", "tournament/a/event/singles"),
        history_row("21", "tournament/b/event/singles"),
    ])
    .await
    .unwrap();

    let mut seen: Vec<String> = db
        .seen_set_ids("tournament/a/event/singles")
        .await
        .unwrap()
        .into_iter()
        .map(|id| id.0)
        .collect();
    seen.sort();

    assert_eq!(seen, vec!["11".to_string(), "12".to_string()]);
    assert!(db.seen_set_ids("tournament/c/event/singles").await.unwrap().is_empty());
}
