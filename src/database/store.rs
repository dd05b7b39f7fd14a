use std::{collections::HashMap, future::Future};

use crate::{
    database::{
        db_structs::{HistoryRow, PlayerNameRow, RatingRow, VideogameRow},
        error::StoreError
    },
    model::structures::{
        ids::{PlayerId, SetId, VideogameId},
        player::Player,
        videogame_scope::VideogameScope
    }
};

/// Persistence for ratings, names, the videogame scope, the sync watermark
/// and the match history audit trail.
///
/// Writes are row-level upserts with no transaction spanning calls.
pub trait Store {
    /// Every stored rating for one game, in the order the store returns them.
    fn load_ratings(&self, game_id: VideogameId) -> impl Future<Output = Result<Vec<Player>, StoreError>> + Send;

    fn load_names(&self) -> impl Future<Output = Result<HashMap<PlayerId, String>, StoreError>> + Send;

    fn load_videogames(&self) -> impl Future<Output = Result<VideogameScope, StoreError>> + Send;

    fn upsert_ratings(&self, rows: &[RatingRow]) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn upsert_player_names(&self, rows: &[PlayerNameRow]) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn upsert_videogames(&self, rows: &[VideogameRow]) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_watermark(&self, key: &str) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    fn set_watermark(&self, key: &str, timestamp: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn record_match_history(&self, rows: &[HistoryRow]) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Set ids already recorded in the history for this event.
    fn seen_set_ids(&self, event_slug: &str) -> impl Future<Output = Result<Vec<SetId>, StoreError>> + Send;
}
