use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Mutex, MutexGuard}
};

use indexmap::IndexMap;

use crate::{
    database::{
        db_structs::{HistoryRow, PlayerNameRow, RatingRow, VideogameRow},
        error::StoreError,
        store::Store
    },
    model::structures::{
        ids::{PlayerId, SetId, VideogameId},
        player::Player,
        videogame_scope::VideogameScope
    }
};

#[derive(Debug, Default)]
struct State {
    ratings: HashMap<VideogameId, IndexMap<PlayerId, RatingRow>>,
    names: HashMap<PlayerId, String>,
    videogames: BTreeMap<VideogameId, String>,
    watermarks: HashMap<String, i64>,
    history: Vec<HistoryRow>,
    writes: usize,
    failing: HashSet<&'static str>
}

/// In-process [`Store`]. Backs dry runs without a database and the test
/// suites; individual tables can be made to reject writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_videogame(self, id: VideogameId, name: &str) -> MemoryStore {
        self.lock().videogames.insert(id, name.to_string());
        self
    }

    pub fn with_watermark(self, key: &str, timestamp: i64) -> MemoryStore {
        self.lock().watermarks.insert(key.to_string(), timestamp);
        self
    }

    /// Makes every subsequent write to `table` fail.
    pub fn fail_writes_to(&self, table: &'static str) {
        self.lock().failing.insert(table);
    }

    /// Number of write calls that reached the store, failed ones included.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Stored rows for a game, by rank.
    pub fn ratings(&self, game_id: VideogameId) -> Vec<RatingRow> {
        let mut rows: Vec<RatingRow> = self
            .lock()
            .ratings
            .get(&game_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by_key(|r| r.rank);
        rows
    }

    pub fn names(&self) -> HashMap<PlayerId, String> {
        self.lock().names.clone()
    }

    pub fn videogames(&self) -> BTreeMap<VideogameId, String> {
        self.lock().videogames.clone()
    }

    pub fn history(&self) -> Vec<HistoryRow> {
        self.lock().history.clone()
    }

    pub fn watermark(&self, key: &str) -> Option<i64> {
        self.lock().watermarks.get(key).copied()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test thread panicked mid-write
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_write(&self, table: &'static str) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.lock();
        state.writes += 1;

        if state.failing.contains(table) {
            return Err(StoreError::Rejected {
                table: table.to_string(),
                reason: "writes disabled".to_string()
            });
        }

        Ok(state)
    }
}

impl Store for MemoryStore {
    async fn load_ratings(&self, game_id: VideogameId) -> Result<Vec<Player>, StoreError> {
        Ok(self
            .ratings(game_id)
            .into_iter()
            .map(|row| Player {
                id: row.player_id,
                rating: row.rating,
                deviation: row.deviation,
                volatility: row.volatility,
                appearances: row.appearances
            })
            .collect())
    }

    async fn load_names(&self) -> Result<HashMap<PlayerId, String>, StoreError> {
        Ok(self.names())
    }

    async fn load_videogames(&self) -> Result<VideogameScope, StoreError> {
        Ok(VideogameScope::new(self.videogames()))
    }

    async fn upsert_ratings(&self, rows: &[RatingRow]) -> Result<(), StoreError> {
        let mut state = self.begin_write("ranking")?;
        for row in rows {
            state
                .ratings
                .entry(row.game_id)
                .or_default()
                .insert(row.player_id, row.clone());
        }

        Ok(())
    }

    async fn upsert_player_names(&self, rows: &[PlayerNameRow]) -> Result<(), StoreError> {
        let mut state = self.begin_write("player_table")?;
        for row in rows {
            state.names.insert(row.player_id, row.name.clone());
        }

        Ok(())
    }

    async fn upsert_videogames(&self, rows: &[VideogameRow]) -> Result<(), StoreError> {
        let mut state = self.begin_write("videogame_mapping")?;
        for row in rows {
            state.videogames.insert(row.id, row.name.clone());
        }

        Ok(())
    }

    async fn get_watermark(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.watermark(key))
    }

    async fn set_watermark(&self, key: &str, timestamp: i64) -> Result<(), StoreError> {
        self.begin_write("last_updated")?
            .watermarks
            .insert(key.to_string(), timestamp);

        Ok(())
    }

    async fn record_match_history(&self, rows: &[HistoryRow]) -> Result<(), StoreError> {
        self.begin_write("history")?.history.extend_from_slice(rows);

        Ok(())
    }

    async fn seen_set_ids(&self, event_slug: &str) -> Result<Vec<SetId>, StoreError> {
        Ok(self
            .lock()
            .history
            .iter()
            .filter(|row| row.event_slug == event_slug)
            .map(|row| row.set_id.clone())
            .collect())
    }
}
