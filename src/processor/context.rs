use std::collections::HashMap;

use uuid::Uuid;

use crate::model::{
    extractor::SeenSetRegistry,
    rating_tracker::RatingTracker,
    structures::{
        ids::{PlayerId, VideogameId},
        videogame_scope::VideogameScope
    }
};

/// State shared by every tournament of one run.
///
/// Rating books are loaded lazily per game and then owned here for the
/// rest of the run; tournaments only ever see copies until they commit.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    books: HashMap<VideogameId, RatingTracker>,
    names: HashMap<PlayerId, String>,
    pub scope: VideogameScope,
    pub seen: SeenSetRegistry
}

impl RunContext {
    pub fn new(names: HashMap<PlayerId, String>, scope: VideogameScope) -> RunContext {
        RunContext {
            run_id: Uuid::new_v4(),
            books: HashMap::new(),
            names,
            scope,
            seen: SeenSetRegistry::new()
        }
    }

    pub fn book(&self, game_id: VideogameId) -> Option<&RatingTracker> {
        self.books.get(&game_id)
    }

    pub fn books(&self) -> impl Iterator<Item = &RatingTracker> {
        self.books.values()
    }

    pub fn name(&self, player_id: PlayerId) -> Option<&str> {
        self.names.get(&player_id).map(String::as_str)
    }

    /// Replaces the run's books with the given ones and records new names.
    pub fn commit(
        &mut self,
        books: impl IntoIterator<Item = RatingTracker>,
        names: impl IntoIterator<Item = (PlayerId, String)>
    ) {
        for book in books {
            self.books.insert(book.game_id(), book);
        }
        self.names.extend(names);
    }
}
