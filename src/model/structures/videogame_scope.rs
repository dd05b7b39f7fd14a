use std::collections::BTreeMap;

use crate::model::structures::ids::VideogameId;

/// Known videogames. In saved-games mode this is an allow-list; otherwise
/// it grows as new games are observed.
#[derive(Debug, Clone, Default)]
pub struct VideogameScope {
    games: BTreeMap<VideogameId, String>
}

impl VideogameScope {
    pub fn new(games: BTreeMap<VideogameId, String>) -> VideogameScope {
        VideogameScope { games }
    }

    pub fn contains(&self, id: VideogameId) -> bool {
        self.games.contains_key(&id)
    }

    /// Returns true when the game was not known before.
    pub fn observe(&mut self, id: VideogameId, name: &str) -> bool {
        if self.games.contains_key(&id) {
            return false;
        }

        self.games.insert(id, name.to_string());
        true
    }

    /// Sorted ids, as passed to the tournament search filter.
    pub fn ids(&self) -> Vec<VideogameId> {
        self.games.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
