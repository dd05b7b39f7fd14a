use std::collections::HashMap;

use crate::model::structures::ids::{EntrantId, PlayerId};

/// An event-scoped registration. `player` is `None` for guests and
/// accounts the platform cannot resolve to a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Entrant {
    pub id: EntrantId,
    pub player: Option<PlayerId>,
    pub name: Option<String>
}

/// Entrant to player mapping for the event currently being processed.
#[derive(Debug, Default, Clone)]
pub struct EntrantMap {
    players: HashMap<EntrantId, PlayerId>,
    order: Vec<EntrantId>
}

impl EntrantMap {
    pub fn new() -> EntrantMap {
        EntrantMap::default()
    }

    pub fn insert(&mut self, entrant: EntrantId, player: PlayerId) {
        if self.players.insert(entrant, player).is_none() {
            self.order.push(entrant);
        }
    }

    pub fn resolve(&self, entrant: EntrantId) -> Option<PlayerId> {
        self.players.get(&entrant).copied()
    }

    /// Mapped entrant ids in registration order.
    pub fn entrant_ids(&self) -> &[EntrantId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
