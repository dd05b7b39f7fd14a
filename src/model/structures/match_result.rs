use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::structures::ids::{PlayerId, SetId};

/// A directed win/loss edge derived from one resolved set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub set_id: SetId,
    pub winner: PlayerId,
    pub loser: PlayerId,
    pub event_slug: String,
    pub occurred_at: Option<DateTime<Utc>>
}

impl Match {
    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.winner == player_id || self.loser == player_id
    }
}
