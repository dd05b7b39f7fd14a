use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{
    rating_tracker::RatingTracker,
    structures::{
        ids::{PlayerId, SetId, VideogameId},
        match_result::Match
    }
};

pub const UNKNOWN_PLAYER_NAME: &str = "Unknown";

/// A row of the `ranking` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRow {
    pub player_id: PlayerId,
    pub game_id: VideogameId,
    pub name: String,
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
    pub rank: u32,
    pub appearances: u32
}

impl RatingRow {
    /// Rows for a whole game table, ranked by descending rating.
    pub fn ranked_rows<'a>(tracker: &RatingTracker, name_of: impl Fn(PlayerId) -> Option<&'a str>) -> Vec<RatingRow> {
        tracker
            .ranked()
            .into_iter()
            .map(|ranked| RatingRow {
                player_id: ranked.player.id,
                game_id: tracker.game_id(),
                name: name_of(ranked.player.id).unwrap_or(UNKNOWN_PLAYER_NAME).to_string(),
                rating: ranked.player.rating,
                deviation: ranked.player.deviation,
                volatility: ranked.player.volatility,
                rank: ranked.rank,
                appearances: ranked.player.appearances
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerNameRow {
    pub player_id: PlayerId,
    pub name: String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideogameRow {
    pub id: VideogameId,
    pub name: String
}

/// Append-only audit record of one extracted match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub set_id: SetId,
    pub event_slug: String,
    pub winner_id: PlayerId,
    pub loser_id: PlayerId,
    pub occurred_at: Option<DateTime<Utc>>
}

impl From<&Match> for HistoryRow {
    fn from(m: &Match) -> Self {
        HistoryRow {
            set_id: m.set_id.clone(),
            event_slug: m.event_slug.clone(),
            winner_id: m.winner,
            loser_id: m.loser,
            occurred_at: m.occurred_at
        }
    }
}
