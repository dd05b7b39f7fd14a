use chrono::{DateTime, Utc};

use crate::model::structures::{
    entrant::Entrant,
    ids::{EventId, VideogameId}
};

/// An event as listed on its tournament, before entrants are fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub id: EventId,
    pub slug: Option<String>,
    /// Game id and display name
    pub videogame: Option<(VideogameId, String)>
}

impl EventSummary {
    pub fn videogame_id(&self) -> Option<VideogameId> {
        self.videogame.as_ref().map(|(id, _)| *id)
    }
}

/// An event with every page of its entrants collected.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEntrants {
    pub id: EventId,
    pub slug: String,
    /// Event start, stamped on every match extracted from it
    pub occurred_at: Option<DateTime<Utc>>,
    pub videogame: Option<(VideogameId, String)>,
    pub entrants: Vec<Entrant>
}

impl EventEntrants {
    pub fn videogame_id(&self) -> Option<VideogameId> {
        self.videogame.as_ref().map(|(id, _)| *id)
    }
}
