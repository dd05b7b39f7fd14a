use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{
    rating_tracker::RatingTracker,
    structures::{
        bracket_set::BracketSet,
        entrant::{Entrant, EntrantMap},
        ids::{EntrantId, PlayerId, SetId},
        match_result::Match
    }
};

/// Set ids already turned into a [`Match`] during this run.
///
/// Insertions made between [`begin`](Self::begin) and
/// [`rollback`](Self::rollback) are undone, so a tournament that fails
/// part way does not leave its sets marked.
#[derive(Debug, Default, Clone)]
pub struct SeenSetRegistry {
    seen: HashSet<SetId>,
    journal: Option<Vec<SetId>>
}

impl SeenSetRegistry {
    pub fn new() -> SeenSetRegistry {
        SeenSetRegistry::default()
    }

    /// Marks the set as seen. Returns false if it already was.
    pub fn insert(&mut self, id: &SetId) -> bool {
        if self.seen.contains(id) {
            return false;
        }

        self.seen.insert(id.clone());
        if let Some(journal) = &mut self.journal {
            journal.push(id.clone());
        }

        true
    }

    pub fn begin(&mut self) {
        self.journal = Some(Vec::new());
    }

    /// Keeps everything inserted since [`begin`](Self::begin).
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Forgets everything inserted since [`begin`](Self::begin).
    pub fn rollback(&mut self) {
        for id in self.journal.take().unwrap_or_default() {
            self.seen.remove(&id);
        }
    }

    pub fn contains(&self, id: &SetId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Extend<SetId> for SeenSetRegistry {
    fn extend<I: IntoIterator<Item = SetId>>(&mut self, iter: I) {
        self.seen.extend(iter);
    }
}

/// How a single set resolved against the entrant map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResolution {
    Decided { winner: PlayerId, loser: PlayerId },
    /// A slot is empty or its entrant has no player (byes, guests)
    Unmapped,
    /// No winner, or the declared winner is in neither slot
    Undecided,
    Malformed
}

pub fn resolve_set(set: &BracketSet, entrants: &EntrantMap) -> SetResolution {
    let Some((first, second)) = set.pair() else {
        return SetResolution::Malformed;
    };

    let (Some(first), Some(second)) = (first, second) else {
        return SetResolution::Unmapped;
    };

    let (Some(first_player), Some(second_player)) = (entrants.resolve(first), entrants.resolve(second)) else {
        return SetResolution::Unmapped;
    };

    match set.winner {
        Some(winner) if winner == first => SetResolution::Decided {
            winner: first_player,
            loser: second_player
        },
        Some(winner) if winner == second => SetResolution::Decided {
            winner: second_player,
            loser: first_player
        },
        _ => SetResolution::Undecided
    }
}

/// Per-event match extraction.
///
/// Built once per event from its entrant list, then fed every entrant
/// sub-batch of set listings in turn. The same [`SeenSetRegistry`] must be
/// passed to every call in the run.
pub struct MatchExtractor {
    event_slug: String,
    occurred_at: Option<DateTime<Utc>>,
    entrants: EntrantMap,
    new_players: HashMap<PlayerId, String>,
    matches: Vec<Match>,
    discarded: usize
}

impl MatchExtractor {
    /// Registers the event's entrants against the game's tracker.
    ///
    /// Every entrant that resolves to a player adds one appearance to that
    /// player, so a player registered under two entrants gains two. Players
    /// not yet in the tracker are created at default values.
    pub fn new(
        event_slug: &str,
        occurred_at: Option<DateTime<Utc>>,
        entrants: &[Entrant],
        tracker: &mut RatingTracker
    ) -> MatchExtractor {
        MatchExtractor::register(event_slug, occurred_at, entrants, tracker, true)
    }

    /// Registers an event whose sets were recorded by an earlier run.
    ///
    /// Same as [`new`](Self::new) except that appearances are left alone,
    /// since they were counted the first time the event was ingested.
    pub fn revisit(
        event_slug: &str,
        occurred_at: Option<DateTime<Utc>>,
        entrants: &[Entrant],
        tracker: &mut RatingTracker
    ) -> MatchExtractor {
        MatchExtractor::register(event_slug, occurred_at, entrants, tracker, false)
    }

    fn register(
        event_slug: &str,
        occurred_at: Option<DateTime<Utc>>,
        entrants: &[Entrant],
        tracker: &mut RatingTracker,
        count_appearances: bool
    ) -> MatchExtractor {
        let mut map = EntrantMap::new();
        let mut new_players = HashMap::new();

        for entrant in entrants {
            let Some(player_id) = entrant.player else {
                debug!("Entrant {} in {} has no player, skipping", entrant.id, event_slug);
                continue;
            };

            let (player, created) = tracker.get_or_create(player_id);
            if count_appearances {
                player.appearances += 1;
            }

            if created {
                new_players.insert(player_id, entrant.name.clone().unwrap_or_default());
            }

            map.insert(entrant.id, player_id);
        }

        MatchExtractor {
            event_slug: event_slug.to_string(),
            occurred_at,
            entrants: map,
            new_players,
            matches: Vec::new(),
            discarded: 0
        }
    }

    pub fn entrant_map(&self) -> &EntrantMap {
        &self.entrants
    }

    /// Entrant ids whose sets need fetching, in registration order.
    pub fn entrant_ids(&self) -> Vec<EntrantId> {
        self.entrants.entrant_ids().to_vec()
    }

    /// Consumes one sub-batch of set listings, one listing per entrant as
    /// returned by the platform (most recent first).
    ///
    /// Each listing is walked oldest first. A set id already in `seen` is
    /// skipped; otherwise it is marked seen and converted, or silently
    /// discarded if it cannot be resolved to two players and a winner.
    pub fn ingest(&mut self, listings: Vec<(EntrantId, Vec<BracketSet>)>, seen: &mut SeenSetRegistry) -> usize {
        let before = self.matches.len();

        for (entrant_id, sets) in listings {
            for set in sets.into_iter().rev() {
                if !seen.insert(&set.id) {
                    continue;
                }

                match resolve_set(&set, &self.entrants) {
                    SetResolution::Decided { winner, loser } => self.matches.push(Match {
                        set_id: set.id,
                        winner,
                        loser,
                        event_slug: self.event_slug.clone(),
                        occurred_at: self.occurred_at
                    }),
                    resolution => {
                        debug!(
                            "Discarding set {} (listed for entrant {}): {:?}",
                            set.id, entrant_id, resolution
                        );
                        self.discarded += 1;
                    }
                }
            }
        }

        self.matches.len() - before
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// The event's full rating period and the names of players first seen in it.
    pub fn finish(self) -> (Vec<Match>, HashMap<PlayerId, String>) {
        (self.matches, self.new_players)
    }
}
