use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::model::{
    glicko::{Glicko2, Glicko2Rating, OpponentResult},
    rating_tracker::RatingTracker,
    structures::{ids::PlayerId, match_result::Match}
};

/// Before and after values for one player's period update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingChange {
    pub player_id: PlayerId,
    pub before: Glicko2Rating,
    pub after: Glicko2Rating,
    pub games: usize
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodSummary {
    pub changes: Vec<RatingChange>,
    /// Matches referencing a player the tracker does not know
    pub dropped: usize
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RatingEngine {
    system: Glicko2
}

impl RatingEngine {
    pub fn new(system: Glicko2) -> RatingEngine {
        RatingEngine { system }
    }

    /// Applies one rating period (every match of one event) to the tracker.
    ///
    /// Each player is updated exactly once, against the opponents' values as
    /// they were before this call. Players without a match in `matches` are
    /// not touched.
    pub fn apply_period(&self, tracker: &mut RatingTracker, matches: &[Match]) -> PeriodSummary {
        let mut summary = PeriodSummary::default();
        let mut periods: IndexMap<PlayerId, (Glicko2Rating, Vec<OpponentResult>)> = IndexMap::new();

        for m in matches {
            let (Some(winner), Some(loser)) = (tracker.get_rating(m.winner), tracker.get_rating(m.loser)) else {
                warn!(
                    "Dropping set {} in {}: player {} or {} has no rating",
                    m.set_id, m.event_slug, m.winner, m.loser
                );
                summary.dropped += 1;
                continue;
            };

            let (winner, loser) = (winner.glicko(), loser.glicko());

            periods.entry(m.winner).or_insert_with(|| (winner, Vec::new())).1.push(OpponentResult {
                opponent_rating: loser.rating,
                opponent_deviation: loser.deviation,
                score: 1.0
            });
            periods.entry(m.loser).or_insert_with(|| (loser, Vec::new())).1.push(OpponentResult {
                opponent_rating: winner.rating,
                opponent_deviation: winner.deviation,
                score: 0.0
            });
        }

        // Every rating is computed before any is written back
        let updates: Vec<RatingChange> = periods
            .into_iter()
            .map(|(player_id, (before, results))| RatingChange {
                player_id,
                before,
                after: self.system.rate(before, &results),
                games: results.len()
            })
            .collect();

        for change in &updates {
            if let Some(player) = tracker.get_rating_mut(change.player_id) {
                player.set_glicko(change.after);
            }
        }

        debug!(
            "Rated {} players over {} matches for game {}",
            updates.len(),
            matches.len() - summary.dropped,
            tracker.game_id()
        );

        summary.changes = updates;
        summary
    }
}
