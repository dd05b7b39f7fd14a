use indexmap::IndexMap;
use itertools::Itertools;

use crate::model::structures::{
    ids::{PlayerId, VideogameId},
    player::Player
};

/// A player with their position on the game's leaderboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedPlayer {
    pub rank: u32,
    pub player: Player
}

/// All known ratings for a single videogame.
///
/// Players are kept in insertion order: players loaded from the store come
/// first (in the order the store returned them), followed by players first
/// seen during this run. That order is the tie-break when ranking.
#[derive(Debug, Clone)]
pub struct RatingTracker {
    game_id: VideogameId,
    leaderboard: IndexMap<PlayerId, Player>
}

impl RatingTracker {
    pub fn new(game_id: VideogameId) -> RatingTracker {
        RatingTracker {
            game_id,
            leaderboard: IndexMap::new()
        }
    }

    pub fn from_players(game_id: VideogameId, players: impl IntoIterator<Item = Player>) -> RatingTracker {
        let mut tracker = RatingTracker::new(game_id);
        for player in players {
            tracker.leaderboard.insert(player.id, player);
        }

        tracker
    }

    pub fn game_id(&self) -> VideogameId {
        self.game_id
    }

    pub fn get_rating(&self, player_id: PlayerId) -> Option<&Player> {
        self.leaderboard.get(&player_id)
    }

    pub fn get_rating_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.leaderboard.get_mut(&player_id)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.leaderboard.contains_key(&player_id)
    }

    /// Returns the player, creating them at default values on first sighting.
    /// The boolean is true when the player was created by this call.
    pub fn get_or_create(&mut self, player_id: PlayerId) -> (&mut Player, bool) {
        let created = !self.leaderboard.contains_key(&player_id);
        let player = self
            .leaderboard
            .entry(player_id)
            .or_insert_with(|| Player::new(player_id));

        (player, created)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.leaderboard.values()
    }

    pub fn len(&self) -> usize {
        self.leaderboard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaderboard.is_empty()
    }

    /// Leaderboard sorted by descending rating. Ranks start at 1; equal
    /// ratings keep insertion order.
    pub fn ranked(&self) -> Vec<RankedPlayer> {
        self.leaderboard
            .values()
            .sorted_by(|a, b| b.rating.total_cmp(&a.rating))
            .enumerate()
            .map(|(i, player)| RankedPlayer {
                rank: i as u32 + 1,
                player: *player
            })
            .collect()
    }
}
