use glicko2::{GameResult, GlickoRating};

use crate::model::constants::{DEFAULT_DEVIATION, DEFAULT_RATING, DEFAULT_VOLATILITY, TAU};

/// A rating on the Glicko scale (r, RD, σ).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glicko2Rating {
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64
}

impl Default for Glicko2Rating {
    fn default() -> Self {
        Glicko2Rating {
            rating: DEFAULT_RATING,
            deviation: DEFAULT_DEVIATION,
            volatility: DEFAULT_VOLATILITY
        }
    }
}

impl From<Glicko2Rating> for glicko2::Glicko2Rating {
    fn from(rating: Glicko2Rating) -> Self {
        let mut scaled = glicko2::Glicko2Rating::from(GlickoRating {
            value: rating.rating,
            deviation: rating.deviation
        });
        scaled.volatility = rating.volatility;
        scaled
    }
}

impl From<glicko2::Glicko2Rating> for Glicko2Rating {
    fn from(scaled: glicko2::Glicko2Rating) -> Self {
        let volatility = scaled.volatility;
        let glicko = GlickoRating::from(scaled);
        Glicko2Rating {
            rating: glicko.value,
            deviation: glicko.deviation,
            volatility
        }
    }
}

/// One game of a rating period, seen from the player being rated.
/// `score` is 1.0 for a win and 0.0 for a loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentResult {
    pub opponent_rating: f64,
    pub opponent_deviation: f64,
    pub score: f64
}

impl OpponentResult {
    fn game(&self) -> GameResult {
        let opponent = glicko2::Glicko2Rating::from(GlickoRating {
            value: self.opponent_rating,
            deviation: self.opponent_deviation
        });

        if self.score >= 1.0 {
            GameResult::win(opponent)
        } else if self.score <= 0.0 {
            GameResult::loss(opponent)
        } else {
            GameResult::draw(opponent)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Glicko2 {
    tau: f64
}

impl Default for Glicko2 {
    fn default() -> Self {
        Glicko2::new(TAU)
    }
}

impl Glicko2 {
    pub fn new(tau: f64) -> Glicko2 {
        Glicko2 { tau }
    }

    /// # Glicko-2 rating period update
    ///
    /// Rates `player` against every result of the period at once. All
    /// opponent values must be taken from before the period started.
    ///
    /// An empty period leaves the rating untouched.
    pub fn rate(&self, player: Glicko2Rating, results: &[OpponentResult]) -> Glicko2Rating {
        if results.is_empty() {
            return player;
        }

        let games: Vec<GameResult> = results.iter().map(OpponentResult::game).collect();
        glicko2::new_rating(player.into(), &games, self.tau).into()
    }
}
