use serde::{Deserialize, Serialize};

use crate::model::{
    constants::{DEFAULT_DEVIATION, DEFAULT_RATING, DEFAULT_VOLATILITY},
    glicko::Glicko2Rating,
    structures::ids::PlayerId
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
    /// Number of entrants this player has been registered under, across all events
    pub appearances: u32
}

impl Player {
    /// A never-before-seen player at the Glicko-2 defaults.
    pub fn new(id: PlayerId) -> Player {
        Player {
            id,
            rating: DEFAULT_RATING,
            deviation: DEFAULT_DEVIATION,
            volatility: DEFAULT_VOLATILITY,
            appearances: 0
        }
    }

    pub fn glicko(&self) -> Glicko2Rating {
        Glicko2Rating {
            rating: self.rating,
            deviation: self.deviation,
            volatility: self.volatility
        }
    }

    pub fn set_glicko(&mut self, rating: Glicko2Rating) {
        self.rating = rating.rating;
        self.deviation = rating.deviation;
        self.volatility = rating.volatility;
    }
}
