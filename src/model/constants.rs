// Glicko-2 defaults (Glickman, "Example of the Glicko-2 system")
pub const DEFAULT_RATING: f64 = 1500.0;
pub const DEFAULT_DEVIATION: f64 = 350.0;
pub const DEFAULT_VOLATILITY: f64 = 0.06;
/// System constant; smaller values damp volatility changes
pub const TAU: f64 = 0.5;
