pub mod constants;
pub mod extractor;
pub mod glicko;
pub mod rating_engine;
pub mod rating_tracker;
pub mod structures;
