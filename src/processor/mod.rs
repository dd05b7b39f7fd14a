pub mod context;
pub mod sync;
pub mod tournament;
