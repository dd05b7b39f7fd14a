pub mod bracket_set;
pub mod entrant;
pub mod event;
pub mod ids;
pub mod match_result;
pub mod player;
pub mod sort_field;
pub mod tournament;
pub mod videogame_scope;
pub mod watermark;
