pub mod api;
pub mod args;
pub mod database;
pub mod model;
pub mod processor;
pub mod utils;
