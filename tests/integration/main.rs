#[path = "../common/mod.rs"]
mod common;

mod pipeline_tests;
mod sync_tests;
