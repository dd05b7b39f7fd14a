pub mod db;
pub mod db_structs;
pub mod error;
pub mod memory;
pub mod store;
