//! Storage layer
//!
//! Uses SQLite (embedded, no external services).

pub mod db;

pub use db::{Database, StoreTx};
