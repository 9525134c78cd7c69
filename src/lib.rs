//! Amal sync and statistics server.
//!
//! Stores each user's habit challenges, completed days, prayer log and
//! achievements in SQLite, reconciles bulk uploads from the client, and
//! derives streaks and windowed statistics from the stored history.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod server;
