//! Amal Core Library
//!
//! Shared models plus the pure halves of the sync engine: payload
//! normalization, streak scans and window statistics.

pub mod coerce;
pub mod models;
pub mod normalize;
pub mod stats;
pub mod streak;
pub mod sync;

pub use models::{
    Achievement, AchievementRecord, Challenge, ChallengeRecord, CompletedDay, Prayer, PrayerDay,
    PrayerStatus, Profile, ProfilePatch, UserData, UserDataPatch,
};
pub use normalize::{DatedPayload, NormalizeError};
pub use stats::{DateRange, DayStats, WindowSummary};
pub use streak::Streaks;
pub use sync::{NormalizedSync, SyncGroup, SyncMode, SyncRequest};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
