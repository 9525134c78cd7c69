//! Store-backed sync, snapshot and statistics services.

mod reconcile;
mod snapshot;
mod stats;
mod streak;
mod sync;

pub use reconcile::{ReconcileOutcome, Reconciler, SyncCollection};
pub use snapshot::{Snapshot, SnapshotReader};
pub use stats::{ProfileTotals, StatsAggregator, WeeklyStats};
pub use streak::{StreakCalculator, StreakReport, DEFAULT_STREAK_WINDOW_DAYS};
pub use sync::{GroupFailure, SyncEngine, SyncReport};
