use amal_core::{Achievement, Challenge, CompletedDay, PrayerDay, Profile};
use serde::Serialize;

use crate::db::Store;
use crate::error::AppError;

/// Everything stored for one user.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub profile: Profile,
    pub challenges: Vec<Challenge>,
    pub completed_days: Vec<CompletedDay>,
    pub achievements: Vec<Achievement>,
    pub prayer_log: Vec<PrayerDay>,
}

#[derive(Clone)]
pub struct SnapshotReader {
    store: Store,
}

impl SnapshotReader {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Reads the profile and all four collections concurrently.
    pub async fn read(&self, user_id: &str) -> Result<Snapshot, AppError> {
        let (profile, challenges, completed_days, achievements, prayer_log) = futures::try_join!(
            self.store.profiles.get(user_id),
            self.store.challenges.list(user_id),
            self.store.completed_days.list(user_id),
            self.store.achievements.list(user_id),
            self.store.prayer_log.list(user_id),
        )?;

        let profile = profile.ok_or_else(|| AppError::not_found("profile"))?;

        Ok(Snapshot {
            profile,
            challenges,
            completed_days,
            achievements,
            prayer_log,
        })
    }
}
