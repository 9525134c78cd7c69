use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An unlocked achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub achievement_id: String,
    pub xp_reward: i64,
    pub unlocked_at: DateTime<Utc>,
}

/// A normalized achievement submission. The unlock time is owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub achievement_id: String,
    pub xp_reward: i64,
}

impl AchievementRecord {
    pub fn new(achievement_id: impl Into<String>, xp_reward: i64) -> Self {
        Self {
            achievement_id: achievement_id.into(),
            xp_reward,
        }
    }
}
