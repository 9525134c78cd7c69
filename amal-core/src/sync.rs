//! Bulk sync request types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::models::{AchievementRecord, ChallengeRecord, CompletedDay, PrayerDay, ProfilePatch};
use crate::normalize::{
    normalize_achievements, normalize_challenges, normalize_completed_days, normalize_prayer_log,
    normalize_profile, DatedPayload,
};

/// A client's bulk state upload.
///
/// Each group is optional: an absent (or `null`) group is left untouched,
/// while a present but empty group is an explicit "I have nothing", which
/// matters in replace mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub profile: Option<Map<String, Value>>,
    #[serde(default)]
    pub challenges: Option<Vec<Value>>,
    #[serde(default)]
    pub completed_days: Option<DatedPayload>,
    #[serde(default)]
    pub prayer_log: Option<DatedPayload>,
    #[serde(default)]
    pub achievements: Option<Vec<Value>>,
    #[serde(default)]
    pub replace: bool,
}

/// How submitted records are merged into stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Upsert only; rows missing from the submission stay.
    #[default]
    Merge,
    /// Upsert, then delete stored rows missing from the submission.
    Replace,
}

impl SyncMode {
    pub fn from_flag(replace: bool) -> Self {
        if replace {
            SyncMode::Replace
        } else {
            SyncMode::Merge
        }
    }
}

/// The entity groups a sync touches, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncGroup {
    Profile,
    Challenges,
    CompletedDays,
    PrayerLog,
    Achievements,
}

impl SyncGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncGroup::Profile => "profile",
            SyncGroup::Challenges => "challenges",
            SyncGroup::CompletedDays => "completed_days",
            SyncGroup::PrayerLog => "prayer_log",
            SyncGroup::Achievements => "achievements",
        }
    }
}

impl fmt::Display for SyncGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sync request after normalization. `None` marks an absent group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSync {
    pub mode: SyncMode,
    pub profile: Option<ProfilePatch>,
    pub challenges: Option<Vec<ChallengeRecord>>,
    pub completed_days: Option<Vec<CompletedDay>>,
    pub prayer_log: Option<Vec<PrayerDay>>,
    pub achievements: Option<Vec<AchievementRecord>>,
}

impl SyncRequest {
    pub fn normalize(&self) -> NormalizedSync {
        NormalizedSync {
            mode: SyncMode::from_flag(self.replace),
            profile: self.profile.as_ref().map(normalize_profile),
            challenges: self.challenges.as_deref().map(normalize_challenges),
            completed_days: self.completed_days.as_ref().map(normalize_completed_days),
            prayer_log: self.prayer_log.as_ref().map(normalize_prayer_log),
            achievements: self.achievements.as_deref().map(normalize_achievements),
        }
    }
}
