mod achievement;
mod challenge;
mod completed_day;
mod prayer;
mod profile;

pub use achievement::{Achievement, AchievementRecord};
pub use challenge::{Challenge, ChallengeRecord, DEFAULT_BASE_XP, DEFAULT_CATEGORY, DEFAULT_ICON};
pub use completed_day::CompletedDay;
pub use prayer::{Prayer, PrayerDay, PrayerStatus};
pub use profile::{
    Profile, ProfilePatch, UserData, UserDataPatch, DEFAULT_CITY, DEFAULT_DAILY_GOAL,
    ONBOARDING_XP,
};
