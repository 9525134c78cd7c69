use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_DAILY_GOAL: i64 = 3;
pub const ONBOARDING_XP: i64 = 50;
pub const DEFAULT_CITY: &str = "Toshkent";

/// The single per-user profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub city: String,
    pub xp: i64,
    pub streak: i64,
    pub tasbeh: i64,
    pub daily_goal: i64,
    pub onboarded: bool,
    pub notifications_enabled: bool,
    pub last_task_at: Option<DateTime<Utc>>,
    pub nafs_stage: Option<i64>,
    pub nafs_assessed_at: Option<DateTime<Utc>>,
    /// Opaque client state, passed through untouched.
    pub app_state: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh profile as created at account creation time.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email: email.into(),
            name: String::new(),
            city: DEFAULT_CITY.to_string(),
            xp: ONBOARDING_XP,
            streak: 0,
            tasbeh: 0,
            daily_goal: DEFAULT_DAILY_GOAL,
            onboarded: false,
            notifications_enabled: true,
            last_task_at: None,
            nafs_stage: None,
            nafs_assessed_at: None,
            app_state: Value::Object(Map::new()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    /// Daily goal as used by statistics; never below one.
    pub fn effective_daily_goal(&self) -> i64 {
        self.daily_goal.max(1)
    }
}

/// A partial profile update.
///
/// `None` leaves a column alone. For nullable columns the inner `Option`
/// distinguishes "set" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub city: Option<String>,
    pub xp: Option<i64>,
    pub streak: Option<i64>,
    pub tasbeh: Option<i64>,
    pub daily_goal: Option<i64>,
    pub onboarded: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub last_task_at: Option<Option<DateTime<Utc>>>,
    pub nafs_stage: Option<Option<i64>>,
    pub nafs_assessed_at: Option<Option<DateTime<Utc>>>,
    pub app_state: Option<Map<String, Value>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Free-form per-user blobs kept alongside the profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub video_notes: Map<String, Value>,
    pub video_progress: Map<String, Value>,
    pub watched_videos: Map<String, Value>,
    pub prayer_debt: Map<String, Value>,
    pub tasbeh_data: Map<String, Value>,
}

/// A partial [`UserData`] update; only present blobs are replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDataPatch {
    pub video_notes: Option<Map<String, Value>>,
    pub video_progress: Option<Map<String, Value>>,
    pub watched_videos: Option<Map<String, Value>>,
    pub prayer_debt: Option<Map<String, Value>>,
    pub tasbeh_data: Option<Map<String, Value>>,
}

impl UserDataPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
