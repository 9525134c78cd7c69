use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "ibadah";
pub const DEFAULT_BASE_XP: i64 = 20;
pub const DEFAULT_ICON: &str = "✨";

/// A challenge as stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub frontend_id: Option<String>,
    pub title: String,
    pub category: String,
    pub base_xp: i64,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            frontend_id: None,
            title: title.into(),
            category: DEFAULT_CATEGORY.to_string(),
            base_xp: DEFAULT_BASE_XP,
            icon: DEFAULT_ICON.to_string(),
            created_at: Utc::now(),
        }
    }

    /// A fresh row for a synced record. The id and creation time are only
    /// used if no row with the same client id exists yet.
    pub fn from_record(record: &ChallengeRecord) -> Self {
        Self {
            frontend_id: Some(record.frontend_id.clone()),
            category: record.category.clone(),
            base_xp: record.base_xp,
            icon: record.icon.clone(),
            ..Self::new(record.title.clone())
        }
    }

    pub fn with_frontend_id(mut self, frontend_id: impl Into<String>) -> Self {
        self.frontend_id = Some(frontend_id.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_base_xp(mut self, base_xp: i64) -> Self {
        self.base_xp = base_xp;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }
}

/// A normalized challenge keyed by its client-side id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub frontend_id: String,
    pub title: String,
    pub category: String,
    pub base_xp: i64,
    pub icon: String,
}

impl ChallengeRecord {
    pub fn new(frontend_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            frontend_id: frontend_id.into(),
            title: title.into(),
            category: DEFAULT_CATEGORY.to_string(),
            base_xp: DEFAULT_BASE_XP,
            icon: DEFAULT_ICON.to_string(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_base_xp(mut self, base_xp: i64) -> Self {
        self.base_xp = base_xp;
        self
    }
}
