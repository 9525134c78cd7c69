mod achievement_repo;
mod api_key_repo;
mod challenge_repo;
mod completed_day_repo;
mod prayer_repo;
mod profile_repo;

pub use achievement_repo::AchievementRepository;
pub use api_key_repo::{hash_key, ApiKeyRepository, KeyOwner};
pub use challenge_repo::ChallengeRepository;
pub use completed_day_repo::CompletedDayRepository;
pub use prayer_repo::PrayerLogRepository;
pub use profile_repo::ProfileRepository;

use amal_core::coerce::parse_date_key;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// All repositories over one pool. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    pub profiles: ProfileRepository,
    pub challenges: ChallengeRepository,
    pub completed_days: CompletedDayRepository,
    pub prayer_log: PrayerLogRepository,
    pub achievements: AchievementRepository,
    pub api_keys: ApiKeyRepository,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            profiles: ProfileRepository::new(pool.clone()),
            challenges: ChallengeRepository::new(pool.clone()),
            completed_days: CompletedDayRepository::new(pool.clone()),
            prayer_log: PrayerLogRepository::new(pool.clone()),
            achievements: AchievementRepository::new(pool.clone()),
            api_keys: ApiKeyRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wipes a user's progress: every collection row goes, and the
    /// profile counters and app state return to zero.
    /// Returns false if the user has no profile.
    pub async fn reset_user(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for table in ["active_challenges", "completed_days", "prayer_log", "achievements"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?"))
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET xp = 0, streak = 0, tasbeh = 0, last_task_at = NULL, app_state = '{}', updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_optional_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value.and_then(|v| {
        DateTime::parse_from_rfc3339(v)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn decode_date(value: &str) -> Result<NaiveDate, sqlx::Error> {
    parse_date_key(value)
        .ok_or_else(|| sqlx::Error::Decode(format!("invalid date key '{}'", value).into()))
}

/// Decodes a JSON text column.
fn decode_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw)
        .map_err(|e| sqlx::Error::Decode(format!("invalid JSON in {}: {}", column, e).into()))
}
