use amal_core::{Profile, ProfilePatch, UserData, UserDataPatch};
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{decode_json, parse_optional_timestamp, parse_timestamp};

const PROFILE_COLUMNS: &str = "id, email, name, city, xp, streak, tasbeh, daily_goal, onboarded, \
     notifications_enabled, last_task_at, nafs_stage, nafs_assessed_at, app_state, created_at, updated_at";

#[derive(Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: String,
    name: String,
    city: String,
    xp: i64,
    streak: i64,
    tasbeh: i64,
    daily_goal: i64,
    onboarded: bool,
    notifications_enabled: bool,
    last_task_at: Option<String>,
    nafs_stage: Option<i64>,
    nafs_assessed_at: Option<String>,
    app_state: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = sqlx::Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            email: row.email,
            name: row.name,
            city: row.city,
            xp: row.xp,
            streak: row.streak,
            tasbeh: row.tasbeh,
            daily_goal: row.daily_goal,
            onboarded: row.onboarded,
            notifications_enabled: row.notifications_enabled,
            last_task_at: parse_optional_timestamp(row.last_task_at.as_deref()),
            nafs_stage: row.nafs_stage,
            nafs_assessed_at: parse_optional_timestamp(row.nafs_assessed_at.as_deref()),
            app_state: Value::Object(decode_json::<Map<String, Value>>("app_state", &row.app_state)?),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserDataRow {
    video_notes: String,
    video_progress: String,
    watched_videos: String,
    prayer_debt: String,
    tasbeh_data: String,
}

impl TryFrom<UserDataRow> for UserData {
    type Error = sqlx::Error;

    fn try_from(row: UserDataRow) -> Result<Self, Self::Error> {
        Ok(UserData {
            video_notes: decode_json("video_notes", &row.video_notes)?,
            video_progress: decode_json("video_progress", &row.video_progress)?,
            watched_videos: decode_json("watched_videos", &row.watched_videos)?,
            prayer_debt: decode_json("prayer_debt", &row.prayer_debt)?,
            tasbeh_data: decode_json("tasbeh_data", &row.tasbeh_data)?,
        })
    }
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, profile: &Profile) -> Result<Profile, sqlx::Error> {
        self.insert(profile, "").await?;
        self.get(&profile.id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Inserts `profile` unless a row with its id exists, then returns the
    /// stored row. Concurrent callers for the same id all succeed.
    pub async fn create_if_missing(&self, profile: &Profile) -> Result<Profile, sqlx::Error> {
        self.insert(profile, " ON CONFLICT(id) DO NOTHING").await?;
        self.get(&profile.id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    async fn insert(&self, profile: &Profile, on_conflict: &str) -> Result<(), sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO profiles (id, email, name, city, xp, streak, tasbeh, daily_goal, onboarded,
                                  notifications_enabled, last_task_at, nafs_stage, nafs_assessed_at,
                                  app_state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?){on_conflict}
            "#
        );
        sqlx::query(&sql)
            .bind(&profile.id)
            .bind(&profile.email)
            .bind(&profile.name)
            .bind(&profile.city)
            .bind(profile.xp)
            .bind(profile.streak)
            .bind(profile.tasbeh)
            .bind(profile.daily_goal)
            .bind(profile.onboarded)
            .bind(profile.notifications_enabled)
            .bind(profile.last_task_at.map(|t| t.to_rfc3339()))
            .bind(profile.nafs_stage)
            .bind(profile.nafs_assessed_at.map(|t| t.to_rfc3339()))
            .bind(profile.app_state.to_string())
            .bind(profile.created_at.to_rfc3339())
            .bind(profile.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<Profile>, sqlx::Error> {
        let row: Option<ProfileRow> =
            sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Profile::try_from).transpose()
    }

    /// Emails are not unique; the oldest matching profile wins.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Profile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE LOWER(email) = LOWER(?) \
             ORDER BY created_at, rowid LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Profile::try_from).transpose()
    }

    pub async fn list(&self) -> Result<Vec<Profile>, sqlx::Error> {
        let rows: Vec<ProfileRow> =
            sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY email, created_at"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Profile::try_from).collect()
    }

    /// Applies the present fields of `patch` in one UPDATE.
    /// Returns false if the user has no profile.
    pub async fn apply_patch(&self, user_id: &str, patch: &ProfilePatch) -> Result<bool, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE profiles SET updated_at = ");
        builder.push_bind(Utc::now().to_rfc3339());

        if let Some(name) = &patch.name {
            builder.push(", name = ").push_bind(name.clone());
        }
        if let Some(city) = &patch.city {
            builder.push(", city = ").push_bind(city.clone());
        }
        if let Some(xp) = patch.xp {
            builder.push(", xp = ").push_bind(xp);
        }
        if let Some(streak) = patch.streak {
            builder.push(", streak = ").push_bind(streak);
        }
        if let Some(tasbeh) = patch.tasbeh {
            builder.push(", tasbeh = ").push_bind(tasbeh);
        }
        if let Some(daily_goal) = patch.daily_goal {
            builder.push(", daily_goal = ").push_bind(daily_goal);
        }
        if let Some(onboarded) = patch.onboarded {
            builder.push(", onboarded = ").push_bind(onboarded);
        }
        if let Some(enabled) = patch.notifications_enabled {
            builder.push(", notifications_enabled = ").push_bind(enabled);
        }
        if let Some(last_task_at) = patch.last_task_at {
            builder
                .push(", last_task_at = ")
                .push_bind(last_task_at.map(|t| t.to_rfc3339()));
        }
        if let Some(nafs_stage) = patch.nafs_stage {
            builder.push(", nafs_stage = ").push_bind(nafs_stage);
        }
        if let Some(assessed_at) = patch.nafs_assessed_at {
            builder
                .push(", nafs_assessed_at = ")
                .push_bind(assessed_at.map(|t| t.to_rfc3339()));
        }
        if let Some(app_state) = &patch.app_state {
            builder
                .push(", app_state = ")
                .push_bind(Value::Object(app_state.clone()).to_string());
        }

        builder.push(" WHERE id = ").push_bind(user_id.to_string());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn user_data(&self, user_id: &str) -> Result<Option<UserData>, sqlx::Error> {
        let row: Option<UserDataRow> = sqlx::query_as(
            "SELECT video_notes, video_progress, watched_videos, prayer_debt, tasbeh_data FROM profiles WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserData::try_from).transpose()
    }

    /// Replaces the present blobs of `patch`. Returns false if the user has no profile.
    pub async fn update_user_data(
        &self,
        user_id: &str,
        patch: &UserDataPatch,
    ) -> Result<bool, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE profiles SET updated_at = ");
        builder.push_bind(Utc::now().to_rfc3339());

        let blobs = [
            ("video_notes", &patch.video_notes),
            ("video_progress", &patch.video_progress),
            ("watched_videos", &patch.watched_videos),
            ("prayer_debt", &patch.prayer_debt),
            ("tasbeh_data", &patch.tasbeh_data),
        ];
        for (column, blob) in blobs {
            if let Some(map) = blob {
                builder
                    .push(format!(", {column} = "))
                    .push_bind(Value::Object(map.clone()).to_string());
            }
        }

        builder.push(" WHERE id = ").push_bind(user_id.to_string());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, setup};
    use chrono::TimeZone;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_get() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "amina@example.com").await;

        let fetched = ctx.store.profiles.get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "amina@example.com");
        assert_eq!(fetched.xp, 50);
        assert_eq!(fetched.daily_goal, 3);
        assert!(fetched.notifications_enabled);
        assert_eq!(fetched.app_state, json!({}));

        let by_email = ctx
            .store
            .profiles
            .get_by_email("AMINA@example.com")
            .await
            .unwrap();
        assert_eq!(by_email.map(|p| p.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_create_if_missing_keeps_existing_row() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "first@example.com").await;

        let again = Profile::new(user.id.clone(), "second@example.com").with_name("Other");
        let stored = ctx.store.profiles.create_if_missing(&again).await.unwrap();
        assert_eq!(stored.email, "first@example.com");
        assert_eq!(stored.name, "");

        let fresh = Profile::new("fresh-id", "");
        let stored = ctx.store.profiles.create_if_missing(&fresh).await.unwrap();
        assert_eq!(stored.id, "fresh-id");
    }

    #[tokio::test]
    async fn test_emails_may_repeat() {
        let ctx = setup().await;
        let first = seed_user(&ctx.store, "same@example.com").await;
        seed_user(&ctx.store, "same@example.com").await;
        ctx.store.profiles.create(&Profile::new("no-email-1", "")).await.unwrap();
        ctx.store.profiles.create(&Profile::new("no-email-2", "")).await.unwrap();

        assert_eq!(ctx.store.profiles.list().await.unwrap().len(), 4);
        let found = ctx.store.profiles.get_by_email("same@example.com").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(first.id));
    }

    #[tokio::test]
    async fn test_corrupt_json_columns_fail_to_decode() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "broken@example.com").await;
        sqlx::query("UPDATE profiles SET app_state = '[1', prayer_debt = 'oops' WHERE id = ?")
            .bind(&user.id)
            .execute(ctx.store.pool())
            .await
            .unwrap();

        assert!(matches!(
            ctx.store.profiles.get(&user.id).await,
            Err(sqlx::Error::Decode(_))
        ));
        assert!(matches!(
            ctx.store.profiles.user_data(&user.id).await,
            Err(sqlx::Error::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let ctx = setup().await;
        assert!(ctx.store.profiles.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_patch_only_touches_present_fields() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "patch@example.com").await;
        let assessed = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();

        let patch = ProfilePatch {
            xp: Some(120),
            onboarded: Some(true),
            nafs_stage: Some(Some(4)),
            nafs_assessed_at: Some(Some(assessed)),
            app_state: json!({"theme": "dark"}).as_object().cloned(),
            ..Default::default()
        };
        assert!(ctx.store.profiles.apply_patch(&user.id, &patch).await.unwrap());

        let profile = ctx.store.profiles.get(&user.id).await.unwrap().unwrap();
        assert_eq!(profile.xp, 120);
        assert!(profile.onboarded);
        assert_eq!(profile.nafs_stage, Some(4));
        assert_eq!(profile.nafs_assessed_at, Some(assessed));
        assert_eq!(profile.app_state, json!({"theme": "dark"}));
        assert_eq!(profile.city, "Toshkent");
        assert_eq!(profile.daily_goal, 3);
    }

    #[tokio::test]
    async fn test_apply_patch_clears_nullable_fields() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "clear@example.com").await;

        let set = ProfilePatch {
            last_task_at: Some(Some(Utc::now())),
            ..Default::default()
        };
        ctx.store.profiles.apply_patch(&user.id, &set).await.unwrap();

        let clear = ProfilePatch {
            last_task_at: Some(None),
            ..Default::default()
        };
        ctx.store.profiles.apply_patch(&user.id, &clear).await.unwrap();

        let profile = ctx.store.profiles.get(&user.id).await.unwrap().unwrap();
        assert!(profile.last_task_at.is_none());
    }

    #[tokio::test]
    async fn test_apply_patch_unknown_user() {
        let ctx = setup().await;
        let patch = ProfilePatch {
            xp: Some(1),
            ..Default::default()
        };
        assert!(!ctx.store.profiles.apply_patch("nobody", &patch).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_data_roundtrip() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "blobs@example.com").await;

        let empty = ctx.store.profiles.user_data(&user.id).await.unwrap().unwrap();
        assert_eq!(empty, UserData::default());

        let patch = UserDataPatch {
            watched_videos: json!({"v1": true}).as_object().cloned(),
            ..Default::default()
        };
        assert!(ctx
            .store
            .profiles
            .update_user_data(&user.id, &patch)
            .await
            .unwrap());

        let data = ctx.store.profiles.user_data(&user.id).await.unwrap().unwrap();
        assert_eq!(data.watched_videos.get("v1"), Some(&json!(true)));
        assert!(data.video_notes.is_empty());
    }
}
