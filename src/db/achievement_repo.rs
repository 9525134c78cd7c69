use amal_core::{Achievement, AchievementRecord, SyncGroup};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::parse_timestamp;
use crate::engine::SyncCollection;

#[derive(Clone)]
pub struct AchievementRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct AchievementRow {
    achievement_id: String,
    xp_reward: i64,
    unlocked_at: String,
}

impl From<AchievementRow> for Achievement {
    fn from(row: AchievementRow) -> Self {
        Achievement {
            achievement_id: row.achievement_id,
            xp_reward: row.xp_reward,
            unlocked_at: parse_timestamp(&row.unlocked_at),
        }
    }
}

impl AchievementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Unlock order.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Achievement>, sqlx::Error> {
        let rows: Vec<AchievementRow> = sqlx::query_as(
            r#"
            SELECT achievement_id, xp_reward, unlocked_at FROM achievements
            WHERE user_id = ?
            ORDER BY unlocked_at, achievement_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Achievement::from).collect())
    }

    /// Stored rows among `ids`, in unlock order.
    pub async fn list_ids(&self, user_id: &str, ids: &[String]) -> Result<Vec<Achievement>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT achievement_id, xp_reward, unlocked_at FROM achievements WHERE user_id = ",
        );
        builder.push_bind(user_id.to_string());
        builder.push(" AND achievement_id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(") ORDER BY unlocked_at, achievement_id");

        let rows: Vec<AchievementRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Achievement::from).collect())
    }
}

impl SyncCollection for AchievementRepository {
    type Record = AchievementRecord;
    const GROUP: SyncGroup = SyncGroup::Achievements;

    fn natural_key(record: &AchievementRecord) -> String {
        record.achievement_id.clone()
    }

    /// `unlocked_at` is written once; a re-submission only refreshes the reward.
    async fn upsert_row(
        conn: &mut SqliteConnection,
        user_id: &str,
        record: &AchievementRecord,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO achievements (user_id, achievement_id, xp_reward, unlocked_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, achievement_id) DO UPDATE SET xp_reward = excluded.xp_reward
            "#,
        )
        .bind(user_id)
        .bind(&record.achievement_id)
        .bind(record.xp_reward)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn stored_keys(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT achievement_id FROM achievements WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn delete_row(conn: &mut SqliteConnection, user_id: &str, key: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM achievements WHERE user_id = ? AND achievement_id = ?")
            .bind(user_id)
            .bind(key)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, setup};

    #[tokio::test]
    async fn test_resubmission_keeps_unlock_time() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "a@example.com").await;
        let mut conn = ctx.store.pool().acquire().await.unwrap();

        AchievementRepository::upsert_row(&mut conn, &user.id, &AchievementRecord::new("first_fajr", 10))
            .await
            .unwrap();
        let first = ctx.store.achievements.list(&user.id).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        AchievementRepository::upsert_row(&mut conn, &user.id, &AchievementRecord::new("first_fajr", 25))
            .await
            .unwrap();
        let second = ctx.store.achievements.list(&user.id).await.unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].unlocked_at, first[0].unlocked_at);
        assert_eq!(second[0].xp_reward, 25);
    }

    #[tokio::test]
    async fn test_list_ids_filters() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "b@example.com").await;
        let mut conn = ctx.store.pool().acquire().await.unwrap();

        for id in ["a", "b", "c"] {
            AchievementRepository::upsert_row(&mut conn, &user.id, &AchievementRecord::new(id, 0))
                .await
                .unwrap();
        }
        drop(conn);

        let picked = ctx
            .store
            .achievements
            .list_ids(&user.id, &["a".to_string(), "c".to_string(), "zzz".to_string()])
            .await
            .unwrap();
        let ids: Vec<&str> = picked.iter().map(|a| a.achievement_id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"c"));

        let none = ctx.store.achievements.list_ids(&user.id, &[]).await.unwrap();
        assert!(none.is_empty());

        let other = seed_user(&ctx.store, "other@example.com").await;
        let foreign = ctx
            .store
            .achievements
            .list_ids(&other.id, &["a".to_string()])
            .await
            .unwrap();
        assert!(foreign.is_empty());
    }
}
