use amal_core::{Challenge, ChallengeRecord, SyncGroup};
use sqlx::{SqliteConnection, SqlitePool};

use super::parse_timestamp;
use crate::engine::SyncCollection;

#[derive(Clone)]
pub struct ChallengeRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ChallengeRow {
    id: String,
    frontend_id: Option<String>,
    title: String,
    category: String,
    base_xp: i64,
    icon: String,
    created_at: String,
}

impl From<ChallengeRow> for Challenge {
    fn from(row: ChallengeRow) -> Self {
        Challenge {
            id: row.id,
            frontend_id: row.frontend_id,
            title: row.title,
            category: row.category,
            base_xp: row.base_xp,
            icon: row.icon,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

impl ChallengeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creation order; rowid breaks ties between rows created in the same instant.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Challenge>, sqlx::Error> {
        let rows: Vec<ChallengeRow> = sqlx::query_as(
            r#"
            SELECT id, frontend_id, title, category, base_xp, icon, created_at
            FROM active_challenges
            WHERE user_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Challenge::from).collect())
    }

    pub async fn get_by_frontend_id(
        &self,
        user_id: &str,
        frontend_id: &str,
    ) -> Result<Option<Challenge>, sqlx::Error> {
        let row: Option<ChallengeRow> = sqlx::query_as(
            r#"
            SELECT id, frontend_id, title, category, base_xp, icon, created_at
            FROM active_challenges
            WHERE user_id = ? AND frontend_id = ?
            "#,
        )
        .bind(user_id)
        .bind(frontend_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Challenge::from))
    }

    pub async fn create(&self, user_id: &str, challenge: &Challenge) -> Result<Challenge, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO active_challenges (id, user_id, frontend_id, title, category, base_xp, icon, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&challenge.id)
        .bind(user_id)
        .bind(&challenge.frontend_id)
        .bind(&challenge.title)
        .bind(&challenge.category)
        .bind(challenge.base_xp)
        .bind(&challenge.icon)
        .bind(challenge.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let row: ChallengeRow = sqlx::query_as(
            "SELECT id, frontend_id, title, category, base_xp, icon, created_at FROM active_challenges WHERE id = ?",
        )
        .bind(&challenge.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Returns the number of rows removed.
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM active_challenges WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_frontend_id(
        &self,
        user_id: &str,
        frontend_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_row(&mut conn, user_id, frontend_id).await
    }
}

impl SyncCollection for ChallengeRepository {
    type Record = ChallengeRecord;
    const GROUP: SyncGroup = SyncGroup::Challenges;

    fn natural_key(record: &ChallengeRecord) -> String {
        record.frontend_id.clone()
    }

    async fn upsert_row(
        conn: &mut SqliteConnection,
        user_id: &str,
        record: &ChallengeRecord,
    ) -> Result<(), sqlx::Error> {
        // id and created_at only apply to a first insert
        let fresh = Challenge::from_record(record);
        sqlx::query(
            r#"
            INSERT INTO active_challenges (id, user_id, frontend_id, title, category, base_xp, icon, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, frontend_id) DO UPDATE SET
                title = excluded.title,
                category = excluded.category,
                base_xp = excluded.base_xp,
                icon = excluded.icon
            "#,
        )
        .bind(&fresh.id)
        .bind(user_id)
        .bind(&record.frontend_id)
        .bind(&record.title)
        .bind(&record.category)
        .bind(record.base_xp)
        .bind(&record.icon)
        .bind(fresh.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Rows without a client id have no natural key and are never listed.
    async fn stored_keys(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT frontend_id FROM active_challenges WHERE user_id = ? AND frontend_id IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn delete_row(conn: &mut SqliteConnection, user_id: &str, key: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM active_challenges WHERE user_id = ? AND frontend_id = ?")
            .bind(user_id)
            .bind(key)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
