use amal_core::{CompletedDay, SyncGroup};
use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeSet;

use super::{decode_date, decode_json};
use crate::engine::SyncCollection;

#[derive(Clone)]
pub struct CompletedDayRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct CompletedDayRow {
    date: String,
    challenge_ids: String,
    total_xp: i64,
}

impl TryFrom<CompletedDayRow> for CompletedDay {
    type Error = sqlx::Error;

    fn try_from(row: CompletedDayRow) -> Result<Self, Self::Error> {
        let challenge_ids: BTreeSet<String> = decode_json("challenge_ids", &row.challenge_ids)?;
        Ok(CompletedDay {
            date: decode_date(&row.date)?,
            challenge_ids,
            total_xp: row.total_xp,
        })
    }
}

fn collect(rows: Vec<CompletedDayRow>) -> Result<Vec<CompletedDay>, sqlx::Error> {
    rows.into_iter().map(CompletedDay::try_from).collect()
}

impl CompletedDayRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every completed day, oldest first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<CompletedDay>, sqlx::Error> {
        let rows: Vec<CompletedDayRow> = sqlx::query_as(
            "SELECT date, challenge_ids, total_xp FROM completed_days WHERE user_id = ? ORDER BY date",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    /// Days in `[from, to]`, oldest first.
    pub async fn list_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CompletedDay>, sqlx::Error> {
        let rows: Vec<CompletedDayRow> = sqlx::query_as(
            r#"
            SELECT date, challenge_ids, total_xp FROM completed_days
            WHERE user_id = ? AND date >= ? AND date <= ?
            ORDER BY date
            "#,
        )
        .bind(user_id)
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    /// The `limit` most recent days, newest first.
    pub async fn recent(&self, user_id: &str, limit: u32) -> Result<Vec<CompletedDay>, sqlx::Error> {
        let rows: Vec<CompletedDayRow> = sqlx::query_as(
            "SELECT date, challenge_ids, total_xp FROM completed_days WHERE user_id = ? ORDER BY date DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    pub async fn get(&self, user_id: &str, date: NaiveDate) -> Result<Option<CompletedDay>, sqlx::Error> {
        let row: Option<CompletedDayRow> = sqlx::query_as(
            "SELECT date, challenge_ids, total_xp FROM completed_days WHERE user_id = ? AND date = ?",
        )
        .bind(user_id)
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CompletedDay::try_from).transpose()
    }

    pub async fn upsert(&self, user_id: &str, day: &CompletedDay) -> Result<CompletedDay, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_row(&mut conn, user_id, day).await?;
        drop(conn);

        self.get(user_id, day.date)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(&self, user_id: &str, date: NaiveDate) -> Result<u64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_row(&mut conn, user_id, &date.to_string()).await
    }
}

impl SyncCollection for CompletedDayRepository {
    type Record = CompletedDay;
    const GROUP: SyncGroup = SyncGroup::CompletedDays;

    fn natural_key(record: &CompletedDay) -> String {
        record.date.to_string()
    }

    async fn upsert_row(
        conn: &mut SqliteConnection,
        user_id: &str,
        record: &CompletedDay,
    ) -> Result<(), sqlx::Error> {
        let challenge_ids =
            serde_json::to_string(&record.challenge_ids).unwrap_or_else(|_| "[]".to_string());
        sqlx::query(
            r#"
            INSERT INTO completed_days (user_id, date, challenge_ids, total_xp)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, date) DO UPDATE SET
                challenge_ids = excluded.challenge_ids,
                total_xp = excluded.total_xp
            "#,
        )
        .bind(user_id)
        .bind(record.date.to_string())
        .bind(&challenge_ids)
        .bind(record.total_xp)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn stored_keys(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT date FROM completed_days WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn delete_row(conn: &mut SqliteConnection, user_id: &str, key: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM completed_days WHERE user_id = ? AND date = ?")
            .bind(user_id)
            .bind(key)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
