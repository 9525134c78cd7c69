use amal_core::{Prayer, PrayerDay, PrayerStatus, SyncGroup};
use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use super::decode_date;
use crate::engine::SyncCollection;

#[derive(Clone)]
pub struct PrayerLogRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct PrayerRow {
    date: String,
    fajr: String,
    dhuhr: String,
    asr: String,
    maghrib: String,
    isha: String,
}

impl TryFrom<PrayerRow> for PrayerDay {
    type Error = sqlx::Error;

    fn try_from(row: PrayerRow) -> Result<Self, Self::Error> {
        Ok(PrayerDay {
            date: decode_date(&row.date)?,
            fajr: PrayerStatus::normalize(&row.fajr),
            dhuhr: PrayerStatus::normalize(&row.dhuhr),
            asr: PrayerStatus::normalize(&row.asr),
            maghrib: PrayerStatus::normalize(&row.maghrib),
            isha: PrayerStatus::normalize(&row.isha),
        })
    }
}

fn collect(rows: Vec<PrayerRow>) -> Result<Vec<PrayerDay>, sqlx::Error> {
    rows.into_iter().map(PrayerDay::try_from).collect()
}

impl PrayerLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<PrayerDay>, sqlx::Error> {
        let rows: Vec<PrayerRow> = sqlx::query_as(
            "SELECT date, fajr, dhuhr, asr, maghrib, isha FROM prayer_log WHERE user_id = ? ORDER BY date",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    pub async fn list_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PrayerDay>, sqlx::Error> {
        let rows: Vec<PrayerRow> = sqlx::query_as(
            r#"
            SELECT date, fajr, dhuhr, asr, maghrib, isha FROM prayer_log
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

    pub async fn get(&self, user_id: &str, date: NaiveDate) -> Result<Option<PrayerDay>, sqlx::Error> {
        let row: Option<PrayerRow> = sqlx::query_as(
            "SELECT date, fajr, dhuhr, asr, maghrib, isha FROM prayer_log WHERE user_id = ? AND date = ?",
        )
        .bind(user_id)
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PrayerDay::try_from).transpose()
    }

    pub async fn upsert(&self, user_id: &str, day: &PrayerDay) -> Result<PrayerDay, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_row(&mut conn, user_id, day).await?;
        drop(conn);

        self.get(user_id, day.date)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Sets one prayer's status. A new row starts with the other four pending.
    pub async fn set_status(
        &self,
        user_id: &str,
        date: NaiveDate,
        prayer: Prayer,
        status: PrayerStatus,
    ) -> Result<PrayerDay, sqlx::Error> {
        let column = prayer.as_str();
        sqlx::query(&format!(
            r#"
            INSERT INTO prayer_log (user_id, date, {column}) VALUES (?, ?, ?)
            ON CONFLICT(user_id, date) DO UPDATE SET {column} = excluded.{column}
            "#
        ))
        .bind(user_id)
        .bind(date.to_string())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        self.get(user_id, date)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}

impl SyncCollection for PrayerLogRepository {
    type Record = PrayerDay;
    const GROUP: SyncGroup = SyncGroup::PrayerLog;

    fn natural_key(record: &PrayerDay) -> String {
        record.date.to_string()
    }

    async fn upsert_row(
        conn: &mut SqliteConnection,
        user_id: &str,
        record: &PrayerDay,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO prayer_log (user_id, date, fajr, dhuhr, asr, maghrib, isha)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, date) DO UPDATE SET
                fajr = excluded.fajr,
                dhuhr = excluded.dhuhr,
                asr = excluded.asr,
                maghrib = excluded.maghrib,
                isha = excluded.isha
            "#,
        )
        .bind(user_id)
        .bind(record.date.to_string())
        .bind(record.fajr.as_str())
        .bind(record.dhuhr.as_str())
        .bind(record.asr.as_str())
        .bind(record.maghrib.as_str())
        .bind(record.isha.as_str())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn stored_keys(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT date FROM prayer_log WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn delete_row(conn: &mut SqliteConnection, user_id: &str, key: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM prayer_log WHERE user_id = ? AND date = ?")
            .bind(user_id)
            .bind(key)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
