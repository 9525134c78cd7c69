//! Per-collection upsert and replace.

use amal_core::{SyncGroup, SyncMode};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use std::future::Future;

use crate::error::ReconcileError;

/// A table that can be reconciled against a client submission.
///
/// Every statement is owner-scoped and runs on the connection of the
/// surrounding group transaction.
pub trait SyncCollection {
    type Record: Send + Sync;
    const GROUP: SyncGroup;

    fn natural_key(record: &Self::Record) -> String;

    fn upsert_row(
        conn: &mut SqliteConnection,
        user_id: &str,
        record: &Self::Record,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn stored_keys(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, sqlx::Error>> + Send;

    fn delete_row(
        conn: &mut SqliteConnection,
        user_id: &str,
        key: &str,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub upserted: usize,
    pub removed: u64,
}

#[derive(Clone)]
pub struct Reconciler {
    pool: SqlitePool,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts `records`; in replace mode also deletes stored rows whose key
    /// is not among them. Both steps commit or roll back together.
    pub async fn reconcile<C: SyncCollection>(
        &self,
        user_id: &str,
        records: &[C::Record],
        mode: SyncMode,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.run::<C>(user_id, records, mode)
            .await
            .map_err(|source| ReconcileError::new(C::GROUP, source))
    }

    async fn run<C: SyncCollection>(
        &self,
        user_id: &str,
        records: &[C::Record],
        mode: SyncMode,
    ) -> Result<ReconcileOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            C::upsert_row(&mut *tx, user_id, record).await?;
        }

        let mut removed = 0;
        if mode == SyncMode::Replace {
            let keep: HashSet<String> = records.iter().map(C::natural_key).collect();
            let stored = C::stored_keys(&mut *tx, user_id).await?;
            for key in stored.iter().filter(|key| !keep.contains(*key)) {
                removed += C::delete_row(&mut *tx, user_id, key).await?;
            }
        }

        tx.commit().await?;

        Ok(ReconcileOutcome {
            upserted: records.len(),
            removed,
        })
    }
}
