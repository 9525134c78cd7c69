//! Bulk sync: normalize a client upload, then reconcile it group by group.

use amal_core::{ProfilePatch, SyncGroup, SyncMode, SyncRequest};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::reconcile::{Reconciler, SyncCollection};
use crate::db::{
    AchievementRepository, ChallengeRepository, CompletedDayRepository, PrayerLogRepository, Store,
};
use crate::error::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFailure {
    pub group: SyncGroup,
    pub error: String,
}

/// Per-group results of one sync. Failed groups are listed in `failed`
/// and count zero; the groups before and after them are unaffected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub profile_updated: bool,
    pub challenges_synced: usize,
    pub completed_days_synced: usize,
    pub prayer_days_synced: usize,
    pub achievements_synced: usize,
    /// Rows deleted per group in replace mode.
    pub removed: BTreeMap<&'static str, u64>,
    pub failed: Vec<GroupFailure>,
}

impl SyncReport {
    fn record_failure(&mut self, err: ReconcileError) {
        warn!(group = %err.group, error = %err.source, "sync group failed");
        self.failed.push(GroupFailure {
            group: err.group,
            error: err.public_message(),
        });
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    store: Store,
    reconciler: Reconciler,
}

impl SyncEngine {
    pub fn new(store: Store) -> Self {
        let reconciler = Reconciler::new(store.pool().clone());
        Self { store, reconciler }
    }

    /// Applies every present group in order: profile, challenges,
    /// completed days, prayer log, achievements.
    pub async fn sync(&self, user_id: &str, request: &SyncRequest) -> SyncReport {
        let normalized = request.normalize();
        let mode = normalized.mode;
        let mut report = SyncReport::default();

        if let Some(patch) = &normalized.profile {
            match self.apply_profile(user_id, patch).await {
                Ok(updated) => report.profile_updated = updated,
                Err(err) => report.record_failure(err),
            }
        }

        let synced = self
            .reconcile_group::<ChallengeRepository>(user_id, normalized.challenges.as_deref(), mode, &mut report)
            .await;
        report.challenges_synced = synced;

        let synced = self
            .reconcile_group::<CompletedDayRepository>(
                user_id,
                normalized.completed_days.as_deref(),
                mode,
                &mut report,
            )
            .await;
        report.completed_days_synced = synced;

        let synced = self
            .reconcile_group::<PrayerLogRepository>(user_id, normalized.prayer_log.as_deref(), mode, &mut report)
            .await;
        report.prayer_days_synced = synced;

        let synced = self
            .reconcile_group::<AchievementRepository>(
                user_id,
                normalized.achievements.as_deref(),
                mode,
                &mut report,
            )
            .await;
        report.achievements_synced = synced;

        info!(
            user_id,
            ?mode,
            challenges = report.challenges_synced,
            completed_days = report.completed_days_synced,
            prayer_days = report.prayer_days_synced,
            achievements = report.achievements_synced,
            failed = report.failed.len(),
            "sync finished"
        );

        report
    }

    /// An empty patch is a no-op and reports false.
    async fn apply_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<bool, ReconcileError> {
        if patch.is_empty() {
            return Ok(false);
        }
        let found = self
            .store
            .profiles
            .apply_patch(user_id, patch)
            .await
            .map_err(|e| ReconcileError::new(SyncGroup::Profile, e))?;
        if !found {
            return Err(ReconcileError::new(SyncGroup::Profile, sqlx::Error::RowNotFound));
        }
        Ok(true)
    }

    async fn reconcile_group<C: SyncCollection>(
        &self,
        user_id: &str,
        records: Option<&[C::Record]>,
        mode: SyncMode,
        report: &mut SyncReport,
    ) -> usize {
        let Some(records) = records else {
            return 0;
        };

        match self.reconciler.reconcile::<C>(user_id, records, mode).await {
            Ok(outcome) => {
                debug!(
                    group = %C::GROUP,
                    upserted = outcome.upserted,
                    removed = outcome.removed,
                    "group reconciled"
                );
                if mode == SyncMode::Replace {
                    report.removed.insert(C::GROUP.as_str(), outcome.removed);
                }
                outcome.upserted
            }
            Err(err) => {
                report.record_failure(err);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, setup};
    use serde_json::json;

    fn request(body: serde_json::Value) -> SyncRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_sync_all_groups() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "sync@example.com").await;
        let engine = SyncEngine::new(ctx.store.clone());

        let report = engine
            .sync(
                &user.id,
                &request(json!({
                    "profile": {"xp": "12.7", "daily_goal": 0, "onboarded": 1},
                    "challenges": [
                        {"id": "c1", "title": "Read Quran", "base_xp": -5},
                        {"id": "c1", "title": "Duplicate"},
                        {"title": "No id"}
                    ],
                    "completed_days": {"2024-03-10": ["c1", "c1"], "2024-02-30": ["c1"]},
                    "prayer_log": [{"date": "2024-03-10", "fajr": "late", "isha": "skipped"}],
                    "achievements": ["first_fajr", {"achievement_id": "streak_7", "xpBonus": 30}]
                })),
            )
            .await;

        assert!(report.profile_updated);
        assert_eq!(report.challenges_synced, 1);
        assert_eq!(report.completed_days_synced, 1);
        assert_eq!(report.prayer_days_synced, 1);
        assert_eq!(report.achievements_synced, 2);
        assert!(report.failed.is_empty());
        assert!(report.removed.is_empty());

        let profile = ctx.store.profiles.get(&user.id).await.unwrap().unwrap();
        assert_eq!(profile.xp, 13);
        assert_eq!(profile.daily_goal, 1);
        assert!(profile.onboarded);

        let challenges = ctx.store.challenges.list(&user.id).await.unwrap();
        assert_eq!(challenges[0].title, "Read Quran");
        assert_eq!(challenges[0].base_xp, 0);

        let prayers = ctx.store.prayer_log.list(&user.id).await.unwrap();
        assert_eq!(prayers[0].fajr.as_str(), "on_time");
        assert_eq!(prayers[0].isha.as_str(), "missed");
        assert_eq!(prayers[0].dhuhr.as_str(), "pending");
    }

    #[tokio::test]
    async fn test_absent_group_survives_replace() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "absent@example.com").await;
        let engine = SyncEngine::new(ctx.store.clone());

        engine
            .sync(
                &user.id,
                &request(json!({
                    "completed_days": [{"date": "2024-03-10", "challenge_ids": ["a"]}],
                    "achievements": ["first_fajr"]
                })),
            )
            .await;

        let report = engine
            .sync(
                &user.id,
                &request(json!({"achievements": [], "completed_days": null, "replace": true})),
            )
            .await;

        assert_eq!(report.removed.get("achievements"), Some(&1));
        assert!(!report.removed.contains_key("completed_days"));
        assert!(ctx.store.achievements.list(&user.id).await.unwrap().is_empty());
        assert_eq!(ctx.store.completed_days.list(&user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_group() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "iso@example.com").await;
        let engine = SyncEngine::new(ctx.store.clone());

        sqlx::query(
            "CREATE TRIGGER reject_prayers BEFORE INSERT ON prayer_log BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .execute(ctx.store.pool())
        .await
        .unwrap();

        let report = engine
            .sync(
                &user.id,
                &request(json!({
                    "challenges": [{"id": "c1", "title": "Read"}],
                    "prayer_log": {"2024-03-10": {"fajr": "jamaat"}},
                    "achievements": ["a1"]
                })),
            )
            .await;

        assert_eq!(
            report.failed,
            vec![GroupFailure {
                group: SyncGroup::PrayerLog,
                error: "failed to sync prayer_log".to_string()
            }]
        );
        assert_eq!(report.prayer_days_synced, 0);
        assert_eq!(report.challenges_synced, 1);
        assert_eq!(report.achievements_synced, 1);
        assert_eq!(ctx.store.challenges.list(&user.id).await.unwrap().len(), 1);
        assert_eq!(ctx.store.achievements.list(&user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_profile_reported() {
        let ctx = setup().await;
        let engine = SyncEngine::new(ctx.store.clone());

        let report = engine
            .sync("ghost", &request(json!({"profile": {"name": "Nobody"}})))
            .await;

        assert!(!report.profile_updated);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].error, "profile not found");
    }

    #[tokio::test]
    async fn test_empty_profile_patch_is_noop() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "noop@example.com").await;
        let engine = SyncEngine::new(ctx.store.clone());

        let report = engine
            .sync(&user.id, &request(json!({"profile": {"app_state": [1, 2]}})))
            .await;

        assert!(!report.profile_updated);
        assert!(report.failed.is_empty());
    }
}
