use amal_core::stats::{build_daily, clamp_window_days, resolve_end};
use amal_core::{DateRange, DayStats, WindowSummary};
use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Store;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileTotals {
    pub xp: i64,
    pub streak: i64,
    pub daily_goal: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyStats {
    pub range: DateRange,
    pub profile: ProfileTotals,
    pub summary: WindowSummary,
    pub daily: Vec<DayStats>,
}

#[derive(Clone)]
pub struct StatsAggregator {
    store: Store,
}

impl StatsAggregator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Window statistics from raw `end` and `days` query values.
    /// Malformed values fall back to `today` and seven days.
    pub async fn weekly(
        &self,
        user_id: &str,
        end: Option<&str>,
        days: Option<&str>,
        today: NaiveDate,
    ) -> Result<WeeklyStats, AppError> {
        let range = DateRange::ending_at(resolve_end(end, today), clamp_window_days(days));

        let (profile, completed, prayers) = futures::try_join!(
            self.store.profiles.get(user_id),
            self.store
                .completed_days
                .list_range(user_id, range.start, range.end),
            self.store.prayer_log.list_range(user_id, range.start, range.end),
        )?;
        let profile = profile.ok_or_else(|| AppError::not_found("profile"))?;
        let daily_goal = profile.effective_daily_goal();

        let daily = build_daily(&range, daily_goal, &completed, &prayers);
        let summary = WindowSummary::from_daily(&daily);

        Ok(WeeklyStats {
            range,
            profile: ProfileTotals {
                xp: profile.xp,
                streak: profile.streak,
                daily_goal,
            },
            summary,
            daily,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, setup};
    use crate::engine::SyncEngine;
    use amal_core::coerce::parse_date_key;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        parse_date_key(s).unwrap()
    }

    #[tokio::test]
    async fn test_daily_goal_scenario() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "goal@example.com").await;
        let stats = StatsAggregator::new(ctx.store.clone());
        let today = date("2024-03-10");

        let empty = stats.weekly(&user.id, None, None, today).await.unwrap();
        assert_eq!(empty.profile.daily_goal, 3);
        assert_eq!(empty.summary.total_days, 7);
        assert_eq!(empty.summary.active_task_days, 0);
        assert_eq!(empty.summary.goal_hit_days, 0);
        assert_eq!(empty.daily.len(), 7);

        let request = serde_json::from_value(json!({
            "completed_days": [{"date": "2024-03-10", "challenge_ids": ["a", "b"]}]
        }))
        .unwrap();
        SyncEngine::new(ctx.store.clone()).sync(&user.id, &request).await;

        let after = stats.weekly(&user.id, None, None, today).await.unwrap();
        assert_eq!(after.summary.active_task_days, 1);
        assert_eq!(after.summary.total_tasks, 2);
        assert_eq!(after.summary.goal_hit_days, 0);
        let last = after.daily.last().unwrap();
        assert_eq!(last.date, today);
        assert!(last.task_done);
        assert!(!last.goal_hit);
    }

    #[tokio::test]
    async fn test_query_values_are_clamped() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "clamp@example.com").await;
        let stats = StatsAggregator::new(ctx.store.clone());
        let today = date("2025-01-15");

        let wide = stats
            .weekly(&user.id, Some("2024-03-10"), Some("45"), today)
            .await
            .unwrap();
        assert_eq!(wide.range.days, 30);
        assert_eq!(wide.range.end, date("2024-03-10"));

        let narrow = stats
            .weekly(&user.id, Some("not-a-date"), Some("0"), today)
            .await
            .unwrap();
        assert_eq!(narrow.range.days, 1);
        assert_eq!(narrow.range.start, today);
    }

    #[tokio::test]
    async fn test_missing_profile() {
        let ctx = setup().await;
        let stats = StatsAggregator::new(ctx.store.clone());
        let result = stats.weekly("ghost", None, None, date("2024-03-10")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
