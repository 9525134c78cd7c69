use amal_core::{DateRange, Streaks};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

use crate::db::Store;

pub const DEFAULT_STREAK_WINDOW_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakReport {
    pub current: u32,
    pub best: u32,
    pub window_days: u32,
    pub end: NaiveDate,
}

impl StreakReport {
    fn over(range: &DateRange, qualifying: &HashSet<NaiveDate>) -> Self {
        let flags: Vec<bool> = range
            .dates()
            .iter()
            .map(|date| qualifying.contains(date))
            .collect();
        let streaks = Streaks::from_chronological(&flags);
        Self {
            current: streaks.current,
            best: streaks.best,
            window_days: range.days,
            end: range.end,
        }
    }
}

/// Task and prayer streaks over a trailing window that ends at a given day.
/// Days with no stored row count as not qualifying.
#[derive(Clone)]
pub struct StreakCalculator {
    store: Store,
    window_days: u32,
}

impl StreakCalculator {
    pub fn new(store: Store, window_days: u32) -> Self {
        Self {
            store,
            window_days: window_days.max(1),
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// A task day has at least one completed challenge.
    pub async fn task_streak(&self, user_id: &str, end: NaiveDate) -> Result<StreakReport, sqlx::Error> {
        let range = DateRange::ending_at(end, self.window_days);
        let days = self
            .store
            .completed_days
            .list_range(user_id, range.start, range.end)
            .await?;
        let qualifying: HashSet<NaiveDate> = days
            .iter()
            .filter(|day| day.has_tasks())
            .map(|day| day.date)
            .collect();
        Ok(StreakReport::over(&range, &qualifying))
    }

    /// A prayer day has all five prayers on time or in congregation.
    pub async fn prayer_streak(&self, user_id: &str, end: NaiveDate) -> Result<StreakReport, sqlx::Error> {
        let range = DateRange::ending_at(end, self.window_days);
        let days = self
            .store
            .prayer_log
            .list_range(user_id, range.start, range.end)
            .await?;
        let qualifying: HashSet<NaiveDate> = days
            .iter()
            .filter(|day| day.is_perfect())
            .map(|day| day.date)
            .collect();
        Ok(StreakReport::over(&range, &qualifying))
    }

    pub async fn both(
        &self,
        user_id: &str,
        end: NaiveDate,
    ) -> Result<(StreakReport, StreakReport), sqlx::Error> {
        futures::try_join!(self.task_streak(user_id, end), self.prayer_streak(user_id, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, setup};
    use amal_core::coerce::parse_date_key;
    use amal_core::{CompletedDay, PrayerDay};
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        parse_date_key(s).unwrap()
    }

    #[tokio::test]
    async fn test_task_streak_with_gap() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "streak@example.com").await;

        // T T F T ending at 2024-03-10
        for key in ["2024-03-07", "2024-03-08", "2024-03-10"] {
            ctx.store
                .completed_days
                .upsert(&user.id, &CompletedDay::new(date(key)).with_challenges(["a"]))
                .await
                .unwrap();
        }
        // a stored day without tasks does not qualify
        ctx.store
            .completed_days
            .upsert(&user.id, &CompletedDay::new(date("2024-03-09")))
            .await
            .unwrap();

        let calculator = StreakCalculator::new(ctx.store.clone(), 90);
        let report = calculator.task_streak(&user.id, date("2024-03-10")).await.unwrap();
        assert_eq!(report.current, 1);
        assert_eq!(report.best, 2);
        assert_eq!(report.window_days, 90);

        // anchored at the window end: nothing on 2024-03-11 yet
        let next_day = calculator.task_streak(&user.id, date("2024-03-11")).await.unwrap();
        assert_eq!(next_day.current, 0);
        assert_eq!(next_day.best, 2);
    }

    #[tokio::test]
    async fn test_window_limits_history() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "window@example.com").await;

        for key in ["2024-03-06", "2024-03-07", "2024-03-08", "2024-03-09", "2024-03-10"] {
            ctx.store
                .completed_days
                .upsert(&user.id, &CompletedDay::new(date(key)).with_challenges(["a"]))
                .await
                .unwrap();
        }

        let calculator = StreakCalculator::new(ctx.store.clone(), 3);
        let report = calculator.task_streak(&user.id, date("2024-03-10")).await.unwrap();
        assert_eq!(report.current, 3);
        assert_eq!(report.best, 3);
    }

    #[tokio::test]
    async fn test_prayer_streak_needs_perfect_days() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "prayer@example.com").await;
        let perfect = json!({"fajr": "jamaat", "dhuhr": "on_time", "asr": "on_time", "maghrib": "late", "isha": "jamaat"});
        let partial = json!({"fajr": "qaza", "dhuhr": "on_time", "asr": "on_time", "maghrib": "on_time", "isha": "on_time"});

        for (key, payload) in [
            ("2024-03-08", &perfect),
            ("2024-03-09", &partial),
            ("2024-03-10", &perfect),
        ] {
            ctx.store
                .prayer_log
                .upsert(&user.id, &PrayerDay::from_payload(date(key), payload))
                .await
                .unwrap();
        }

        let calculator = StreakCalculator::new(ctx.store.clone(), 90);
        let (tasks, prayers) = calculator.both(&user.id, date("2024-03-10")).await.unwrap();
        assert_eq!(tasks.current, 0);
        assert_eq!(prayers.current, 1);
        assert_eq!(prayers.best, 1);
    }
}
