//! Fixed-window task and prayer statistics.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::coerce::{parse_date_key, round_half_up, to_number};
use crate::models::{CompletedDay, Prayer, PrayerDay, PrayerStatus};
use crate::streak::Streaks;

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
pub const MAX_WINDOW_DAYS: u32 = 30;

/// Window length from a raw query value, clamped to `1..=30`.
pub fn clamp_window_days(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_WINDOW_DAYS;
    };
    let number = to_number(&Value::String(raw.to_string()));
    if !number.is_finite() {
        return DEFAULT_WINDOW_DAYS;
    }
    round_half_up(number).clamp(1.0, MAX_WINDOW_DAYS as f64) as u32
}

/// Window end from a raw query value; anything malformed means `today`.
pub fn resolve_end(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    raw.and_then(parse_date_key).unwrap_or(today)
}

/// An inclusive run of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: u32,
}

impl DateRange {
    /// The `days` calendar days ending at `end`, inclusive.
    pub fn ending_at(end: NaiveDate, days: u32) -> Self {
        let days = days.max(1);
        let start = end
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end, days }
    }

    /// Every date in the range, oldest first.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take(self.days as usize).collect()
    }
}

/// Derived metrics for one day of the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStats {
    pub date: NaiveDate,
    pub task_count: u32,
    pub task_done: bool,
    pub goal_hit: bool,
    pub challenge_ids: Vec<String>,
    pub fajr: PrayerStatus,
    pub dhuhr: PrayerStatus,
    pub asr: PrayerStatus,
    pub maghrib: PrayerStatus,
    pub isha: PrayerStatus,
    pub prayer_tracked: u32,
    pub prayer_positive: u32,
    pub prayer_qaza: u32,
    pub prayer_missed: u32,
    pub prayer_perfect: bool,
    pub prayer_score_percent: u32,
}

impl DayStats {
    pub fn compute(
        date: NaiveDate,
        completed: Option<&CompletedDay>,
        prayers: Option<&PrayerDay>,
        daily_goal: i64,
    ) -> Self {
        let challenge_ids: Vec<String> = completed
            .map(|day| day.challenge_ids.iter().cloned().collect())
            .unwrap_or_default();
        let task_count = challenge_ids.len() as u32;

        let prayers = prayers
            .cloned()
            .unwrap_or_else(|| PrayerDay::pending(date));
        let statuses = prayers.statuses();
        let count = |pred: fn(&PrayerStatus) -> bool| statuses.iter().filter(|s| pred(s)).count() as u32;

        let prayer_positive = count(PrayerStatus::is_positive);
        let total = Prayer::ALL.len() as u32;

        Self {
            date,
            task_count,
            task_done: task_count > 0,
            goal_hit: i64::from(task_count) >= daily_goal.max(1),
            challenge_ids,
            fajr: prayers.fajr,
            dhuhr: prayers.dhuhr,
            asr: prayers.asr,
            maghrib: prayers.maghrib,
            isha: prayers.isha,
            prayer_tracked: count(PrayerStatus::is_tracked),
            prayer_positive,
            prayer_qaza: count(|s| *s == PrayerStatus::Qaza),
            prayer_missed: count(|s| *s == PrayerStatus::Missed),
            prayer_perfect: prayer_positive == total,
            prayer_score_percent: percent(prayer_positive, total),
        }
    }
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    round_half_up(f64::from(part) / f64::from(whole) * 100.0) as u32
}

/// Window-level totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub total_days: u32,
    pub active_task_days: u32,
    pub total_tasks: u32,
    pub goal_hit_days: u32,
    pub prayer_tracked_total: u32,
    pub prayer_positive_total: u32,
    pub prayer_qaza_total: u32,
    pub prayer_missed_total: u32,
    pub prayer_perfect_days: u32,
    pub prayer_discipline_percent: u32,
    pub task_streak_current: u32,
    pub task_streak_best: u32,
    pub prayer_streak_current: u32,
    pub prayer_streak_best: u32,
}

impl WindowSummary {
    /// Aggregates per-day stats given oldest first.
    pub fn from_daily(daily: &[DayStats]) -> Self {
        let total_days = daily.len() as u32;
        let days_where = |pred: fn(&DayStats) -> bool| daily.iter().filter(|d| pred(d)).count() as u32;
        let sum = |field: fn(&DayStats) -> u32| daily.iter().map(field).sum::<u32>();

        let task_flags: Vec<bool> = daily.iter().map(|d| d.task_done).collect();
        let prayer_flags: Vec<bool> = daily.iter().map(|d| d.prayer_perfect).collect();
        let task_streaks = Streaks::from_chronological(&task_flags);
        let prayer_streaks = Streaks::from_chronological(&prayer_flags);

        let prayer_positive_total = sum(|d| d.prayer_positive);

        Self {
            total_days,
            active_task_days: days_where(|d| d.task_done),
            total_tasks: sum(|d| d.task_count),
            goal_hit_days: days_where(|d| d.goal_hit),
            prayer_tracked_total: sum(|d| d.prayer_tracked),
            prayer_positive_total,
            prayer_qaza_total: sum(|d| d.prayer_qaza),
            prayer_missed_total: sum(|d| d.prayer_missed),
            prayer_perfect_days: days_where(|d| d.prayer_perfect),
            prayer_discipline_percent: percent(
                prayer_positive_total,
                total_days * Prayer::ALL.len() as u32,
            ),
            task_streak_current: task_streaks.current,
            task_streak_best: task_streaks.best,
            prayer_streak_current: prayer_streaks.current,
            prayer_streak_best: prayer_streaks.best,
        }
    }
}

/// Joins stored rows onto every date of `range`, including empty days.
pub fn build_daily(
    range: &DateRange,
    daily_goal: i64,
    completed: &[CompletedDay],
    prayers: &[PrayerDay],
) -> Vec<DayStats> {
    let completed_by_date: HashMap<NaiveDate, &CompletedDay> =
        completed.iter().map(|day| (day.date, day)).collect();
    let prayers_by_date: HashMap<NaiveDate, &PrayerDay> =
        prayers.iter().map(|day| (day.date, day)).collect();

    range
        .dates()
        .into_iter()
        .map(|date| {
            DayStats::compute(
                date,
                completed_by_date.get(&date).copied(),
                prayers_by_date.get(&date).copied(),
                daily_goal,
            )
        })
        .collect()
}
