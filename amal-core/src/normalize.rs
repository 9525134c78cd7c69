//! Turns client payloads into canonical records.
//!
//! Every function here is pure. Malformed items are dropped rather than
//! failing the whole payload, so one stale entry in a client's local state
//! never blocks the rest of a sync.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

use crate::coerce::{
    date_key, is_truthy, parse_date_key, round_half_up, to_count, to_identifier, to_number,
    to_text, to_timestamp,
};
use crate::models::{
    AchievementRecord, ChallengeRecord, CompletedDay, Prayer, PrayerDay, ProfilePatch,
    UserDataPatch, DEFAULT_BASE_XP, DEFAULT_CATEGORY, DEFAULT_ICON,
};

/// The two shapes accepted for date-keyed collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatedPayload {
    /// `[{ "date": "2024-03-10", ... }, ...]`
    List(Vec<Value>),
    /// `{ "2024-03-10": { ... }, ... }`
    ByDate(Map<String, Value>),
}

impl DatedPayload {
    /// Entries with a valid date key, in submission order.
    pub fn entries(&self) -> Vec<(NaiveDate, &Value)> {
        match self {
            DatedPayload::List(items) => items
                .iter()
                .filter_map(|item| date_key(item.get("date")).map(|date| (date, item)))
                .collect(),
            DatedPayload::ByDate(map) => map
                .iter()
                .filter_map(|(key, value)| parse_date_key(key).map(|date| (date, value)))
                .collect(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{0} must be an object")]
    NotAnObject(&'static str),
}

/// `a ?? b`: the first field that is present and not null.
fn field<'a>(item: &'a Value, primary: &str, fallback: &str) -> Option<&'a Value> {
    item.get(primary)
        .filter(|v| !v.is_null())
        .or_else(|| item.get(fallback))
}

/// Normalizes one challenge object. Requires a client id and a title.
pub fn normalize_challenge(item: &Value) -> Option<ChallengeRecord> {
    if !item.is_object() {
        return None;
    }
    let frontend_id = field(item, "frontend_id", "id").and_then(to_identifier)?;
    let title = to_text(item.get("title"))?;

    Some(ChallengeRecord {
        frontend_id,
        title,
        category: to_text(item.get("category")).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        base_xp: to_count(item.get("base_xp"), DEFAULT_BASE_XP, 0),
        icon: to_text(item.get("icon")).unwrap_or_else(|| DEFAULT_ICON.to_string()),
    })
}

/// Challenges in submission order; the first occurrence of a client id wins.
pub fn normalize_challenges(items: &[Value]) -> Vec<ChallengeRecord> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(normalize_challenge)
        .filter(|record| seen.insert(record.frontend_id.clone()))
        .collect()
}

/// Deduplicated, trimmed challenge ids. Non-arrays yield an empty set.
pub fn normalize_challenge_ids(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(ids)) => ids.iter().filter_map(to_identifier).collect(),
        _ => BTreeSet::new(),
    }
}

fn completed_day(date: NaiveDate, payload: &Value) -> Option<CompletedDay> {
    match payload {
        Value::Array(_) => Some(CompletedDay {
            date,
            challenge_ids: normalize_challenge_ids(Some(payload)),
            total_xp: 0,
        }),
        Value::Object(_) => Some(CompletedDay {
            date,
            challenge_ids: normalize_challenge_ids(payload.get("challenge_ids")),
            total_xp: to_count(payload.get("total_xp"), 0, 0),
        }),
        _ => None,
    }
}

/// Completed days ordered by date; a later entry for the same date replaces
/// an earlier one.
pub fn normalize_completed_days(payload: &DatedPayload) -> Vec<CompletedDay> {
    let mut by_date = BTreeMap::new();
    for (date, value) in payload.entries() {
        if let Some(day) = completed_day(date, value) {
            by_date.insert(date, day);
        }
    }
    by_date.into_values().collect()
}

/// Prayer days ordered by date; a later entry for the same date wins.
pub fn normalize_prayer_log(payload: &DatedPayload) -> Vec<PrayerDay> {
    let mut by_date = BTreeMap::new();
    for (date, value) in payload.entries() {
        if value.is_object() {
            by_date.insert(date, PrayerDay::from_payload(date, value));
        }
    }
    by_date.into_values().collect()
}

fn achievement(item: &Value) -> Option<AchievementRecord> {
    match item {
        Value::Object(_) => {
            let achievement_id = field(item, "id", "achievement_id").and_then(to_identifier)?;
            let xp_reward = to_count(field(item, "xp_reward", "xpBonus"), 0, 0);
            Some(AchievementRecord {
                achievement_id,
                xp_reward,
            })
        }
        other => to_identifier(other).map(|id| AchievementRecord::new(id, 0)),
    }
}

/// Achievements given as bare ids or objects; the first occurrence wins.
pub fn normalize_achievements(items: &[Value]) -> Vec<AchievementRecord> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(achievement)
        .filter(|record| seen.insert(record.achievement_id.clone()))
        .collect()
}

fn count_field(map: &Map<String, Value>, key: &str, min: i64) -> Option<i64> {
    let number = to_number(map.get(key)?);
    number
        .is_finite()
        .then(|| (round_half_up(number) as i64).max(min))
}

fn nafs_stage(value: &Value) -> Option<Option<i64>> {
    if value.is_null() {
        return Some(None);
    }
    let number = to_number(value);
    if !number.is_finite() {
        return None;
    }
    let stage = round_half_up(number) as i64;
    (1..=7).contains(&stage).then_some(Some(stage))
}

/// Builds a profile patch from a partial field map. Unknown keys and
/// unusable values are ignored.
pub fn normalize_profile(map: &Map<String, Value>) -> ProfilePatch {
    ProfilePatch {
        name: to_text(map.get("name")),
        city: to_text(map.get("city")),
        xp: count_field(map, "xp", 0),
        streak: count_field(map, "streak", 0),
        tasbeh: count_field(map, "tasbeh", 0),
        daily_goal: count_field(map, "daily_goal", 1),
        onboarded: map.get("onboarded").map(is_truthy),
        notifications_enabled: map.get("notifications_enabled").map(is_truthy),
        last_task_at: map.get("last_task_at").and_then(to_timestamp),
        nafs_stage: map.get("nafs_stage").and_then(nafs_stage),
        nafs_assessed_at: map.get("nafs_assessed_at").and_then(to_timestamp),
        app_state: match map.get("app_state") {
            Some(Value::Object(state)) => Some(state.clone()),
            _ => None,
        },
    }
}

fn object_field<'a>(
    map: &'a Map<String, Value>,
    key: &'static str,
) -> Result<Option<&'a Map<String, Value>>, NormalizeError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner)),
        Some(_) => Err(NormalizeError::NotAnObject(key)),
    }
}

/// Validates the user-data blobs. Each present field must be an object.
pub fn normalize_user_data(map: &Map<String, Value>) -> Result<UserDataPatch, NormalizeError> {
    let video_notes = object_field(map, "video_notes")?.map(|notes| {
        notes
            .iter()
            .filter(|(_, v)| v.is_string())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    });

    let video_progress = object_field(map, "video_progress")?.map(|progress| {
        progress
            .iter()
            .filter_map(|(k, v)| {
                let n = to_number(v);
                (n.is_finite() && n >= 0.0)
                    .then(|| (k.clone(), Value::from(round_half_up(n) as i64)))
            })
            .collect()
    });

    let watched_videos = object_field(map, "watched_videos")?.map(|watched| {
        watched
            .iter()
            .filter(|(_, v)| is_truthy(v))
            .map(|(k, _)| (k.clone(), Value::Bool(true)))
            .collect()
    });

    let prayer_debt = object_field(map, "prayer_debt")?.map(|debt| {
        Prayer::ALL
            .iter()
            .map(|prayer| {
                let count = to_count(debt.get(prayer.as_str()), 0, 0);
                (prayer.as_str().to_string(), Value::from(count))
            })
            .collect()
    });

    let tasbeh_data = object_field(map, "tasbeh_data")?.cloned();

    Ok(UserDataPatch {
        video_notes,
        video_progress,
        watched_videos,
        prayer_debt,
        tasbeh_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrayerStatus;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        parse_date_key(s).unwrap()
    }

    #[test]
    fn test_dated_payload_accepts_both_shapes() {
        let list: DatedPayload =
            serde_json::from_value(json!([{"date": "2024-03-10"}, {"date": "nope"}])).unwrap();
        assert!(matches!(list, DatedPayload::List(_)));
        assert_eq!(list.entries().len(), 1);

        let map: DatedPayload =
            serde_json::from_value(json!({"2024-03-10": {}, "03/11/2024": {}})).unwrap();
        assert!(matches!(map, DatedPayload::ByDate(_)));
        assert_eq!(map.entries().len(), 1);
        assert_eq!(map.entries()[0].0, date("2024-03-10"));
    }

    #[test]
    fn test_challenges_drop_invalid_and_keep_first() {
        let records = normalize_challenges(&[
            json!({"frontend_id": " c1 ", "title": "Read Quran", "base_xp": "30"}),
            json!({"frontend_id": "c1", "title": "Duplicate"}),
            json!({"frontend_id": "", "title": "No id"}),
            json!({"id": 7, "title": "Numeric id", "base_xp": -4}),
            json!({"frontend_id": "c3", "title": "   "}),
            json!("not an object"),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].frontend_id, "c1");
        assert_eq!(records[0].title, "Read Quran");
        assert_eq!(records[0].base_xp, 30);
        assert_eq!(records[0].category, "ibadah");
        assert_eq!(records[1].frontend_id, "7");
        assert_eq!(records[1].base_xp, 0);
    }

    #[test]
    fn test_completed_days_normalization() {
        let payload: DatedPayload = serde_json::from_value(json!([
            {"date": "2024-03-10", "challenge_ids": ["a", " b ", "a", "", null], "total_xp": -5},
            {"date": "2024-03-09", "challenge_ids": "oops", "total_xp": "12.7"},
            {"date": "2024-13-01", "challenge_ids": ["x"], "total_xp": 1},
        ]))
        .unwrap();

        let days = normalize_completed_days(&payload);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date("2024-03-09"));
        assert_eq!(days[0].total_xp, 13);
        assert!(days[0].challenge_ids.is_empty());
        assert_eq!(days[1].total_xp, 0);
        assert_eq!(days[1].task_count(), 2);
    }

    #[test]
    fn test_completed_days_last_duplicate_wins() {
        let payload: DatedPayload = serde_json::from_value(json!([
            {"date": "2024-03-10", "challenge_ids": ["a"], "total_xp": 10},
            {"date": "2024-03-10", "challenge_ids": ["b", "c"], "total_xp": 20},
        ]))
        .unwrap();

        let days = normalize_completed_days(&payload);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].total_xp, 20);
        assert_eq!(days[0].task_count(), 2);
    }

    #[test]
    fn test_completed_days_map_with_bare_id_list() {
        let payload: DatedPayload =
            serde_json::from_value(json!({"2024-03-10": ["a", "b"], "2024-03-11": 5})).unwrap();
        let days = normalize_completed_days(&payload);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].task_count(), 2);
    }

    #[test]
    fn test_prayer_log_normalization() {
        let payload: DatedPayload = serde_json::from_value(json!({
            "2024-03-10": {"fajr": "late", "dhuhr": "skipped", "asr": "JAMAAT", "isha": "??"},
            "2024-03-11": "bad",
        }))
        .unwrap();

        let days = normalize_prayer_log(&payload);
        assert_eq!(days.len(), 1);
        let day = &days[0];
        assert_eq!(day.fajr, PrayerStatus::OnTime);
        assert_eq!(day.dhuhr, PrayerStatus::Missed);
        assert_eq!(day.asr, PrayerStatus::Jamaat);
        assert_eq!(day.maghrib, PrayerStatus::Pending);
        assert_eq!(day.isha, PrayerStatus::Pending);
    }

    #[test]
    fn test_achievements_mixed_shapes() {
        let records = normalize_achievements(&[
            json!("first_day"),
            json!({"id": "week_streak", "xp_reward": 99.6}),
            json!({"achievement_id": "tasbeh_100", "xpBonus": "15"}),
            json!({"id": "first_day", "xp_reward": 500}),
            json!(""),
            json!({"xp_reward": 5}),
        ]);

        assert_eq!(
            records,
            vec![
                AchievementRecord::new("first_day", 0),
                AchievementRecord::new("week_streak", 100),
                AchievementRecord::new("tasbeh_100", 15),
            ]
        );
    }

    #[test]
    fn test_profile_patch() {
        let map = json!({
            "xp": "120.4",
            "streak": -3,
            "daily_goal": 0,
            "tasbeh": "many",
            "onboarded": 1,
            "last_task_at": null,
            "nafs_assessed_at": "garbage",
            "nafs_stage": 9,
            "app_state": [1, 2],
            "name": "  Aziz ",
            "unknown": true
        });
        let patch = normalize_profile(map.as_object().unwrap());

        assert_eq!(patch.xp, Some(120));
        assert_eq!(patch.streak, Some(0));
        assert_eq!(patch.daily_goal, Some(1));
        assert_eq!(patch.tasbeh, None);
        assert_eq!(patch.onboarded, Some(true));
        assert_eq!(patch.last_task_at, Some(None));
        assert_eq!(patch.nafs_assessed_at, None);
        assert_eq!(patch.nafs_stage, None);
        assert_eq!(patch.app_state, None);
        assert_eq!(patch.name.as_deref(), Some("Aziz"));
    }

    #[test]
    fn test_profile_patch_app_state_and_nafs() {
        let map = json!({"app_state": {"theme": "dark"}, "nafs_stage": "3"});
        let patch = normalize_profile(map.as_object().unwrap());
        assert_eq!(patch.nafs_stage, Some(Some(3)));
        assert_eq!(
            patch.app_state.unwrap().get("theme"),
            Some(&json!("dark"))
        );
    }

    #[test]
    fn test_user_data_rejects_non_objects() {
        let map = json!({"video_notes": ["a"]});
        assert_eq!(
            normalize_user_data(map.as_object().unwrap()),
            Err(NormalizeError::NotAnObject("video_notes"))
        );
    }

    #[test]
    fn test_user_data_cleaning() {
        let map = json!({
            "video_notes": {"v1": "note", "v2": 5},
            "video_progress": {"v1": 12.6, "v2": -1, "v3": "x"},
            "watched_videos": {"v1": 1, "v2": 0},
            "prayer_debt": {"fajr": "3", "isha": -2}
        });
        let patch = normalize_user_data(map.as_object().unwrap()).unwrap();

        assert_eq!(patch.video_notes.unwrap().len(), 1);
        assert_eq!(
            Value::Object(patch.video_progress.unwrap()),
            json!({"v1": 13})
        );
        assert_eq!(
            Value::Object(patch.watched_videos.unwrap()),
            json!({"v1": true})
        );
        assert_eq!(
            Value::Object(patch.prayer_debt.unwrap()),
            json!({"fajr": 3, "dhuhr": 0, "asr": 0, "maghrib": 0, "isha": 0})
        );
        assert!(patch.tasbeh_data.is_none());
    }
}
