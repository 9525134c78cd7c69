use amal_core::{Prayer, PrayerDay, PrayerStatus};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use super::{date_param, today};
use crate::error::AppError;
use crate::server::extract::ApiJson;
use crate::server::{AppState, Identity};

/// Current run of all-positive prayer days ending today.
pub async fn current_streak(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let report = state.streaks.prayer_streak(&user.id, today()).await?;
    Ok(Json(json!({ "streak": report.current })))
}

/// A day never logged reads as all pending.
pub async fn get_day(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path(date): Path<String>,
) -> Result<Json<PrayerDay>, AppError> {
    let date = date_param(&date)?;
    let day = state
        .store
        .prayer_log
        .get(&user.id, date)
        .await?
        .unwrap_or_else(|| PrayerDay::pending(date));
    Ok(Json(day))
}

/// Replaces all five statuses; missing ones become pending.
pub async fn put_day(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path(date): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<PrayerDay>, AppError> {
    let date = date_param(&date)?;
    let day = PrayerDay::from_payload(date, &body);
    Ok(Json(state.store.prayer_log.upsert(&user.id, &day).await?))
}

pub async fn put_prayer(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path((date, prayer)): Path<(String, String)>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<PrayerDay>, AppError> {
    let date = date_param(&date)?;
    let prayer: Prayer = prayer.parse().map_err(AppError::Validation)?;
    let status = PrayerStatus::from_value(body.get("status"));

    let day = state
        .store
        .prayer_log
        .set_status(&user.id, date, prayer, status)
        .await?;
    Ok(Json(day))
}
