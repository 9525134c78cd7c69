use amal_core::{CompletedDay, PrayerDay};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Serialize;

use super::date_param;
use crate::error::AppError;
use crate::server::{AppState, Identity};

pub async fn list_days(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Vec<CompletedDay>>, AppError> {
    Ok(Json(state.store.completed_days.list(&user.id).await?))
}

#[derive(Serialize)]
pub struct DayDetail {
    date: NaiveDate,
    completed: Option<CompletedDay>,
    prayers: Option<PrayerDay>,
}

pub async fn get_day(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path(date): Path<String>,
) -> Result<Json<DayDetail>, AppError> {
    let date = date_param(&date)?;
    let (completed, prayers) = futures::try_join!(
        state.store.completed_days.get(&user.id, date),
        state.store.prayer_log.get(&user.id, date),
    )?;
    Ok(Json(DayDetail {
        date,
        completed,
        prayers,
    }))
}
