use amal_core::stats::resolve_end;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::today;
use crate::engine::{StreakReport, WeeklyStats};
use crate::error::AppError;
use crate::server::{AppState, Identity};

/// Raw query values; malformed ones fall back to defaults instead of failing.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    end: Option<String>,
    days: Option<String>,
}

pub async fn weekly(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<WeeklyStats>, AppError> {
    let stats = state
        .stats
        .weekly(&user.id, query.end.as_deref(), query.days.as_deref(), today())
        .await?;
    Ok(Json(stats))
}

#[derive(Serialize)]
pub struct StreaksResponse {
    task: StreakReport,
    prayer: StreakReport,
}

pub async fn streaks(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StreaksResponse>, AppError> {
    let end = resolve_end(query.end.as_deref(), today());
    let (task, prayer) = state.streaks.both(&user.id, end).await?;
    Ok(Json(StreaksResponse { task, prayer }))
}
