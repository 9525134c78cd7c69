use amal_core::normalize::normalize_achievements;
use amal_core::{Achievement, SyncMode};
use axum::{extract::State, Extension, Json};
use serde_json::Value;

use crate::db::AchievementRepository;
use crate::error::AppError;
use crate::server::extract::ApiJson;
use crate::server::{AppState, Identity};

/// Merges the submitted achievements and returns their stored rows.
pub async fn sync_achievements(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Vec<Achievement>>, AppError> {
    let Some(items) = body.get("achievements").and_then(Value::as_array) else {
        return Ok(Json(Vec::new()));
    };

    let records = normalize_achievements(items);
    if records.is_empty() {
        return Ok(Json(Vec::new()));
    }

    state
        .reconciler
        .reconcile::<AchievementRepository>(&user.id, &records, SyncMode::Merge)
        .await?;

    let ids: Vec<String> = records.into_iter().map(|r| r.achievement_id).collect();
    Ok(Json(state.store.achievements.list_ids(&user.id, &ids).await?))
}
