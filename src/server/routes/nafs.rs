use amal_core::ProfilePatch;
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::server::extract::ApiJson;
use crate::server::{AppState, Identity};

#[derive(Serialize)]
pub struct NafsState {
    nafs_stage: Option<i64>,
    nafs_assessed_at: Option<DateTime<Utc>>,
}

/// `stage_id` must be an integral JSON number in 1..=7; strings are rejected.
fn stage_id(body: &Value) -> Option<i64> {
    let number = body.get("stage_id")?.as_f64()?;
    (number.fract() == 0.0 && (1.0..=7.0).contains(&number)).then_some(number as i64)
}

pub async fn assess(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<NafsState>, AppError> {
    let stage = stage_id(&body)
        .ok_or_else(|| AppError::validation("stage_id must be an integer between 1 and 7"))?;
    let assessed_at = Utc::now();

    let patch = ProfilePatch {
        nafs_stage: Some(Some(stage)),
        nafs_assessed_at: Some(Some(assessed_at)),
        ..Default::default()
    };
    if !state.store.profiles.apply_patch(&user.id, &patch).await? {
        return Err(AppError::not_found("profile"));
    }

    Ok(Json(NafsState {
        nafs_stage: Some(stage),
        nafs_assessed_at: Some(assessed_at),
    }))
}

pub async fn get_nafs(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<NafsState>, AppError> {
    let profile = state
        .store
        .profiles
        .get(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("profile"))?;
    Ok(Json(NafsState {
        nafs_stage: profile.nafs_stage,
        nafs_assessed_at: profile.nafs_assessed_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_id_validation() {
        assert_eq!(stage_id(&json!({"stage_id": 4})), Some(4));
        assert_eq!(stage_id(&json!({"stage_id": 7.0})), Some(7));
        assert_eq!(stage_id(&json!({"stage_id": 0})), None);
        assert_eq!(stage_id(&json!({"stage_id": 8})), None);
        assert_eq!(stage_id(&json!({"stage_id": 2.5})), None);
        assert_eq!(stage_id(&json!({"stage_id": "3"})), None);
        assert_eq!(stage_id(&json!({})), None);
    }
}
