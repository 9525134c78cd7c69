use amal_core::normalize::normalize_user_data;
use amal_core::UserData;
use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use super::object_body;
use crate::error::AppError;
use crate::server::extract::ApiJson;
use crate::server::{AppState, Identity};

pub async fn put_user_data(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, AppError> {
    let patch = normalize_user_data(&object_body(body))
        .map_err(|e| AppError::validation(e.to_string()))?;

    if !patch.is_empty() && !state.store.profiles.update_user_data(&user.id, &patch).await? {
        return Err(AppError::not_found("profile"));
    }
    Ok(Json(json!({ "ok": true })))
}

pub async fn get_user_data(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<UserData>, AppError> {
    let data = state
        .store
        .profiles
        .user_data(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("profile"))?;
    Ok(Json(data))
}
