use amal_core::coerce::{date_key, round_half_up, start_of_day, to_count, to_identifier, to_text};
use amal_core::models::{DEFAULT_BASE_XP, DEFAULT_CATEGORY, DEFAULT_ICON};
use amal_core::normalize::normalize_challenge_ids;
use amal_core::{Challenge, CompletedDay, Profile, ProfilePatch};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::object_body;
use crate::error::AppError;
use crate::server::extract::ApiJson;
use crate::server::{AppState, Identity};

pub async fn list_challenges(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Vec<Challenge>>, AppError> {
    Ok(Json(state.store.challenges.list(&user.id).await?))
}

/// Creates a challenge, or returns the existing one with the same `frontend_id`.
pub async fn create_challenge(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Challenge>), AppError> {
    let body = object_body(body);
    let title = to_text(body.get("title")).ok_or_else(|| AppError::validation("title is required"))?;
    let frontend_id = body.get("frontend_id").and_then(to_identifier);

    if let Some(frontend_id) = &frontend_id {
        if let Some(existing) = state
            .store
            .challenges
            .get_by_frontend_id(&user.id, frontend_id)
            .await?
        {
            return Ok((StatusCode::OK, Json(existing)));
        }
    }

    let mut challenge = Challenge::new(title)
        .with_category(to_text(body.get("category")).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()))
        .with_base_xp(to_count(body.get("base_xp"), DEFAULT_BASE_XP, 0))
        .with_icon(to_text(body.get("icon")).unwrap_or_else(|| DEFAULT_ICON.to_string()));
    if let Some(frontend_id) = frontend_id {
        challenge = challenge.with_frontend_id(frontend_id);
    }

    let created = state.store.challenges.create(&user.id, &challenge).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_challenge(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let removed = state.store.challenges.delete(&user.id, &id).await?;
    Ok(Json(json!({ "message": "deleted", "removed": removed })))
}

pub async fn delete_by_frontend_id(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path(frontend_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let removed = state
        .store
        .challenges
        .delete_by_frontend_id(&user.id, &frontend_id)
        .await?;
    Ok(Json(json!({ "message": "deleted", "removed": removed })))
}

/// A JSON number, rounded and clamped at zero. Strings are rejected.
fn strict_count(body: &Map<String, Value>, key: &str) -> Option<i64> {
    let number = body.get(key)?.as_f64()?;
    Some((round_half_up(number) as i64).max(0))
}

fn required_date(body: &Map<String, Value>) -> Result<NaiveDate, AppError> {
    date_key(body.get("date")).ok_or_else(|| AppError::validation("date must be a valid YYYY-MM-DD day"))
}

async fn load_profile(state: &AppState, user_id: &str) -> Result<Profile, AppError> {
    state
        .store
        .profiles
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("profile"))
}

#[derive(Serialize)]
pub struct CompleteResponse {
    day: CompletedDay,
    profile: Profile,
}

/// Stores a day's completions and takes the client's XP total as authoritative.
pub async fn complete_day(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<CompleteResponse>, AppError> {
    let body = object_body(body);
    let date = required_date(&body)?;
    if !body.get("challenge_ids").is_some_and(Value::is_array) {
        return Err(AppError::validation("challenge_ids must be an array"));
    }
    let total_xp =
        strict_count(&body, "total_xp").ok_or_else(|| AppError::validation("total_xp must be a number"))?;

    let day = CompletedDay {
        date,
        challenge_ids: normalize_challenge_ids(body.get("challenge_ids")),
        total_xp,
    };
    let day = state.store.completed_days.upsert(&user.id, &day).await?;

    let patch = ProfilePatch {
        xp: Some(total_xp),
        streak: body
            .get("streak")
            .filter(|v| !v.is_null())
            .map(|v| to_count(Some(v), 0, 0)),
        last_task_at: Some(Some(start_of_day(date))),
        ..Default::default()
    };
    if !state.store.profiles.apply_patch(&user.id, &patch).await? {
        return Err(AppError::not_found("profile"));
    }

    let profile = load_profile(&state, &user.id).await?;
    Ok(Json(CompleteResponse { day, profile }))
}

#[derive(Serialize)]
pub struct UndoResponse {
    profile: Profile,
}

pub async fn undo_day(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<UndoResponse>, AppError> {
    let body = object_body(body);
    let date = required_date(&body)?;
    let xp = strict_count(&body, "xp_after_undo")
        .ok_or_else(|| AppError::validation("xp_after_undo must be a number"))?;

    state.store.completed_days.delete(&user.id, date).await?;

    let patch = ProfilePatch {
        xp: Some(xp),
        ..Default::default()
    };
    if !state.store.profiles.apply_patch(&user.id, &patch).await? {
        return Err(AppError::not_found("profile"));
    }

    let profile = load_profile(&state, &user.id).await?;
    Ok(Json(UndoResponse { profile }))
}
