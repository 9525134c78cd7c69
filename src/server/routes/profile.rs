use amal_core::coerce::to_text;
use amal_core::{Achievement, Profile, ProfilePatch};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use super::object_body;
use crate::error::AppError;
use crate::server::extract::ApiJson;
use crate::server::{AppState, Identity};

const RECENT_DAYS: u32 = 30;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .store
        .profiles
        .get(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("profile"))?;
    Ok(Json(profile))
}

/// Only `name` and `city` can be changed here.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Profile>, AppError> {
    let body = object_body(body);
    let patch = ProfilePatch {
        name: to_text(body.get("name")),
        city: to_text(body.get("city")),
        ..Default::default()
    };
    if patch.is_empty() {
        return Err(AppError::validation("nothing to update: send name or city"));
    }

    if !state.store.profiles.apply_patch(&user.id, &patch).await? {
        return Err(AppError::not_found("profile"));
    }
    get_profile(State(state), Extension(user)).await
}

#[derive(Serialize)]
pub struct RecentDay {
    date: NaiveDate,
    total_xp: i64,
}

#[derive(Serialize)]
pub struct ProfileStats {
    xp: i64,
    streak: i64,
    last_task_at: Option<DateTime<Utc>>,
    achievements: Vec<Achievement>,
    recent_days: Vec<RecentDay>,
}

pub async fn profile_stats(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<ProfileStats>, AppError> {
    let (profile, achievements, recent) = futures::try_join!(
        state.store.profiles.get(&user.id),
        state.store.achievements.list(&user.id),
        state.store.completed_days.recent(&user.id, RECENT_DAYS),
    )?;

    Ok(Json(ProfileStats {
        xp: profile.as_ref().map_or(0, |p| p.xp),
        streak: profile.as_ref().map_or(0, |p| p.streak),
        last_task_at: profile.and_then(|p| p.last_task_at),
        achievements,
        recent_days: recent
            .into_iter()
            .map(|day| RecentDay {
                date: day.date,
                total_xp: day.total_xp,
            })
            .collect(),
    }))
}
