//! HTTP handlers, one module per resource under `/api`.

mod achievements;
mod calendar;
mod challenges;
mod data;
mod nafs;
mod prayer;
mod profile;
mod stats;
mod userdata;

use amal_core::coerce::parse_date_key;
use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::AppState;
use crate::error::AppError;

/// Routes that require an authenticated caller.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/api/profile/stats", get(profile::profile_stats))
        .route(
            "/api/challenges",
            get(challenges::list_challenges).post(challenges::create_challenge),
        )
        .route("/api/challenges/complete", post(challenges::complete_day))
        .route("/api/challenges/undo", post(challenges::undo_day))
        .route("/api/challenges/fid/{frontend_id}", delete(challenges::delete_by_frontend_id))
        .route("/api/challenges/{id}", delete(challenges::delete_challenge))
        .route("/api/calendar", get(calendar::list_days))
        .route("/api/calendar/{date}", get(calendar::get_day))
        .route("/api/prayer/streak/current", get(prayer::current_streak))
        .route("/api/prayer/{date}", get(prayer::get_day).put(prayer::put_day))
        .route("/api/prayer/{date}/{prayer}", put(prayer::put_prayer))
        .route("/api/achievements/sync", post(achievements::sync_achievements))
        .route("/api/nafs", get(nafs::get_nafs))
        .route("/api/nafs/assess", post(nafs::assess))
        .route("/api/userdata", get(userdata::get_user_data).put(userdata::put_user_data))
        .route("/api/data/full", get(data::full))
        .route("/api/data/sync", post(data::sync))
        .route("/api/data/reset", post(data::reset))
        .route("/api/stats/weekly", get(stats::weekly))
        .route("/api/stats/streaks", get(stats::streaks))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    ts: i64,
    version: &'static str,
}

/// Health check endpoint (no auth required)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ts: Utc::now().timestamp_millis(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn date_param(raw: &str) -> Result<NaiveDate, AppError> {
    parse_date_key(raw).ok_or_else(|| AppError::validation("date must be a valid YYYY-MM-DD day"))
}

/// Request bodies that are not JSON objects count as empty.
fn object_body(body: Value) -> Map<String, Value> {
    match body {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
