use amal_core::SyncRequest;
use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::engine::{Snapshot, SyncReport};
use crate::error::AppError;
use crate::server::extract::ApiJson;
use crate::server::{AppState, Identity};

pub async fn full(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Snapshot>, AppError> {
    Ok(Json(state.snapshots.read(&user.id).await?))
}

#[derive(Serialize)]
pub struct SyncResponse {
    #[serde(flatten)]
    report: SyncReport,
    snapshot: Snapshot,
}

/// Group failures are listed in the report; the request itself still succeeds.
pub async fn sync(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    ApiJson(request): ApiJson<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    let report = state.sync.sync(&user.id, &request).await;
    let snapshot = state.snapshots.read(&user.id).await?;
    Ok(Json(SyncResponse { report, snapshot }))
}

pub async fn reset(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> Result<Json<Snapshot>, AppError> {
    if !state.store.reset_user(&user.id).await? {
        return Err(AppError::not_found("profile"));
    }
    tracing::info!(user_id = %user.id, "progress reset");
    Ok(Json(state.snapshots.read(&user.id).await?))
}
