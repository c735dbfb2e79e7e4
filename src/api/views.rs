use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::{AuthUser, MaybeAuthUser, Visitor};
use super::AppState;
use crate::views::ViewOutcome;

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewResponse {
    pub counted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewCountResponse {
    pub views: i64,
}

/// Register a view of the profile behind `handle`
pub async fn register_view(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
    MaybeAuthUser(requester): MaybeAuthUser,
    Visitor(visitor): Visitor,
) -> Result<(StatusCode, Json<ViewResponse>), ApiError> {
    let outcome = state
        .views
        .register_view(&handle, requester, &visitor)
        .await?;

    let (status, reason) = match outcome {
        ViewOutcome::Counted => (StatusCode::CREATED, None),
        ViewOutcome::AlreadyCounted => (StatusCode::CREATED, Some("already_counted")),
        ViewOutcome::SelfVisit => (StatusCode::OK, Some("self_visit")),
    };

    Ok((
        status,
        Json(ViewResponse {
            counted: outcome.counted(),
            reason: reason.map(str::to_string),
        }),
    ))
}

/// Lifetime view count of the caller's own profile
pub async fn my_views(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ViewCountResponse>, ApiError> {
    let views = state.views.view_count(user.id).await?;
    Ok(Json(ViewCountResponse { views }))
}
