use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use buddy_types::api::{Claims, UpdateProfileRequest};

use crate::auth::AppState;
use crate::convert;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .get_profile(&claims.sub.to_string())
        .map_err(|e| {
            error!("DB get_profile error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(convert::profile_from_row(row)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if let Some(name) = &req.display_name {
        if name.is_empty() || name.len() > 64 {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let updated = state
        .db
        .update_profile(
            &claims.sub.to_string(),
            req.display_name.as_deref(),
            req.bio.as_deref(),
            req.avatar_path.as_deref(),
        )
        .map_err(|e| {
            error!("DB update_profile error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !updated {
        return Err(StatusCode::NOT_FOUND);
    }

    let row = state
        .db
        .get_profile(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(convert::profile_from_row(row)))
}

/// Get-or-create preferences; callers may only target themselves.
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if user_id != claims.sub {
        return Err(StatusCode::FORBIDDEN);
    }

    let row = state
        .db
        .get_or_create_preferences(&user_id.to_string())
        .map_err(|e| {
            error!("DB get_or_create_preferences error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(convert::preferences_from_row(row)))
}
