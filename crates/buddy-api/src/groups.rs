use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use buddy_types::api::{ChangeRoleRequest, Claims, CreateGroupRequest, GroupDetailResponse};

use crate::auth::AppState;
use crate::convert;

pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.name.is_empty() || req.name.len() > 80 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let group_id = Uuid::new_v4();
    state
        .db
        .create_group(
            &group_id.to_string(),
            &req.name,
            req.description.as_deref(),
            req.is_private,
            &claims.sub.to_string(),
        )
        .map_err(|e| {
            error!("DB create_group error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let row = state
        .db
        .get_group(&group_id.to_string(), &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(convert::group_from_row(row))))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_groups_for_user(&claims.sub.to_string())
        .map_err(|e| {
            error!("DB list_groups_for_user error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let groups: Vec<_> = rows.into_iter().map(convert::group_from_row).collect();
    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let gid = group_id.to_string();
    let uid = claims.sub.to_string();

    let row = state
        .db
        .get_group(&gid, &uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // Private groups are only visible to members
    if row.my_role.is_none() && row.is_private {
        return Err(StatusCode::NOT_FOUND);
    }

    let members = state
        .db
        .list_members(&gid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(convert::member_from_row)
        .collect();

    Ok(Json(GroupDetailResponse {
        group: convert::group_from_row(row),
        members,
    }))
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let gid = group_id.to_string();

    if state
        .db
        .get_member_role(&gid, &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let members: Vec<_> = state
        .db
        .list_members(&gid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(convert::member_from_row)
        .collect();

    Ok(Json(members))
}

pub async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let gid = group_id.to_string();
    let uid = claims.sub.to_string();

    let row = state
        .db
        .get_group(&gid, &uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // The creator deletes the group instead of leaving it
    if row.created_by == uid {
        return Err(StatusCode::CONFLICT);
    }

    if !state
        .db
        .remove_member(&gid, &uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let gid = group_id.to_string();
    let uid = claims.sub.to_string();

    let row = state
        .db
        .get_group(&gid, &uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if row.created_by != uid {
        return Err(StatusCode::FORBIDDEN);
    }

    state.db.delete_group(&gid).map_err(|e| {
        error!("DB delete_group error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_member_role(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let gid = group_id.to_string();

    if !state
        .db
        .is_group_admin(&gid, &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Err(StatusCode::FORBIDDEN);
    }

    if !state
        .db
        .set_member_role(&gid, &user_id.to_string(), req.role.as_str())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let gid = group_id.to_string();

    if !state
        .db
        .is_group_admin(&gid, &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Err(StatusCode::FORBIDDEN);
    }

    let row = state
        .db
        .get_group(&gid, &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // Cannot remove the creator
    if row.created_by == user_id.to_string() {
        return Err(StatusCode::CONFLICT);
    }

    if !state
        .db
        .remove_member(&gid, &user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT)
}
