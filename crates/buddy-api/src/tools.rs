use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use buddy_types::api::{Category, Claims, CreateToolRequest, SetVisibilityRequest, UpdateToolRequest};

use crate::auth::AppState;
use crate::convert;

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let categories: Vec<Category> = state
        .db
        .list_categories()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(|(id, name)| Category { id, name })
        .collect();

    Ok(Json(categories))
}

pub async fn create_tool(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateToolRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.name.is_empty() || req.name.len() > 120 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let category_id = state
        .db
        .get_category_id(&req.category)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::BAD_REQUEST)?;

    let tool_id = Uuid::new_v4();
    state
        .db
        .create_tool(
            &tool_id.to_string(),
            &claims.sub.to_string(),
            &req.name,
            req.description.as_deref(),
            category_id,
            req.brand.as_deref(),
            req.power_source.as_deref(),
            req.condition.as_deref(),
            req.image_path.as_deref(),
        )
        .map_err(|e| {
            error!("DB create_tool error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let row = state
        .db
        .get_tool(&tool_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(convert::tool_from_row(row))))
}

/// The caller's own tools.
pub async fn list_my_tools(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_tools_by_owner(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let tools: Vec<_> = rows.into_iter().map(convert::tool_from_row).collect();
    Ok(Json(tools))
}

/// Tools shared by members of the caller's groups.
pub async fn list_visible_tools(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = claims.sub.to_string();

    // Run the multi-join query off the async runtime
    let rows = tokio::task::spawn_blocking(move || db.db.list_visible_tools(&uid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let tools: Vec<_> = rows.into_iter().map(convert::tool_from_row).collect();
    Ok(Json(tools))
}

pub async fn get_tool(
    State(state): State<AppState>,
    Path(tool_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let tid = tool_id.to_string();

    if !state
        .db
        .tool_visible_to(&tid, &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let row = state
        .db
        .get_tool(&tid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(convert::tool_from_row(row)))
}

pub async fn update_tool(
    State(state): State<AppState>,
    Path(tool_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateToolRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let tid = tool_id.to_string();
    let row = require_owned_tool(&state, &tid, &claims)?;

    let category_id = match &req.category {
        Some(name) => Some(
            state
                .db
                .get_category_id(name)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .ok_or(StatusCode::BAD_REQUEST)?,
        ),
        None => None,
    };

    state
        .db
        .update_tool(
            &row.id,
            req.name.as_deref(),
            req.description.as_deref(),
            category_id,
            req.status.map(|s| s.as_str()),
            req.brand.as_deref(),
            req.power_source.as_deref(),
            req.condition.as_deref(),
            req.image_path.as_deref(),
        )
        .map_err(|e| {
            error!("DB update_tool error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let row = state
        .db
        .get_tool(&tid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(convert::tool_from_row(row)))
}

pub async fn delete_tool(
    State(state): State<AppState>,
    Path(tool_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let tid = tool_id.to_string();
    require_owned_tool(&state, &tid, &claims)?;

    state.db.delete_tool(&tid).map_err(|e| {
        error!("DB delete_tool error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Replace the set of groups a tool is shared with. The owner must be a
/// member of every listed group.
pub async fn set_visibility(
    State(state): State<AppState>,
    Path(tool_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetVisibilityRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let tid = tool_id.to_string();
    require_owned_tool(&state, &tid, &claims)?;

    let uid = claims.sub.to_string();
    let mut group_ids = Vec::with_capacity(req.group_ids.len());
    for gid in &req.group_ids {
        let gid = gid.to_string();
        if state
            .db
            .get_member_role(&gid, &uid)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .is_none()
        {
            return Err(StatusCode::FORBIDDEN);
        }
        group_ids.push(gid);
    }

    state
        .db
        .set_tool_visibility(&tid, &group_ids)
        .map_err(|e| {
            error!("DB set_tool_visibility error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(StatusCode::NO_CONTENT)
}

fn require_owned_tool(
    state: &AppState,
    tool_id: &str,
    claims: &Claims,
) -> Result<buddy_db::models::ToolRow, StatusCode> {
    let row = state
        .db
        .get_tool(tool_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if row.owner_id != claims.sub.to_string() {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(row)
}
