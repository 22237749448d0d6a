use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::{Rng, distr::Alphanumeric};
use tracing::{error, warn};
use uuid::Uuid;

use buddy_db::queries::AcceptInvite;
use buddy_types::api::{Claims, CreateInviteRequest, CreateInviteResponse};
use buddy_types::status::NotificationKind;

use crate::auth::AppState;
use crate::convert;

fn new_invite_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(22)
        .map(char::from)
        .collect()
}

/// Issue an invite for a group. With an email it is personal (consumed on
/// acceptance); without one it is a general link invite, stored with the
/// '*' wildcard marker and reusable indefinitely.
pub async fn create_invite(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let gid = group_id.to_string();

    if !state
        .db
        .is_group_admin(&gid, &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Err(StatusCode::FORBIDDEN);
    }

    let email = match &req.email {
        Some(e) => {
            if !e.contains('@') {
                return Err(StatusCode::BAD_REQUEST);
            }
            e.as_str()
        }
        None => "*",
    };

    let code = new_invite_code();
    state
        .db
        .create_invite(&code, &gid, email, &claims.sub.to_string(), None)
        .map_err(|e| {
            error!("DB create_invite error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok((StatusCode::CREATED, Json(CreateInviteResponse { code })))
}

/// Preview an invite before accepting: group and inviter names, kind.
pub async fn get_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .get_invite(&code)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(convert::invite_from_row(row)))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .get_invite(&code)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let outcome = state
        .db
        .accept_invite(&row, &claims.sub.to_string(), &claims.email)
        .map_err(|e| {
            error!("DB accept_invite error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match outcome {
        AcceptInvite::Joined { group_id } => {
            // Best-effort: tell the inviter their invite was taken up
            let display_name = state
                .db
                .get_profile(&claims.sub.to_string())
                .ok()
                .flatten()
                .map(|p| p.display_name)
                .unwrap_or_else(|| claims.email.clone());
            if let Err(e) = state.db.insert_notification(
                &Uuid::new_v4().to_string(),
                &row.invited_by,
                NotificationKind::InviteAccepted.as_str(),
                &format!("{} joined {}", display_name, row.group_name),
                None,
                None,
                Some(&group_id),
            ) {
                warn!("Invite-accepted notification failed: {}", e);
            }

            Ok(Json(serde_json::json!({ "group_id": group_id })))
        }
        AcceptInvite::AlreadyMember => Err(StatusCode::CONFLICT),
        AcceptInvite::WrongEmail => Err(StatusCode::FORBIDDEN),
    }
}

/// Declining deletes a personal invite; a general link invite is left alone.
pub async fn decline_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .db
        .get_invite(&code)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if !row.is_general() {
        if !row.email.eq_ignore_ascii_case(&claims.email) {
            return Err(StatusCode::FORBIDDEN);
        }
        state
            .db
            .delete_invite(&code)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    Ok(StatusCode::NO_CONTENT)
}
