use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use buddy_db::models::RequestRow;
use buddy_types::api::{
    Claims, ConfirmReturnRequest, CreateBorrowRequest, MarkOverdueResponse, RequestDetailResponse,
};
use buddy_types::status::{NotificationKind, RequestStatus, ToolStatus};

use crate::auth::AppState;
use crate::convert;

#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    /// "incoming" (requests against my tools) or "outgoing" (my borrows).
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "outgoing".into()
}

pub async fn create_request(
    State(state): State<AppState>,
    Path(tool_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBorrowRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.end_date < req.start_date {
        return Err(StatusCode::BAD_REQUEST);
    }

    let tid = tool_id.to_string();
    let uid = claims.sub.to_string();

    let tool = state
        .db
        .get_tool(&tid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if tool.owner_id == uid {
        // Cannot borrow your own tool
        return Err(StatusCode::BAD_REQUEST);
    }

    if !state
        .db
        .tool_visible_to(&tid, &uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        return Err(StatusCode::NOT_FOUND);
    }

    if tool.status != ToolStatus::Available.as_str() {
        return Err(StatusCode::CONFLICT);
    }

    let request_id = Uuid::new_v4();
    state
        .db
        .create_request(
            &request_id.to_string(),
            &tid,
            &uid,
            &req.start_date.to_string(),
            &req.end_date.to_string(),
            req.message.as_deref(),
        )
        .map_err(|e| {
            error!("DB create_request error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let row = state
        .db
        .get_request(&request_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    record_side_effects(
        &state,
        &row,
        Some(&uid),
        "requested",
        None,
        &row.owner_id,
        NotificationKind::RequestCreated,
        &format!("{} wants to borrow {}", row.borrower_name, row.tool_name),
    );

    Ok((StatusCode::CREATED, Json(convert::request_from_row(row))))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestListQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = claims.sub.to_string();
    let incoming = match query.direction.as_str() {
        "incoming" => true,
        "outgoing" => false,
        _ => return Err(StatusCode::BAD_REQUEST),
    };

    // Run the join-heavy listing off the async runtime
    let rows = tokio::task::spawn_blocking(move || {
        if incoming {
            db.db.list_requests_incoming(&uid)
        } else {
            db.db.list_requests_outgoing(&uid)
        }
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let requests: Vec<_> = rows.into_iter().map(convert::request_from_row).collect();
    Ok(Json(requests))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rid = request_id.to_string();
    let row = load_request_for_party(&state, &rid, &claims)?;

    let history = state
        .db
        .list_history(&rid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_iter()
        .map(convert::history_from_row)
        .collect();

    Ok(Json(RequestDetailResponse {
        request: convert::request_from_row(row),
        history,
    }))
}

/// Tool owner approves a pending request.
pub async fn approve(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rid = request_id.to_string();
    let row = load_request_as_owner(&state, &rid, &claims)?;

    transition(&state, &rid, RequestStatus::Approved)?;

    record_side_effects(
        &state,
        &row,
        Some(&row.owner_id),
        "approved",
        None,
        &row.borrower_id,
        NotificationKind::RequestApproved,
        &format!("Your request for {} was approved", row.tool_name),
    );

    fetch_updated(&state, &rid)
}

/// Tool owner denies a pending request.
pub async fn deny(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rid = request_id.to_string();
    let row = load_request_as_owner(&state, &rid, &claims)?;

    transition(&state, &rid, RequestStatus::Denied)?;

    record_side_effects(
        &state,
        &row,
        Some(&row.owner_id),
        "denied",
        None,
        &row.borrower_id,
        NotificationKind::RequestDenied,
        &format!("Your request for {} was denied", row.tool_name),
    );

    fetch_updated(&state, &rid)
}

/// Borrower cancels before pickup.
pub async fn cancel(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rid = request_id.to_string();
    let row = load_request_as_borrower(&state, &rid, &claims)?;

    transition(&state, &rid, RequestStatus::Canceled)?;

    record_side_effects(
        &state,
        &row,
        Some(&row.borrower_id),
        "canceled",
        None,
        &row.owner_id,
        NotificationKind::RequestCanceled,
        &format!(
            "{} canceled the request for {}",
            row.borrower_name, row.tool_name
        ),
    );

    fetch_updated(&state, &rid)
}

/// Borrower confirms they picked the tool up. Flips the tool to borrowed.
pub async fn confirm_pickup(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rid = request_id.to_string();
    let row = load_request_as_borrower(&state, &rid, &claims)?;

    let applied = state.db.confirm_pickup(&rid).map_err(|e| {
        error!("DB confirm_pickup error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if !applied {
        return Err(StatusCode::CONFLICT);
    }

    if let Err(e) = state.db.set_tool_status(&row.tool_id, ToolStatus::Borrowed.as_str()) {
        warn!("Tool status update failed for {}: {}", row.tool_id, e);
    }

    record_side_effects(
        &state,
        &row,
        Some(&row.borrower_id),
        "picked_up",
        None,
        &row.owner_id,
        NotificationKind::RequestPickedUp,
        &format!("{} picked up {}", row.borrower_name, row.tool_name),
    );

    fetch_updated(&state, &rid)
}

/// Borrower starts the hand-back.
pub async fn initiate_return(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rid = request_id.to_string();
    let row = load_request_as_borrower(&state, &rid, &claims)?;

    transition(&state, &rid, RequestStatus::ReturnPending)?;

    record_side_effects(
        &state,
        &row,
        Some(&row.borrower_id),
        "return_pending",
        None,
        &row.owner_id,
        NotificationKind::ReturnInitiated,
        &format!(
            "{} wants to return {}",
            row.borrower_name, row.tool_name
        ),
    );

    fetch_updated(&state, &rid)
}

/// Tool owner confirms the return, optionally with condition notes. Flips
/// the tool back to available.
pub async fn confirm_return(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmReturnRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let rid = request_id.to_string();
    let row = load_request_as_owner(&state, &rid, &claims)?;

    let applied = state
        .db
        .confirm_return(&rid, req.notes.as_deref())
        .map_err(|e| {
            error!("DB confirm_return error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !applied {
        return Err(StatusCode::CONFLICT);
    }

    if let Err(e) = state.db.set_tool_status(&row.tool_id, ToolStatus::Available.as_str()) {
        warn!("Tool status update failed for {}: {}", row.tool_id, e);
    }

    record_side_effects(
        &state,
        &row,
        Some(&row.owner_id),
        "returned",
        req.notes.as_deref(),
        &row.borrower_id,
        NotificationKind::ReturnConfirmed,
        &format!("Return of {} was confirmed", row.tool_name),
    );

    fetch_updated(&state, &rid)
}

/// On-demand overdue sweep, callable by any authenticated client on page
/// load. The server also runs it on an interval.
pub async fn mark_overdue(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let flipped = tokio::task::spawn_blocking(move || run_overdue_sweep(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Overdue sweep error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(MarkOverdueResponse { marked: flipped }))
}

/// Flip past-due requests and notify both parties. Shared by the endpoint
/// and the background sweep.
pub fn run_overdue_sweep(state: &AppState) -> anyhow::Result<usize> {
    let flipped = state.db.mark_overdue()?;

    for row in &flipped {
        if let Err(e) = state.db.insert_history(
            &Uuid::new_v4().to_string(),
            &row.request_id,
            None,
            "overdue",
            None,
        ) {
            warn!("History write failed for {}: {}", row.request_id, e);
        }

        for user_id in [&row.borrower_id, &row.owner_id] {
            if let Err(e) = state.db.insert_notification(
                &Uuid::new_v4().to_string(),
                user_id,
                NotificationKind::RequestOverdue.as_str(),
                &format!("{} is overdue", row.tool_name),
                None,
                Some(&row.request_id),
                None,
            ) {
                warn!("Overdue notification failed for {}: {}", row.request_id, e);
            }
        }
    }

    Ok(flipped.len())
}

// -- helpers --

/// Guarded transition; the allowed source states come from
/// [`RequestStatus::sources_of`]. A stale source state means someone else
/// got there first and the caller sees 409 instead of a silent overwrite.
fn transition(state: &AppState, request_id: &str, to: RequestStatus) -> Result<(), StatusCode> {
    let applied = state
        .db
        .transition_request(request_id, to)
        .map_err(|e| {
            error!("DB transition_request error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if applied { Ok(()) } else { Err(StatusCode::CONFLICT) }
}

/// History row plus counterparty notification. Deliberately best-effort and
/// separate from the status write; failures are logged, never rolled back.
#[allow(clippy::too_many_arguments)]
fn record_side_effects(
    state: &AppState,
    row: &RequestRow,
    actor_id: Option<&str>,
    event: &str,
    notes: Option<&str>,
    notify_user: &str,
    kind: NotificationKind,
    title: &str,
) {
    if let Err(e) = state.db.insert_history(
        &Uuid::new_v4().to_string(),
        &row.id,
        actor_id,
        event,
        notes,
    ) {
        warn!("History write failed for {}: {}", row.id, e);
    }

    if let Err(e) = state.db.insert_notification(
        &Uuid::new_v4().to_string(),
        notify_user,
        kind.as_str(),
        title,
        row.message.as_deref(),
        Some(&row.id),
        None,
    ) {
        warn!("Notification write failed for {}: {}", row.id, e);
    }
}

fn load_request_for_party(
    state: &AppState,
    request_id: &str,
    claims: &Claims,
) -> Result<RequestRow, StatusCode> {
    let row = state
        .db
        .get_request(request_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let uid = claims.sub.to_string();
    if row.borrower_id != uid && row.owner_id != uid {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(row)
}

fn load_request_as_owner(
    state: &AppState,
    request_id: &str,
    claims: &Claims,
) -> Result<RequestRow, StatusCode> {
    let row = load_request_for_party(state, request_id, claims)?;
    if row.owner_id != claims.sub.to_string() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(row)
}

fn load_request_as_borrower(
    state: &AppState,
    request_id: &str,
    claims: &Claims,
) -> Result<RequestRow, StatusCode> {
    let row = load_request_for_party(state, request_id, claims)?;
    if row.borrower_id != claims.sub.to_string() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(row)
}

fn fetch_updated(state: &AppState, request_id: &str) -> Result<impl IntoResponse + use<>, StatusCode> {
    let row = state
        .db
        .get_request(request_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(convert::request_from_row(row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AppStateInner;
    use buddy_db::Database;
    use chrono::{Days, Utc};
    use std::sync::Arc;

    struct Party {
        id: Uuid,
        email: &'static str,
    }

    fn state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            analysis: None,
        })
    }

    fn claims(party: &Party) -> Claims {
        Claims {
            sub: party.id,
            email: party.email.into(),
            exp: 0,
        }
    }

    /// Owner, borrower and one pending request for the owner's drill.
    fn seed(state: &AppState, end_date: &str) -> (Party, Party, Uuid) {
        let owner = Party {
            id: Uuid::new_v4(),
            email: "owner@example.com",
        };
        let borrower = Party {
            id: Uuid::new_v4(),
            email: "borrower@example.com",
        };
        let tool = Uuid::new_v4();
        let request = Uuid::new_v4();

        state
            .db
            .create_user(&owner.id.to_string(), owner.email, "argon2-hash", "Olive")
            .unwrap();
        state
            .db
            .create_user(
                &borrower.id.to_string(),
                borrower.email,
                "argon2-hash",
                "Bram",
            )
            .unwrap();
        state
            .db
            .create_tool(
                &tool.to_string(),
                &owner.id.to_string(),
                "Cordless Drill",
                None,
                1,
                None,
                None,
                None,
                None,
            )
            .unwrap();
        state
            .db
            .create_request(
                &request.to_string(),
                &tool.to_string(),
                &borrower.id.to_string(),
                "2026-01-01",
                end_date,
                None,
            )
            .unwrap();

        (owner, borrower, request)
    }

    fn kinds_for(state: &AppState, user: &Party) -> Vec<String> {
        state
            .db
            .list_notifications(&user.id.to_string(), 50)
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect()
    }

    #[tokio::test]
    async fn approve_notifies_borrower() {
        let state = state();
        let (owner, borrower, request) = seed(&state, "2099-01-01");

        let res = approve(
            State(state.clone()),
            Path(request),
            Extension(claims(&owner)),
        )
        .await;
        assert!(res.is_ok());

        assert_eq!(kinds_for(&state, &borrower), vec!["request_approved"]);
        assert!(kinds_for(&state, &owner).is_empty());
    }

    #[tokio::test]
    async fn deny_notifies_borrower() {
        let state = state();
        let (owner, borrower, request) = seed(&state, "2099-01-01");

        let res = deny(
            State(state.clone()),
            Path(request),
            Extension(claims(&owner)),
        )
        .await;
        assert!(res.is_ok());

        assert_eq!(kinds_for(&state, &borrower), vec!["request_denied"]);
    }

    #[tokio::test]
    async fn overdue_sweep_notifies_both_parties() {
        let state = state();
        let yesterday = (Utc::now().date_naive() - Days::new(1)).to_string();
        let (owner, borrower, request) = seed(&state, &yesterday);

        let rid = request.to_string();
        state
            .db
            .transition_request(&rid, RequestStatus::Approved)
            .unwrap();
        state.db.confirm_pickup(&rid).unwrap();

        let flipped = run_overdue_sweep(&state).unwrap();
        assert_eq!(flipped, 1);

        for party in [&borrower, &owner] {
            assert!(kinds_for(&state, party).contains(&"request_overdue".to_string()));
        }

        let history = state.db.list_history(&rid).unwrap();
        assert!(history.iter().any(|h| h.event == "overdue"));

        // A second sweep flips nothing and sends nothing new
        assert_eq!(run_overdue_sweep(&state).unwrap(), 0);
        assert_eq!(kinds_for(&state, &borrower).len(), 1);
    }
}
