use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use buddy_types::api::Claims;

use crate::auth::AppState;
use crate::convert;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    /// Defaults to the top-5 preview shown in the search dropdown.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    5
}

/// Substring search over the tools shared into the caller's groups.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let q = query.q.trim().to_string();
    if q.is_empty() {
        return Ok(Json(vec![]));
    }

    let db = state.clone();
    let uid = claims.sub.to_string();
    let limit = query.limit.clamp(1, 50);

    let rows = tokio::task::spawn_blocking(move || db.db.search_tools(&uid, &q, limit))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results: Vec<_> = rows.into_iter().map(convert::search_from_row).collect();
    Ok(Json(results))
}
