mod overdue;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use buddy_api::auth::{self, AppState, AppStateInner};
use buddy_api::middleware::require_auth;
use buddy_api::{analysis, groups, invites, notifications, profiles, requests, search, tools};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "borrowbuddy=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("BUDDY_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("BUDDY_DB_PATH").unwrap_or_else(|_| "borrowbuddy.db".into());
    let host = std::env::var("BUDDY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BUDDY_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let sweep_secs: u64 = std::env::var("BUDDY_OVERDUE_SWEEP_SECS")
        .unwrap_or_else(|_| "3600".into())
        .parse()?;

    // The analysis proxy is optional; without an endpoint the handlers
    // answer 503.
    let analysis_client = std::env::var("BUDDY_ANALYSIS_URL").ok().map(|url| {
        let key = std::env::var("BUDDY_ANALYSIS_KEY").ok();
        analysis::AnalysisClient::new(url, key)
    });

    // Init database
    let db = buddy_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        analysis: analysis_client,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/profile", get(profiles::get_profile).put(profiles::update_profile))
        .route("/users/{user_id}/preferences", get(profiles::get_preferences))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/{group_id}", get(groups::get_group).delete(groups::delete_group))
        .route("/groups/{group_id}/leave", post(groups::leave_group))
        .route("/groups/{group_id}/members", get(groups::list_members))
        .route(
            "/groups/{group_id}/members/{user_id}/role",
            put(groups::change_member_role),
        )
        .route(
            "/groups/{group_id}/members/{user_id}",
            axum::routing::delete(groups::remove_member),
        )
        .route("/groups/{group_id}/invites", post(invites::create_invite))
        .route("/invites/{code}", get(invites::get_invite))
        .route("/invites/{code}/accept", post(invites::accept_invite))
        .route("/invites/{code}/decline", post(invites::decline_invite))
        .route("/categories", get(tools::list_categories))
        .route("/tools", get(tools::list_my_tools).post(tools::create_tool))
        .route("/tools/visible", get(tools::list_visible_tools))
        .route(
            "/tools/{tool_id}",
            get(tools::get_tool)
                .put(tools::update_tool)
                .delete(tools::delete_tool),
        )
        .route("/tools/{tool_id}/visibility", put(tools::set_visibility))
        .route("/tools/{tool_id}/requests", post(requests::create_request))
        .route("/requests", get(requests::list_requests))
        .route("/requests/{request_id}", get(requests::get_request))
        .route("/requests/{request_id}/approve", post(requests::approve))
        .route("/requests/{request_id}/deny", post(requests::deny))
        .route("/requests/{request_id}/cancel", post(requests::cancel))
        .route("/requests/{request_id}/pickup", post(requests::confirm_pickup))
        .route(
            "/requests/{request_id}/return/initiate",
            post(requests::initiate_return),
        )
        .route(
            "/requests/{request_id}/return/confirm",
            post(requests::confirm_return),
        )
        .route("/requests/mark-overdue", post(requests::mark_overdue))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/search", get(search::search))
        .route("/analysis/tool-image", post(analysis::analyze_tool_image))
        .route("/analysis/thumbnails", post(analysis::generate_thumbnails))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Background overdue sweep
    tokio::spawn(overdue::run_sweep_loop(app_state.clone(), sweep_secs));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Borrow Buddy server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
