/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Groups
 *
 * 1. `/health` - public
 * 2. `/ws/...` - WebSocket upgrades, authenticated inside each handler
 *    because browsers cannot set headers on upgrade requests
 * 3. `/api/...` - behind `auth_middleware`
 *
 * Request tracing and CORS wrap everything.
 */

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::middleware::auth_middleware;
use crate::backend::realtime::subscription::{board_socket, notification_socket, thread_socket};
use crate::backend::routes::api_routes::{configure_board_routes, configure_thread_routes};
use crate::backend::server::state::AppState;

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "storage": state.storage,
        "rooms": {
            "board": state.hubs.board.room_count(),
            "thread": state.hubs.thread.room_count(),
            "user": state.hubs.user.room_count(),
        }
    }))
}

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Services, hubs and connection settings
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub fn create_router(app_state: AppState) -> Router<()> {
    let api = configure_thread_routes(configure_board_routes(Router::new())).route_layer(
        middleware::from_fn_with_state(app_state.clone(), auth_middleware),
    );

    Router::new()
        .route("/health", get(health))
        .route("/ws/projects/{project_id}", get(board_socket))
        .route("/ws/issues/{issue_id}", get(thread_socket))
        .route("/ws/notifications", get(notification_socket))
        .merge(api)
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
