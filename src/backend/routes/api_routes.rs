/**
 * API Routes
 *
 * Every route here requires a bearer token; `create_router` wraps them in
 * `auth_middleware`.
 *
 * # Routes
 *
 * ## Kanban
 * - `GET /api/projects/{project_id}/kanban` - Board snapshot
 * - `POST /api/projects/{project_id}/columns` - Create column
 * - `PATCH /api/projects/{project_id}/columns/reorder` - Move column
 * - `PATCH /api/projects/{project_id}/columns/{column_id}` - Rename column
 * - `DELETE /api/projects/{project_id}/columns/{column_id}` - Delete column and cards
 * - `POST /api/projects/{project_id}/columns/{column_id}/cards` - Create card
 * - `PATCH /api/kanban/cards/{card_id}/move` - Move card
 * - `DELETE /api/kanban/cards/{card_id}` - Delete card
 *
 * ## Comments
 * - `GET|POST /api/issues/{issue_id}/comments`
 * - `GET /api/issues/{issue_id}/activity`
 * - `PATCH|DELETE /api/comments/{comment_id}`
 *
 * ## Notifications
 * - `GET /api/notifications`
 * - `PATCH /api/notifications/{notification_id}/read`
 * - `PATCH /api/notifications/read-all`
 */

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::backend::board::handlers as board;
use crate::backend::comments::handlers as comments;
use crate::backend::server::state::AppState;

/// Configure kanban routes
pub fn configure_board_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/projects/{project_id}/kanban", get(board::get_board))
        .route("/api/projects/{project_id}/columns", post(board::create_column))
        .route(
            "/api/projects/{project_id}/columns/reorder",
            patch(board::reorder_column),
        )
        .route(
            "/api/projects/{project_id}/columns/{column_id}",
            patch(board::rename_column).delete(board::delete_column),
        )
        .route(
            "/api/projects/{project_id}/columns/{column_id}/cards",
            post(board::create_card),
        )
        .route("/api/kanban/cards/{card_id}/move", patch(board::move_card))
        .route("/api/kanban/cards/{card_id}", delete(board::delete_card))
}

/// Configure comment and notification routes
pub fn configure_thread_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/issues/{issue_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/api/issues/{issue_id}/activity", get(comments::list_activity))
        .route(
            "/api/comments/{comment_id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/api/notifications", get(comments::list_notifications))
        .route(
            "/api/notifications/read-all",
            patch(comments::mark_all_notifications_read),
        )
        .route(
            "/api/notifications/{notification_id}/read",
            patch(comments::mark_notification_read),
        )
}
