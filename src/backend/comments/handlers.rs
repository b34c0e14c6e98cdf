/**
 * Comment and Notification HTTP Handlers
 */

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::{ActivityEntry, Comment, Notification};

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn list_comments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(issue_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, BackendError> {
    Ok(Json(state.threads.list_comments(issue_id, user.user_id).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(issue_id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), BackendError> {
    let comment = state
        .threads
        .create_comment(issue_id, user.user_id, &request.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Edit a comment (author only, 403 otherwise)
pub async fn update_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<Comment>, BackendError> {
    let comment = state
        .threads
        .update_comment(comment_id, user.user_id, &request.body)
        .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, BackendError> {
    state.threads.delete_comment(comment_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_activity(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(issue_id): Path<Uuid>,
) -> Result<Json<Vec<ActivityEntry>>, BackendError> {
    Ok(Json(state.threads.list_activity(issue_id, user.user_id).await?))
}

/// The caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Notification>>, BackendError> {
    Ok(Json(state.threads.notifications(user.user_id).await?))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, BackendError> {
    state
        .threads
        .mark_notification_read(notification_id, user.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MarkedRead>, BackendError> {
    let updated = state.threads.mark_all_notifications_read(user.user_id).await?;
    Ok(Json(MarkedRead { updated }))
}
