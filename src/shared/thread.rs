//! Issue thread types: comments, activity log entries and notifications.
//!
//! Activity and notification records carry a tagged union instead of a
//! free-form map, so every action owns a concrete metadata shape while
//! still sharing one log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An issue, as far as comment threads care about it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub assigned_to: Option<Uuid>,
}

/// A comment on an issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload of a `comment_deleted` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentRemoved {
    pub id: Uuid,
}

/// Payload of a `mention` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mention {
    pub mentioned_user_id: Uuid,
    pub comment_id: Uuid,
}

/// What happened, with the metadata that belongs to it
///
/// Serialized as `{"action": "...", "metadata": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", content = "metadata", rename_all = "snake_case")]
pub enum ActivityPayload {
    Commented { comment_id: Uuid },
    CommentEdited { comment_id: Uuid, old: String, new: String },
    CommentDeleted { comment_id: Uuid },
    Mentioned { comment_id: Uuid, mentioned_user: Uuid },
}

impl ActivityPayload {
    /// The action name stored in the `action` column
    pub fn action(&self) -> &'static str {
        match self {
            Self::Commented { .. } => "commented",
            Self::CommentEdited { .. } => "comment_edited",
            Self::CommentDeleted { .. } => "comment_deleted",
            Self::Mentioned { .. } => "mentioned",
        }
    }
}

/// One row of an issue's activity log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub payload: ActivityPayload,
    pub created_at: DateTime<Utc>,
}

/// Notification metadata, one shape per kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "metadata", rename_all = "snake_case")]
pub enum NotificationPayload {
    NewComment { issue_id: Uuid, comment_id: Uuid },
    Mentioned { issue_id: Uuid, comment_id: Uuid, mentioned_by: Uuid },
}

impl NotificationPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewComment { .. } => "new_comment",
            Self::Mentioned { .. } => "mentioned",
        }
    }
}

/// An in-app notification for a single user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(flatten)]
    pub payload: NotificationPayload,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
