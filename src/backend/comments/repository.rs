/**
 * Thread Repository
 *
 * Storage for issue comments and everything hanging off them: activity
 * log rows and per-user notifications. Issues and users are read-only
 * here; they are owned by the rest of the application.
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::error::DomainError;
use crate::shared::{ActivityEntry, ActivityPayload, Comment, Issue, Notification, NotificationPayload};

#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn find_issue(&self, issue_id: Uuid) -> Result<Option<Issue>, DomainError>;

    /// Resolve a `@username` mention
    async fn find_user_by_username(&self, username: &str) -> Result<Option<Uuid>, DomainError>;

    async fn insert_comment(&self, comment: &Comment) -> Result<(), DomainError>;

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, DomainError>;

    /// Replace the body and stamp `updated_at`
    async fn update_comment(&self, comment_id: Uuid, body: &str) -> Result<Option<Comment>, DomainError>;

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, DomainError>;

    /// Oldest first
    async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<Comment>, DomainError>;

    async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), DomainError>;

    /// Oldest first
    async fn list_activity(&self, issue_id: Uuid) -> Result<Vec<ActivityEntry>, DomainError>;

    async fn insert_notification(&self, notification: &Notification) -> Result<(), DomainError>;

    /// Newest first
    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, DomainError>;

    /// Returns `false` when the notification does not exist or belongs to someone else
    async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, DomainError>;

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, DomainError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

#[derive(FromRow)]
struct IssueRow {
    id: Uuid,
    project_id: Uuid,
    title: String,
    assigned_to: Option<Uuid>,
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    issue_id: Uuid,
    user_id: Uuid,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            issue_id: row.issue_id,
            user_id: row.user_id,
            body: row.body,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ActivityRow {
    id: Uuid,
    issue_id: Uuid,
    user_id: Uuid,
    action: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for ActivityEntry {
    type Error = DomainError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let payload: ActivityPayload = serde_json::from_value(serde_json::json!({
            "action": row.action,
            "metadata": row.metadata,
        }))?;
        Ok(ActivityEntry {
            id: row.id,
            issue_id: row.issue_id,
            user_id: row.user_id,
            payload,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    kind: String,
    metadata: serde_json::Value,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let payload: NotificationPayload = serde_json::from_value(serde_json::json!({
            "kind": row.kind,
            "metadata": row.metadata,
        }))?;
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            payload,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

/// The `metadata` half of an adjacently tagged payload
fn metadata_of<T: serde::Serialize>(payload: &T) -> Result<serde_json::Value, DomainError> {
    let mut value = serde_json::to_value(payload)?;
    Ok(value
        .get_mut("metadata")
        .map(serde_json::Value::take)
        .unwrap_or(serde_json::Value::Null))
}

#[derive(Clone)]
pub struct PgThreadRepository {
    pool: PgPool,
}

impl PgThreadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThreadRepository for PgThreadRepository {
    async fn find_issue(&self, issue_id: Uuid) -> Result<Option<Issue>, DomainError> {
        let row = sqlx::query_as::<_, IssueRow>(
            "SELECT id, project_id, title, assigned_to FROM issues WHERE id = $1",
        )
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Issue {
            id: r.id,
            project_id: r.project_id,
            title: r.title,
            assigned_to: r.assigned_to,
        }))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<Uuid>, DomainError> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO issue_comments (id, issue_id, user_id, body, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(comment.id)
        .bind(comment.issue_id)
        .bind(comment.user_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, DomainError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, issue_id, user_id, body, created_at, updated_at
             FROM issue_comments WHERE id = $1",
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Comment::from))
    }

    async fn update_comment(&self, comment_id: Uuid, body: &str) -> Result<Option<Comment>, DomainError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "UPDATE issue_comments SET body = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING id, issue_id, user_id, body, created_at, updated_at",
        )
        .bind(comment_id)
        .bind(body)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Comment::from))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM issue_comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT id, issue_id, user_id, body, created_at, updated_at
             FROM issue_comments WHERE issue_id = $1
             ORDER BY created_at ASC",
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), DomainError> {
        let metadata = metadata_of(&entry.payload)?;
        sqlx::query(
            "INSERT INTO activity_logs (id, issue_id, user_id, action, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(entry.issue_id)
        .bind(entry.user_id)
        .bind(entry.payload.action())
        .bind(metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_activity(&self, issue_id: Uuid) -> Result<Vec<ActivityEntry>, DomainError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, issue_id, user_id, action, metadata, created_at
             FROM activity_logs WHERE issue_id = $1
             ORDER BY created_at ASC",
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ActivityEntry::try_from).collect()
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), DomainError> {
        let metadata = metadata_of(&notification.payload)?;
        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, message, kind, metadata, is_read, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.payload.kind())
        .bind(metadata)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, DomainError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, user_id, title, message, kind, metadata, is_read, created_at
             FROM notifications WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, DomainError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ThreadData {
    issues: HashMap<Uuid, Issue>,
    users: HashMap<String, Uuid>,
    comments: HashMap<Uuid, Comment>,
    activity: Vec<ActivityEntry>,
    notifications: Vec<Notification>,
}

/// Thread storage kept in memory, used when no database is configured
#[derive(Clone, Default)]
pub struct MemoryThreadRepository {
    data: Arc<RwLock<ThreadData>>,
}

impl MemoryThreadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_issue(&self, issue: Issue) {
        self.data.write().await.issues.insert(issue.id, issue);
    }

    pub async fn add_user(&self, username: &str, user_id: Uuid) {
        self.data.write().await.users.insert(username.to_string(), user_id);
    }
}

#[async_trait]
impl ThreadRepository for MemoryThreadRepository {
    async fn find_issue(&self, issue_id: Uuid) -> Result<Option<Issue>, DomainError> {
        Ok(self.data.read().await.issues.get(&issue_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<Uuid>, DomainError> {
        Ok(self.data.read().await.users.get(username).copied())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), DomainError> {
        self.data.write().await.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, DomainError> {
        Ok(self.data.read().await.comments.get(&comment_id).cloned())
    }

    async fn update_comment(&self, comment_id: Uuid, body: &str) -> Result<Option<Comment>, DomainError> {
        let mut data = self.data.write().await;
        Ok(data.comments.get_mut(&comment_id).map(|comment| {
            comment.body = body.to_string();
            comment.updated_at = Some(Utc::now());
            comment.clone()
        }))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.data.write().await.comments.remove(&comment_id).is_some())
    }

    async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        let data = self.data.read().await;
        let mut comments: Vec<Comment> = data
            .comments
            .values()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), DomainError> {
        self.data.write().await.activity.push(entry.clone());
        Ok(())
    }

    async fn list_activity(&self, issue_id: Uuid) -> Result<Vec<ActivityEntry>, DomainError> {
        let data = self.data.read().await;
        Ok(data
            .activity
            .iter()
            .filter(|a| a.issue_id == issue_id)
            .cloned()
            .collect())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), DomainError> {
        self.data.write().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, DomainError> {
        let data = self.data.read().await;
        Ok(data
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let mut data = self.data.write().await;
        match data
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, DomainError> {
        let mut data = self.data.write().await;
        let mut updated = 0;
        for notification in data
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }
}
