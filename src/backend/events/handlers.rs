/**
 * Event Handlers
 *
 * `ActivityRecorder` appends one activity log row per event.
 * `Notifier` persists a notification for whoever should hear about the
 * event and pushes it to that user's live notification connections.
 */

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::backend::comments::repository::ThreadRepository;
use crate::backend::error::DomainError;
use crate::backend::events::{DomainEvent, EventHandler};
use crate::backend::realtime::Hub;
use crate::shared::{ActivityEntry, ActivityPayload, EventType, Notification, NotificationPayload};

pub struct ActivityRecorder {
    repo: Arc<dyn ThreadRepository>,
}

impl ActivityRecorder {
    pub fn new(repo: Arc<dyn ThreadRepository>) -> Self {
        Self { repo }
    }
}

fn activity_payload(event: &DomainEvent) -> ActivityPayload {
    match event {
        DomainEvent::CommentAdded { comment_id, .. } => ActivityPayload::Commented {
            comment_id: *comment_id,
        },
        DomainEvent::CommentEdited {
            comment_id, old, new, ..
        } => ActivityPayload::CommentEdited {
            comment_id: *comment_id,
            old: old.clone(),
            new: new.clone(),
        },
        DomainEvent::CommentDeleted { comment_id, .. } => ActivityPayload::CommentDeleted {
            comment_id: *comment_id,
        },
        DomainEvent::UserMentioned {
            comment_id,
            mentioned_user_id,
            ..
        } => ActivityPayload::Mentioned {
            comment_id: *comment_id,
            mentioned_user: *mentioned_user_id,
        },
    }
}

#[async_trait]
impl EventHandler for ActivityRecorder {
    fn name(&self) -> &'static str {
        "activity"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), DomainError> {
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            issue_id: event.issue_id(),
            user_id: event.actor_id(),
            payload: activity_payload(event),
            created_at: Utc::now(),
        };
        self.repo.record_activity(&entry).await
    }
}

pub struct Notifier {
    repo: Arc<dyn ThreadRepository>,
    users: Hub<Uuid>,
}

impl Notifier {
    /// `users` is the hub keyed by user id that notification sockets join
    pub fn new(repo: Arc<dyn ThreadRepository>, users: Hub<Uuid>) -> Self {
        Self { repo, users }
    }
}

/// Who to notify about `event`, and what to tell them
fn notification_for(event: &DomainEvent) -> Option<Notification> {
    let (user_id, title, message, payload) = match event {
        DomainEvent::CommentAdded {
            issue_id,
            comment_id,
            actor_id,
            issue_title,
            assignee: Some(assignee),
        } if assignee != actor_id => (
            *assignee,
            "New Comment".to_string(),
            format!("A new comment was added on \"{}\"", issue_title),
            NotificationPayload::NewComment {
                issue_id: *issue_id,
                comment_id: *comment_id,
            },
        ),
        DomainEvent::UserMentioned {
            issue_id,
            comment_id,
            actor_id,
            mentioned_user_id,
            issue_title,
        } => (
            *mentioned_user_id,
            "You were mentioned".to_string(),
            format!("You were mentioned in a comment on \"{}\"", issue_title),
            NotificationPayload::Mentioned {
                issue_id: *issue_id,
                comment_id: *comment_id,
                mentioned_by: *actor_id,
            },
        ),
        _ => return None,
    };

    Some(Notification {
        id: Uuid::new_v4(),
        user_id,
        title,
        message,
        payload,
        is_read: false,
        created_at: Utc::now(),
    })
}

#[async_trait]
impl EventHandler for Notifier {
    fn name(&self) -> &'static str {
        "notifier"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), DomainError> {
        let Some(notification) = notification_for(event) else {
            return Ok(());
        };

        self.repo.insert_notification(&notification).await?;

        let user_id = notification.user_id;
        if let Err(err) = self
            .users
            .emit(&user_id, EventType::Notification, event.actor_id(), &notification)
            .await
        {
            tracing::warn!("[Events] Could not push notification to {}: {}", user_id, err);
        }
        Ok(())
    }
}
