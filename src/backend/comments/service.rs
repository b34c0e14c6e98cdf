/**
 * Comment Thread Service
 *
 * Comments are plain CRUD with two side channels:
 *
 * - a realtime envelope to everyone watching the issue's thread room
 * - domain events (activity log, notifications) queued on the dispatcher
 *
 * Both happen after the write succeeded and neither can fail the request.
 * `@username` mentions are resolved to project members and pushed to the
 * mentioned users' thread connections directly.
 */

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::backend::board::membership::{require_member, MembershipAuthority};
use crate::backend::comments::mentions::extract_mentions;
use crate::backend::comments::repository::ThreadRepository;
use crate::backend::error::DomainError;
use crate::backend::events::{Dispatcher, DomainEvent};
use crate::backend::realtime::Hub;
use crate::shared::thread::{CommentRemoved, Mention};
use crate::shared::{ActivityEntry, Comment, EventType, Issue, Notification, RealtimeEvent};

fn required_body(body: &str) -> Result<String, DomainError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(DomainError::validation("body", "comment cannot be empty"));
    }
    Ok(body.to_string())
}

#[derive(Clone)]
pub struct ThreadService {
    repo: Arc<dyn ThreadRepository>,
    members: Arc<dyn MembershipAuthority>,
    threads: Hub<Uuid>,
    dispatcher: Dispatcher,
}

impl ThreadService {
    /// `threads` is the hub keyed by issue id
    pub fn new(
        repo: Arc<dyn ThreadRepository>,
        members: Arc<dyn MembershipAuthority>,
        threads: Hub<Uuid>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            repo,
            members,
            threads,
            dispatcher,
        }
    }

    /// The issue, if it exists and `actor` may see its thread
    pub async fn authorize_issue(&self, issue_id: Uuid, actor: Uuid) -> Result<Issue, DomainError> {
        let issue = self
            .repo
            .find_issue(issue_id)
            .await?
            .ok_or_else(|| DomainError::not_found("issue", issue_id))?;
        require_member(self.members.as_ref(), issue.project_id, actor).await?;
        Ok(issue)
    }

    async fn owned_comment(&self, comment_id: Uuid, actor: Uuid, verb: &str) -> Result<Comment, DomainError> {
        let comment = self
            .repo
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", comment_id))?;
        if comment.user_id != actor {
            return Err(DomainError::not_permitted(format!(
                "only the author can {} this comment",
                verb
            )));
        }
        Ok(comment)
    }

    pub async fn create_comment(&self, issue_id: Uuid, actor: Uuid, body: &str) -> Result<Comment, DomainError> {
        let body = required_body(body)?;
        let issue = self.authorize_issue(issue_id, actor).await?;

        let comment = Comment {
            id: Uuid::new_v4(),
            issue_id,
            user_id: actor,
            body,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.repo.insert_comment(&comment).await?;
        tracing::info!("[Comments] Comment {} added to issue {} by {}", comment.id, issue_id, actor);

        self.publish(issue_id, EventType::CommentCreated, actor, &comment).await;
        let _ = self.dispatcher.dispatch(DomainEvent::CommentAdded {
            issue_id,
            comment_id: comment.id,
            actor_id: actor,
            issue_title: issue.title.clone(),
            assignee: issue.assigned_to,
        });
        self.announce_mentions(&issue, &comment, &[]).await;

        Ok(comment)
    }

    /// Replace a comment's body; only its author may
    pub async fn update_comment(&self, comment_id: Uuid, actor: Uuid, body: &str) -> Result<Comment, DomainError> {
        let body = required_body(body)?;
        let existing = self.owned_comment(comment_id, actor, "edit").await?;
        let issue = self.authorize_issue(existing.issue_id, actor).await?;

        let updated = self
            .repo
            .update_comment(comment_id, &body)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", comment_id))?;
        tracing::info!("[Comments] Comment {} edited by {}", comment_id, actor);

        self.publish(issue.id, EventType::CommentUpdated, actor, &updated).await;
        let _ = self.dispatcher.dispatch(DomainEvent::CommentEdited {
            issue_id: issue.id,
            comment_id,
            actor_id: actor,
            old: existing.body.clone(),
            new: updated.body.clone(),
        });
        // Only people newly mentioned by the edit hear about it.
        let already = extract_mentions(&existing.body);
        self.announce_mentions(&issue, &updated, &already).await;

        Ok(updated)
    }

    /// Delete a comment; only its author may
    pub async fn delete_comment(&self, comment_id: Uuid, actor: Uuid) -> Result<(), DomainError> {
        let existing = self.owned_comment(comment_id, actor, "delete").await?;

        if !self.repo.delete_comment(comment_id).await? {
            return Err(DomainError::not_found("comment", comment_id));
        }
        tracing::info!("[Comments] Comment {} deleted by {}", comment_id, actor);

        self.publish(
            existing.issue_id,
            EventType::CommentDeleted,
            actor,
            &CommentRemoved { id: comment_id },
        )
        .await;
        let _ = self.dispatcher.dispatch(DomainEvent::CommentDeleted {
            issue_id: existing.issue_id,
            comment_id,
            actor_id: actor,
        });
        Ok(())
    }

    pub async fn list_comments(&self, issue_id: Uuid, actor: Uuid) -> Result<Vec<Comment>, DomainError> {
        self.authorize_issue(issue_id, actor).await?;
        self.repo.list_comments(issue_id).await
    }

    pub async fn list_activity(&self, issue_id: Uuid, actor: Uuid) -> Result<Vec<ActivityEntry>, DomainError> {
        self.authorize_issue(issue_id, actor).await?;
        self.repo.list_activity(issue_id).await
    }

    pub async fn notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, DomainError> {
        self.repo.list_notifications(user_id).await
    }

    pub async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<(), DomainError> {
        if self.repo.mark_notification_read(notification_id, user_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("notification", notification_id))
        }
    }

    pub async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, DomainError> {
        self.repo.mark_all_notifications_read(user_id).await
    }

    /// Relay an ephemeral frame (typing indicator) to an issue's thread room
    pub async fn relay_typing(&self, issue_id: Uuid, actor: Uuid, payload: &serde_json::Value) {
        self.publish(issue_id, EventType::Typing, actor, payload).await;
    }

    async fn publish<P: Serialize>(&self, issue_id: Uuid, event_type: EventType, actor: Uuid, payload: &P) {
        if let Err(err) = self.threads.emit(&issue_id, event_type, actor, payload).await {
            tracing::warn!("[Comments] Could not broadcast {} for issue {}: {}", event_type, issue_id, err);
        }
    }

    /// Project members mentioned in `body`, minus the author and anyone in `skip`
    async fn resolve_mentions(
        &self,
        issue: &Issue,
        author: Uuid,
        body: &str,
        skip: &[String],
    ) -> Result<Vec<Uuid>, DomainError> {
        let mut resolved = Vec::new();
        for username in extract_mentions(body) {
            if skip.contains(&username) {
                continue;
            }
            let Some(user_id) = self.repo.find_user_by_username(&username).await? else {
                continue;
            };
            if user_id == author || resolved.contains(&user_id) {
                continue;
            }
            if !self.members.is_member(issue.project_id, user_id).await? {
                tracing::debug!("[Comments] Ignoring mention of non-member {}", username);
                continue;
            }
            resolved.push(user_id);
        }
        Ok(resolved)
    }

    async fn announce_mentions(&self, issue: &Issue, comment: &Comment, skip: &[String]) {
        let mentioned = match self.resolve_mentions(issue, comment.user_id, &comment.body, skip).await {
            Ok(mentioned) => mentioned,
            Err(err) => {
                tracing::warn!("[Comments] Could not resolve mentions in {}: {}", comment.id, err);
                return;
            }
        };

        for user_id in mentioned {
            let mention = Mention {
                mentioned_user_id: user_id,
                comment_id: comment.id,
            };
            match RealtimeEvent::new(EventType::Mention, issue.id, comment.user_id, &mention)
                .and_then(|event| event.to_json())
            {
                Ok(frame) => self.threads.send_to_user(user_id, Utf8Bytes::from(frame)).await,
                Err(err) => tracing::warn!("[Comments] Could not encode mention: {}", err),
            }

            let _ = self.dispatcher.dispatch(DomainEvent::UserMentioned {
                issue_id: issue.id,
                comment_id: comment.id,
                actor_id: comment.user_id,
                mentioned_user_id: user_id,
                issue_title: issue.title.clone(),
            });
        }
    }
}
