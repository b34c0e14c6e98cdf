//! Domain Events
//!
//! Side effects of comment activity (activity log rows, notifications)
//! run off the request path. Services build a [`DomainEvent`] and hand it
//! to the [`Dispatcher`], which queues it for a fixed pool of workers.
//!
//! # Routing
//!
//! Routing is a [`HandlerTable`] built once at startup. `handlers_for` is
//! an exhaustive `match` over [`EventKind`], so a new event kind does not
//! compile until it is routed.
//!
//! # Delivery contract
//!
//! - `dispatch` never blocks the caller; a full queue drops the event
//! - handlers for one event run concurrently, failures are logged
//! - no ordering is guaranteed across handlers or across events

pub mod dispatcher;
pub mod handlers;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::error::DomainError;

pub use dispatcher::{DispatchError, Dispatcher};
pub use handlers::{ActivityRecorder, Notifier};

/// Something that happened in an issue thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    CommentAdded {
        issue_id: Uuid,
        comment_id: Uuid,
        actor_id: Uuid,
        issue_title: String,
        assignee: Option<Uuid>,
    },
    CommentEdited {
        issue_id: Uuid,
        comment_id: Uuid,
        actor_id: Uuid,
        old: String,
        new: String,
    },
    CommentDeleted {
        issue_id: Uuid,
        comment_id: Uuid,
        actor_id: Uuid,
    },
    UserMentioned {
        issue_id: Uuid,
        comment_id: Uuid,
        actor_id: Uuid,
        mentioned_user_id: Uuid,
        issue_title: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CommentAdded,
    CommentEdited,
    CommentDeleted,
    UserMentioned,
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CommentAdded { .. } => EventKind::CommentAdded,
            Self::CommentEdited { .. } => EventKind::CommentEdited,
            Self::CommentDeleted { .. } => EventKind::CommentDeleted,
            Self::UserMentioned { .. } => EventKind::UserMentioned,
        }
    }

    pub fn issue_id(&self) -> Uuid {
        match self {
            Self::CommentAdded { issue_id, .. }
            | Self::CommentEdited { issue_id, .. }
            | Self::CommentDeleted { issue_id, .. }
            | Self::UserMentioned { issue_id, .. } => *issue_id,
        }
    }

    pub fn actor_id(&self) -> Uuid {
        match self {
            Self::CommentAdded { actor_id, .. }
            | Self::CommentEdited { actor_id, .. }
            | Self::CommentDeleted { actor_id, .. }
            | Self::UserMentioned { actor_id, .. } => *actor_id,
        }
    }
}

/// A side effect run for some event kinds
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &DomainEvent) -> Result<(), DomainError>;
}

/// Which handlers run for which event kind
#[derive(Clone)]
pub struct HandlerTable {
    activity: Arc<dyn EventHandler>,
    notifier: Arc<dyn EventHandler>,
}

impl HandlerTable {
    pub fn new(activity: Arc<dyn EventHandler>, notifier: Arc<dyn EventHandler>) -> Self {
        Self { activity, notifier }
    }

    pub fn handlers_for(&self, kind: EventKind) -> Vec<&dyn EventHandler> {
        match kind {
            EventKind::CommentAdded | EventKind::UserMentioned => {
                vec![self.activity.as_ref(), self.notifier.as_ref()]
            }
            EventKind::CommentEdited | EventKind::CommentDeleted => vec![self.activity.as_ref()],
        }
    }
}
