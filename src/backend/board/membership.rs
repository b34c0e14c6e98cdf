/**
 * Project Membership
 *
 * The orchestrator and the comment service ask a `MembershipAuthority`
 * whether a user belongs to a project before any mutation. Membership
 * itself is managed elsewhere; this module only reads it.
 */

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::error::DomainError;

/// Answers "is this user a member of this project?"
#[async_trait]
pub trait MembershipAuthority: Send + Sync {
    async fn is_member(&self, project_id: Uuid, user_id: Uuid) -> Result<bool, DomainError>;
}

/// Fail with `Forbidden` unless `user_id` belongs to `project_id`
pub async fn require_member(
    members: &dyn MembershipAuthority,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), DomainError> {
    if members.is_member(project_id, user_id).await? {
        Ok(())
    } else {
        tracing::debug!("[Board] User {} rejected for project {}", user_id, project_id);
        Err(DomainError::forbidden(user_id, project_id))
    }
}

/// Reads the `project_members` table
#[derive(Clone)]
pub struct PgMembership {
    pool: PgPool,
}

impl PgMembership {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipAuthority for PgMembership {
    async fn is_member(&self, project_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = $1 AND user_id = $2)",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

/// Membership kept in memory
#[derive(Clone, Default)]
pub struct MemoryMembership {
    members: Arc<RwLock<HashSet<(Uuid, Uuid)>>>,
}

impl MemoryMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_member(&self, project_id: Uuid, user_id: Uuid) {
        self.members.write().await.insert((project_id, user_id));
    }

    pub async fn remove_member(&self, project_id: Uuid, user_id: Uuid) {
        self.members.write().await.remove(&(project_id, user_id));
    }
}

#[async_trait]
impl MembershipAuthority for MemoryMembership {
    async fn is_member(&self, project_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.members.read().await.contains(&(project_id, user_id)))
    }
}
