/**
 * Domain Error Taxonomy
 *
 * Errors returned by the board orchestrator, the comment thread service and
 * their repositories. Each variant is terminal for the call that produced it:
 *
 * - `Forbidden` - the actor is not a member of the project
 * - `NotFound` - the primary entity of the call does not exist
 * - `NotPermitted` - a member acting on an entity only its author may change
 * - `Validation` - malformed input, rejected before any write
 * - `Persistence` - storage failure; the surrounding unit of work is rolled back
 *
 * Delivery failures to live clients are not part of this taxonomy. They are
 * handled inside the room that observed them (see `realtime::room`).
 */

use thiserror::Error;
use uuid::Uuid;

/// Error returned by domain services and repositories
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Actor lacks membership in the project
    #[error("user {actor} is not a member of project {project_id}")]
    Forbidden {
        actor: Uuid,
        project_id: Uuid,
    },

    /// Actor is a member but not allowed to touch this entity
    #[error("{reason}")]
    NotPermitted {
        reason: String,
    },

    /// Target entity does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    /// Input rejected before any write
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Storage failure
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn forbidden(actor: Uuid, project_id: Uuid) -> Self {
        Self::Forbidden { actor, project_id }
    }

    pub fn not_permitted(reason: impl Into<String>) -> Self {
        Self::NotPermitted {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(format!("corrupt stored payload: {}", err))
    }
}
