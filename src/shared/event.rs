/**
 * Real-time Event Envelope
 *
 * Every message pushed to a live connection is a `RealtimeEvent`:
 *
 * ```json
 * { "type": "card_moved", "scope_id": "<project id>", "actor_id": "<user id>",
 *   "payload": { "card_id": "...", "from_column": "...", "to_column": "...", "new_order": 2 } }
 * ```
 *
 * `scope_id` is the key of the room the event was published to (project,
 * issue or user id). Payload shapes are the typed structs in `shared::board`
 * and `shared::thread`; the envelope stores them as JSON so one queue type
 * can carry every kind.
 *
 * Clients may also send frames upstream on a subscription. Those are parsed
 * as `ClientIntent`.
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Type tag of a real-time event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ColumnCreated,
    CardCreated,
    CardMoved,
    ColumnReordered,
    ColumnRenamed,
    ColumnDeleted,
    CardDeleted,
    CommentCreated,
    CommentUpdated,
    CommentDeleted,
    Mention,
    Notification,
    Typing,
}

impl EventType {
    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColumnCreated => "column_created",
            Self::CardCreated => "card_created",
            Self::CardMoved => "card_moved",
            Self::ColumnReordered => "column_reordered",
            Self::ColumnRenamed => "column_renamed",
            Self::ColumnDeleted => "column_deleted",
            Self::CardDeleted => "card_deleted",
            Self::CommentCreated => "comment_created",
            Self::CommentUpdated => "comment_updated",
            Self::CommentDeleted => "comment_deleted",
            Self::Mention => "mention",
            Self::Notification => "notification",
            Self::Typing => "typing",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broadcast envelope delivered to subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeEvent {
    /// Event type tag (serialized as `type`)
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Key of the room this event belongs to
    pub scope_id: String,
    /// User who caused the event
    pub actor_id: String,
    /// Typed payload, serialized
    pub payload: serde_json::Value,
}

impl RealtimeEvent {
    /// Create a new event from a serializable payload
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event tag
    /// * `scope_id` - Room key (project, issue or user id)
    /// * `actor_id` - User who performed the action
    /// * `payload` - Any serializable payload struct
    ///
    /// # Example
    ///
    /// ```rust
    /// use boardsync::shared::event::{EventType, RealtimeEvent};
    /// use boardsync::shared::board::ColumnDeleted;
    /// use uuid::Uuid;
    ///
    /// let column_id = Uuid::new_v4();
    /// let event = RealtimeEvent::new(
    ///     EventType::ColumnDeleted,
    ///     Uuid::new_v4(),
    ///     Uuid::new_v4(),
    ///     &ColumnDeleted { column_id },
    /// ).unwrap();
    /// assert_eq!(event.payload["column_id"], column_id.to_string());
    /// ```
    pub fn new<P: Serialize>(
        event_type: EventType,
        scope_id: impl ToString,
        actor_id: Uuid,
        payload: &P,
    ) -> Result<Self, SharedError> {
        Ok(Self {
            event_type,
            scope_id: scope_id.to_string(),
            actor_id: actor_id.to_string(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Serialize the envelope into the text frame sent to clients
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A frame sent upstream by a connected client
///
/// Serialized as `{"type": "...", "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientIntent {
    /// Move a card over the live connection instead of HTTP
    MoveCard {
        card_id: Uuid,
        to_column: Uuid,
        new_order: i32,
    },
    /// Ephemeral typing indicator, relayed to the room as-is
    Typing(serde_json::Value),
}
