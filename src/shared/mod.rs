//! Shared Module
//!
//! Types that are shared between the server and its clients: the board and
//! thread data model, the real-time event envelope, and shared errors.
//! Nothing in here depends on the `ssr` feature.

/// Columns, cards and board event payloads
pub mod board;

/// Comments, activity log and notifications
pub mod thread;

/// Real-time event envelope
pub mod event;

/// Shared error types
pub mod error;

pub use board::{BoardView, Card, Column, ColumnWithCards};
pub use error::SharedError;
pub use event::{ClientIntent, EventType, RealtimeEvent};
pub use thread::{ActivityEntry, ActivityPayload, Comment, Issue, Notification, NotificationPayload};
