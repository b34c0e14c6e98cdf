//! Issue Comment Threads
//!
//! Comment CRUD, `@username` mentions, per-issue activity and per-user
//! notifications. Live updates go to the thread hub (keyed by issue id);
//! activity and notifications are produced by domain events.

pub mod handlers;
pub mod mentions;
pub mod repository;
pub mod service;

pub use repository::{MemoryThreadRepository, PgThreadRepository, ThreadRepository};
pub use service::ThreadService;
