//! Backend Module
//!
//! This module contains all server-side code for boardsync: the ordering
//! engine and its repositories, the board orchestrator, comment threads,
//! the domain event dispatcher and the WebSocket pub-sub that pushes
//! every committed change to the people watching it.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`board`** - Ordering engine, unit-of-work repositories, orchestrator
//! - **`comments`** - Issue threads, mentions, activity and notifications
//! - **`events`** - Domain events, handler table and worker pool
//! - **`realtime`** - Hub / room / client pub-sub over WebSockets
//! - **`auth`** - JWT sessions
//! - **`middleware`** - Request authentication
//! - **`server`** - Configuration, state and initialization
//! - **`routes`** - Router assembly
//! - **`error`** - Domain and HTTP error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── board/          - Ordering engine and orchestrator
//! ├── comments/       - Threads, mentions, notifications
//! ├── events/         - Domain event dispatch
//! ├── realtime/       - Hubs, rooms, clients
//! ├── auth/           - Sessions
//! ├── middleware/     - Request middleware
//! ├── server/         - Config, state, init
//! ├── routes/         - Route configuration
//! └── error/          - Error types
//! ```
//!
//! # Flow of a mutation
//!
//! 1. A handler (HTTP or WebSocket intent) authenticates the caller
//! 2. The orchestrator checks membership, then runs the change in a unit of
//!    work holding the board's advisory lock
//! 3. After commit the handler broadcasts a `{type, scope_id, actor_id,
//!    payload}` envelope to the scope's room
//! 4. Comment changes also emit a domain event; workers record activity and
//!    send notifications
//!
//! Nothing is broadcast for a mutation that did not commit.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Kanban ordering and orchestration
pub mod board;

/// Comment threads and notifications
pub mod comments;

/// Domain events and their worker pool
pub mod events;

/// Real-time pub-sub
pub mod realtime;

/// Backend error types
pub mod error;

/// Session tokens
pub mod auth;

/// Middleware for request processing
pub mod middleware;

/// Re-export commonly used types
pub use error::{BackendError, DomainError};
pub use server::create_app;
