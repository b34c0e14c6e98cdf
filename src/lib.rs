// Increase recursion limit for complex async operations
#![recursion_limit = "256"]

//! BoardSync - Main Library
//!
//! BoardSync is the real-time collaboration core of a project-tracking
//! board. It keeps the order of columns and cards consistent under
//! concurrent moves and pushes every committed mutation to the people
//! watching the affected board, issue thread or notification channel.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and clients
//!   - Columns, cards and the board snapshot
//!   - Comments, activity entries, notifications
//!   - The real-time event envelope
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Ordering engine and unit-of-work repositories (Postgres and in-memory)
//!   - Board orchestrator with membership checks
//!   - Hub / room / client pub-sub over WebSockets
//!   - Comment threads, mentions and the domain event dispatcher
//!   - Axum router, JWT authentication, configuration
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - Enables the backend modules and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use boardsync::backend::server::{create_app, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let app = create_app(&config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - Durable board state is only mutated inside a unit of work
//! - Each room is owned by a single task and reached through its command channel
//! - The hub's room registry is the only lock on the delivery path

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
