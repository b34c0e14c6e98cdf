//! Kanban Board
//!
//! Columns and cards with dense integer ordering, kept collision-free under
//! concurrent moves.
//!
//! # Architecture
//!
//! - **`ordering`** - scope/span/shift math and the engine calls built on it
//! - **`repository`** - `BoardRepository`, `UnitOfWork` and `BoardStore` traits
//! - **`postgres`** - sqlx implementation with a per-board advisory lock
//! - **`memory`** - in-memory implementation with fault injection
//! - **`membership`** - project membership checks
//! - **`service`** - `BoardOrchestrator`, the entry point for every mutation
//! - **`handlers`** - HTTP handlers, broadcasting after commit
//!
//! # Mutation Flow
//!
//! ```text
//! handler -> BoardOrchestrator -> begin + lock_board
//!         -> ordering engine shifts -> write -> commit
//!         -> Hub::emit(project_id, ...)
//! ```

pub mod handlers;
pub mod membership;
pub mod memory;
pub mod ordering;
pub mod postgres;
pub mod repository;
pub mod service;

pub use membership::{MembershipAuthority, MemoryMembership, PgMembership};
pub use memory::{FailPoint, MemoryBoardStore};
pub use ordering::{OrderScope, BASE_ORDER};
pub use postgres::PgBoardStore;
pub use repository::{BoardRepository, BoardStore, UnitOfWork};
pub use service::BoardOrchestrator;
