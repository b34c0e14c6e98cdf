//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//!
//! - **`router`** - Main router creation, public and WebSocket routes
//! - **`api_routes`** - Authenticated `/api` routes (kanban, comments, notifications)

/// Main router creation
pub mod router;

/// API endpoint routes
pub mod api_routes;

pub use router::create_router;
