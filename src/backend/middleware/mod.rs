//! Middleware Module
//!
//! This module contains all HTTP middleware for the backend server.
//!
//! - **`auth`** - JWT authentication for `/api` routes and WebSocket upgrades

pub mod auth;

pub use auth::{auth_middleware, authenticate, AuthUser, AuthenticatedUser};
