//! Authentication Module
//!
//! JWT verification for HTTP requests and WebSocket upgrades. Accounts and
//! logins are handled by a separate service; tokens it issues carry the
//! user's UUID in `sub` and are signed with the shared `JWT_SECRET`.

/// JWT token generation and validation
pub mod sessions;

pub use sessions::{create_token, user_id_from_token, verify_token, Claims, TokenError};
