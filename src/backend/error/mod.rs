//! Backend Error Module
//!
//! # Architecture
//!
//! - **`domain`** - `DomainError`, the taxonomy returned by services and repositories
//! - **`types`** - `BackendError`, the handler-facing error and its status mapping
//! - **`conversion`** - `IntoResponse` for `BackendError`
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── domain.rs     - Domain error taxonomy
//! ├── types.rs      - Backend error definitions
//! └── conversion.rs - Error conversion implementations
//! ```
//!
//! Services return `Result<_, DomainError>`; handlers use `?` to lift it
//! into `BackendError`, which renders as `{"error": ..., "status": ...}`.

/// Domain error taxonomy
pub mod domain;

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use domain::DomainError;
pub use types::BackendError;
