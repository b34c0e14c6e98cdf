//! Server Module
//!
//! This module contains all server-side code for initializing and configuring
//! the Axum HTTP server.
//!
//! # Architecture
//!
//! - **`config`** - `ServerConfig` from the environment, database loading
//! - **`state`** - `AppState`, `Hubs`, `Backends`
//! - **`init`** - storage selection and app creation
//!
//! # Example
//!
//! ```rust,no_run
//! use boardsync::backend::server::{config::ServerConfig, create_app};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let app = create_app(&config).await?;
//! # Ok(())
//! # }
//! ```

/// Server configuration loading
pub mod config;

/// Application state management
pub mod state;

/// Server initialization
pub mod init;

pub use config::{ConfigError, ServerConfig};
pub use init::create_app;
pub use state::{AppState, Backends, Hubs};
