/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP server,
 * including storage selection, state creation and route configuration.
 *
 * # Initialization Process
 *
 * 1. Connect to Postgres and run migrations, if `DATABASE_URL` is set
 * 2. Pick Postgres or in-memory storage
 * 3. Build `AppState` (services, hubs, event workers)
 * 4. Create the router
 */

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use crate::backend::board::{MemoryBoardStore, MemoryMembership, PgBoardStore, PgMembership};
use crate::backend::comments::{MemoryThreadRepository, PgThreadRepository};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ConfigError, ServerConfig};
use crate::backend::server::state::{AppState, Backends};

/// Storage backed by a Postgres pool
pub fn postgres_backends(pool: PgPool) -> Backends {
    Backends {
        board_store: Arc::new(PgBoardStore::new(pool.clone())),
        members: Arc::new(PgMembership::new(pool.clone())),
        threads: Arc::new(PgThreadRepository::new(pool)),
    }
}

/// Storage kept in process memory
pub fn memory_backends() -> Backends {
    Backends {
        board_store: Arc::new(MemoryBoardStore::new()),
        members: Arc::new(MemoryMembership::new()),
        threads: Arc::new(MemoryThreadRepository::new()),
    }
}

/// Create and configure the Axum application
///
/// # Errors
///
/// Fails when `DATABASE_URL` is set but the database cannot be reached or
/// migrated. Without `DATABASE_URL` the server runs on in-memory stores.
pub async fn create_app(config: &ServerConfig) -> Result<Router<()>, ConfigError> {
    tracing::info!("[STARTUP] Initializing boardsync server");

    let state = match load_database(config).await? {
        Some(pool) => AppState::new(config, postgres_backends(pool), "postgres"),
        None => AppState::new(config, memory_backends(), "memory"),
    };
    tracing::info!("[STARTUP] Storage: {}", state.storage);

    Ok(create_router(state))
}
