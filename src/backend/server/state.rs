/**
 * Application State Management
 *
 * `AppState` is the central state container handed to every handler. It
 * is cheap to clone: every field is either an `Arc` or a handle around
 * one.
 *
 * # Contents
 *
 * - `board` - the board orchestrator (kanban mutations)
 * - `threads` - the comment thread service
 * - `hubs` - the three realtime hubs (projects, issues, users)
 * - `dispatcher` - domain event worker pool
 * - `jwt_secret` and `client_settings` - connection parameters
 *
 * Storage is chosen once at startup through `Backends`, either Postgres
 * or in-memory.
 *
 * # Example
 *
 * ```rust
 * use boardsync::backend::server::state::AppState;
 * use axum::extract::State;
 *
 * async fn handler(State(state): State<AppState>) {
 *     let watching = state.hubs.board.room_count();
 *     // ...
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;
use uuid::Uuid;

use crate::backend::board::{BoardOrchestrator, BoardStore, MembershipAuthority};
use crate::backend::comments::{ThreadRepository, ThreadService};
use crate::backend::events::{ActivityRecorder, Dispatcher, HandlerTable, Notifier};
use crate::backend::realtime::{ClientSettings, Hub};
use crate::backend::server::config::ServerConfig;

/// The realtime hubs, one per kind of scope
#[derive(Clone)]
pub struct Hubs {
    /// Keyed by project id
    pub board: Hub<Uuid>,
    /// Keyed by issue id
    pub thread: Hub<Uuid>,
    /// Keyed by user id
    pub user: Hub<Uuid>,
}

impl Hubs {
    pub fn new(room_capacity: usize) -> Self {
        Self {
            board: Hub::new("board", room_capacity),
            thread: Hub::new("thread", room_capacity),
            user: Hub::new("user", room_capacity),
        }
    }
}

/// Storage implementations the services run on
pub struct Backends {
    pub board_store: Arc<dyn BoardStore>,
    pub members: Arc<dyn MembershipAuthority>,
    pub threads: Arc<dyn ThreadRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub board: BoardOrchestrator,
    pub threads: ThreadService,
    pub hubs: Hubs,
    pub dispatcher: Dispatcher,
    pub jwt_secret: Arc<str>,
    pub client_settings: ClientSettings,
    /// `"postgres"` or `"memory"`, reported by `/health`
    pub storage: &'static str,
}

impl AppState {
    /// Wire services, hubs and the event dispatcher over `backends`
    ///
    /// Spawns the dispatcher workers, so it must run inside a Tokio runtime.
    pub fn new(config: &ServerConfig, backends: Backends, storage: &'static str) -> Self {
        let hubs = Hubs::new(config.room_queue_capacity);

        let table = HandlerTable::new(
            Arc::new(ActivityRecorder::new(Arc::clone(&backends.threads))),
            Arc::new(Notifier::new(Arc::clone(&backends.threads), hubs.user.clone())),
        );
        let dispatcher = Dispatcher::start(table, config.event_workers, config.event_queue_capacity);

        let board = BoardOrchestrator::new(backends.board_store, Arc::clone(&backends.members));
        let threads = ThreadService::new(
            backends.threads,
            backends.members,
            hubs.thread.clone(),
            dispatcher.clone(),
        );

        Self {
            board,
            threads,
            hubs,
            dispatcher,
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
            client_settings: config.client_settings(),
            storage,
        }
    }
}

impl FromRef<AppState> for BoardOrchestrator {
    fn from_ref(state: &AppState) -> Self {
        state.board.clone()
    }
}

impl FromRef<AppState> for Hubs {
    fn from_ref(state: &AppState) -> Self {
        state.hubs.clone()
    }
}
