/**
 * WebSocket Subscription Handlers
 *
 * Each handler authenticates the upgrade request (`?token=` or bearer
 * header), checks that the caller may watch the scope, then joins the
 * connection to the matching hub.
 *
 * # Endpoints
 *
 * - `GET /ws/projects/{project_id}` - board events; clients may send
 *   `move_card` intents
 * - `GET /ws/issues/{issue_id}` - comment events; `typing` frames are
 *   relayed to the other watchers
 * - `GET /ws/notifications[?user_id=]` - the caller's own notifications
 *
 * Failures before the upgrade are returned as ordinary JSON errors.
 */

use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::board::handlers::announce;
use crate::backend::error::BackendError;
use crate::backend::middleware::authenticate;
use crate::backend::realtime::client::run_client;
use crate::backend::server::state::AppState;
use crate::shared::board::CardMoved;
use crate::shared::{ClientIntent, EventType};

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeQuery {
    pub token: Option<String>,
    pub user_id: Option<Uuid>,
}

fn parse_intent(text: &str, client: Uuid) -> Option<ClientIntent> {
    match serde_json::from_str::<ClientIntent>(text) {
        Ok(intent) => Some(intent),
        Err(err) => {
            tracing::debug!("[Realtime] Ignoring frame from {}: {}", client, err);
            None
        }
    }
}

/// Subscribe to a project's board
pub async fn board_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<SubscribeQuery>,
    headers: HeaderMap,
) -> Result<Response, BackendError> {
    let user = authenticate(&state.jwt_secret, query.token.as_deref(), &headers)?;
    state.board.authorize(project_id, user.user_id).await?;
    let user_id = user.user_id;

    Ok(ws.on_upgrade(move |socket| async move {
        let hub = state.hubs.board.clone();
        let settings = state.client_settings;
        run_client(socket, hub, project_id, user_id, settings, move |text| {
            let state = state.clone();
            async move { handle_board_frame(&state, user_id, &text).await }
        })
        .await;
    }))
}

async fn handle_board_frame(state: &AppState, user_id: Uuid, text: &str) {
    let Some(intent) = parse_intent(text, user_id) else {
        return;
    };

    match intent {
        ClientIntent::MoveCard {
            card_id,
            to_column,
            new_order,
        } => match state.board.move_card(card_id, to_column, new_order, user_id).await {
            Ok((card, from_column)) => {
                let moved = CardMoved {
                    card_id,
                    from_column,
                    to_column: card.column_id,
                    new_order: card.order,
                };
                announce(state, card.project_id, EventType::CardMoved, user_id, &moved).await;
            }
            Err(err) => {
                tracing::info!("[Realtime] Move of card {} by {} rejected: {}", card_id, user_id, err);
            }
        },
        ClientIntent::Typing(_) => {
            tracing::debug!("[Realtime] Ignoring typing frame on board socket from {}", user_id);
        }
    }
}

/// Subscribe to an issue's comment thread
pub async fn thread_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
    Query(query): Query<SubscribeQuery>,
    headers: HeaderMap,
) -> Result<Response, BackendError> {
    let user = authenticate(&state.jwt_secret, query.token.as_deref(), &headers)?;
    state.threads.authorize_issue(issue_id, user.user_id).await?;
    let user_id = user.user_id;

    Ok(ws.on_upgrade(move |socket| async move {
        let hub = state.hubs.thread.clone();
        let settings = state.client_settings;
        run_client(socket, hub, issue_id, user_id, settings, move |text| {
            let threads = state.threads.clone();
            async move {
                if let Some(ClientIntent::Typing(payload)) = parse_intent(&text, user_id) {
                    threads.relay_typing(issue_id, user_id, &payload).await;
                }
            }
        })
        .await;
    }))
}

/// Subscribe to the caller's notifications
///
/// `user_id` is optional; when given it must be the caller.
pub async fn notification_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<SubscribeQuery>,
    headers: HeaderMap,
) -> Result<Response, BackendError> {
    let user = authenticate(&state.jwt_secret, query.token.as_deref(), &headers)?;
    if let Some(requested) = query.user_id {
        if requested != user.user_id {
            tracing::warn!("[Auth] User {} asked for notifications of {}", user.user_id, requested);
            return Err(BackendError::handler(
                StatusCode::FORBIDDEN,
                "cannot subscribe to another user's notifications",
            ));
        }
    }
    let user_id = user.user_id;

    Ok(ws.on_upgrade(move |socket| async move {
        let hub = state.hubs.user.clone();
        let settings = state.client_settings;
        run_client(socket, hub, user_id, user_id, settings, |_text| async {}).await;
    }))
}
