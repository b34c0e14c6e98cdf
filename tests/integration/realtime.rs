//! Hub and room tests
//!
//! Delivery isolation, room identity, eviction and per-user sends.

use std::collections::HashSet;

use assert_matches::assert_matches;
use axum::extract::ws::Utf8Bytes;
use uuid::Uuid;

use boardsync::backend::board::handlers::announce;
use boardsync::backend::realtime::{ClientHandle, Hub};
use boardsync::shared::board::CardMoved;
use boardsync::shared::EventType;

use crate::common::fixtures::{assert_silent, eventually, next_event, TestApp};

fn frame(text: &str) -> Utf8Bytes {
    Utf8Bytes::from(text.to_string())
}

#[tokio::test]
async fn test_saturated_client_does_not_block_others() {
    let hub: Hub<Uuid> = Hub::new("test", 64);
    let key = Uuid::new_v4();
    let (slow, mut slow_rx) = ClientHandle::new(Uuid::new_v4(), 1);
    let (fast, mut fast_rx) = ClientHandle::new(Uuid::new_v4(), 16);
    hub.join(&key, slow).await;
    hub.join(&key, fast).await;

    for i in 0..3 {
        assert!(hub.broadcast(&key, frame(&format!("{{\"n\":{}}}", i))).await);
    }

    for i in 0..3 {
        assert_eq!(next_event(&mut fast_rx).await["n"], i);
    }

    // The slow client got the first frame, then was dropped from the room.
    assert_eq!(next_event(&mut slow_rx).await["n"], 0);
    let closed = tokio::time::timeout(std::time::Duration::from_secs(1), slow_rx.recv()).await;
    assert_matches!(closed, Ok(None));

    // The room survives with the fast client still in it.
    assert!(hub.broadcast(&key, frame("{\"n\":3}")).await);
    assert_eq!(next_event(&mut fast_rx).await["n"], 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_share_one_room() {
    let hub: Hub<Uuid> = Hub::new("test", 64);
    let key = Uuid::new_v4();

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move { hub.room(&key).instance() }));
    }

    let mut instances = HashSet::new();
    for task in tasks {
        instances.insert(assert_ok!(task.await));
    }
    assert_eq!(instances.len(), 1);
    assert_eq!(hub.room_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_all_receive() {
    let hub: Hub<Uuid> = Hub::new("test", 64);
    let key = Uuid::new_v4();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move {
            let (client, rx) = ClientHandle::new(Uuid::new_v4(), 8);
            hub.join(&key, client).await;
            rx
        }));
    }
    let mut receivers = Vec::new();
    for task in tasks {
        receivers.push(assert_ok!(task.await));
    }

    assert!(hub.broadcast(&key, frame("{\"hello\":true}")).await);
    for rx in receivers.iter_mut() {
        assert_eq!(next_event(rx).await["hello"], true);
    }
}

#[tokio::test]
async fn test_empty_room_is_evicted() {
    let hub: Hub<Uuid> = Hub::new("test", 16);
    let key = Uuid::new_v4();
    let (client, _rx) = ClientHandle::new(Uuid::new_v4(), 8);
    let client_id = client.id;
    hub.join(&key, client).await;
    let first = hub.room(&key);
    assert_eq!(hub.room_count(), 1);

    hub.leave(&key, client_id).await;
    assert!(eventually(|| hub.room_count() == 0).await);
    assert!(first.is_closed());

    // Joining again creates a fresh room.
    let (again, mut rx) = ClientHandle::new(Uuid::new_v4(), 8);
    hub.join(&key, again).await;
    assert!(!hub.room(&key).same_room(&first));
    assert!(hub.broadcast(&key, frame("{\"ok\":1}")).await);
    assert_eq!(next_event(&mut rx).await["ok"], 1);
}

#[tokio::test]
async fn test_disconnected_clients_are_reaped_on_broadcast() {
    let hub: Hub<Uuid> = Hub::new("test", 16);
    let key = Uuid::new_v4();
    let (client, rx) = ClientHandle::new(Uuid::new_v4(), 8);
    hub.join(&key, client).await;

    drop(rx);
    hub.broadcast(&key, frame("{}")).await;

    assert!(eventually(|| hub.room_count() == 0).await);
}

#[tokio::test]
async fn test_rooms_are_isolated_by_key() {
    let hub: Hub<Uuid> = Hub::new("test", 16);
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let (client_a, mut rx_a) = ClientHandle::new(Uuid::new_v4(), 8);
    let (client_b, mut rx_b) = ClientHandle::new(Uuid::new_v4(), 8);
    hub.join(&a, client_a).await;
    hub.join(&b, client_b).await;

    hub.broadcast(&a, frame("{\"to\":\"a\"}")).await;

    assert_eq!(next_event(&mut rx_a).await["to"], "a");
    assert_silent(&mut rx_b).await;
}

#[tokio::test]
async fn test_send_to_user_reaches_only_that_user() {
    let hub: Hub<Uuid> = Hub::new("test", 16);
    let target = Uuid::new_v4();
    let bystander = Uuid::new_v4();
    let (room_a, room_b) = (Uuid::new_v4(), Uuid::new_v4());

    let (tab_one, mut rx_one) = ClientHandle::new(target, 8);
    let (tab_two, mut rx_two) = ClientHandle::new(target, 8);
    let (other, mut rx_other) = ClientHandle::new(bystander, 8);
    hub.join(&room_a, tab_one).await;
    hub.join(&room_b, tab_two).await;
    hub.join(&room_a, other).await;

    hub.send_to_user(target, frame("{\"direct\":true}")).await;

    assert_eq!(next_event(&mut rx_one).await["direct"], true);
    assert_eq!(next_event(&mut rx_two).await["direct"], true);
    assert_silent(&mut rx_other).await;
}

#[tokio::test]
async fn test_announce_sends_envelope_to_board_room() {
    let app = TestApp::new().await;
    let (watcher, mut rx) = ClientHandle::new(app.user, 8);
    app.state.hubs.board.join(&app.project, watcher).await;

    let moved = CardMoved {
        card_id: Uuid::new_v4(),
        from_column: Uuid::new_v4(),
        to_column: Uuid::new_v4(),
        new_order: 2,
    };
    announce(&app.state, app.project, EventType::CardMoved, app.user, &moved).await;

    let event = next_event(&mut rx).await;
    assert_eq!(event["type"], "card_moved");
    assert_eq!(event["scope_id"], app.project.to_string());
    assert_eq!(event["actor_id"], app.user.to_string());
    assert_eq!(event["payload"]["new_order"], 2);
}

#[tokio::test]
async fn test_hubs_are_separate_per_scope() {
    let app = TestApp::new().await;
    let shared_key = app.project;
    let (on_board, mut board_rx) = ClientHandle::new(app.user, 8);
    let (on_thread, mut thread_rx) = ClientHandle::new(app.user, 8);
    app.state.hubs.board.join(&shared_key, on_board).await;
    app.state.hubs.thread.join(&shared_key, on_thread).await;

    app.state.hubs.board.broadcast(&shared_key, frame("{\"scope\":\"board\"}")).await;

    assert_eq!(next_event(&mut board_rx).await["scope"], "board");
    assert_silent(&mut thread_rx).await;
}
