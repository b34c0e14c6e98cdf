/**
 * Room Actor
 *
 * One task per broadcast scope. The task owns the scope's client set and
 * drains a bounded command channel, so registrations and deliveries for a
 * scope are applied one at a time in submission order.
 *
 * Delivery to a client never waits: a client whose queue is full or whose
 * connection is gone is dropped from the room, and the rest still receive
 * the message.
 *
 * When the room has no clients after a command, it removes itself from
 * its hub and stops; a room nobody joins stops after `EMPTY_ROOM_GRACE`.
 * Commands that reached the channel while the room was being evicted are
 * forwarded to a fresh room for the same key, starting at the first
 * registration, so no client is lost.
 */

use std::collections::HashMap;
use std::sync::Weak;
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::realtime::hub::{HubShared, RoomKey};

/// How long a room with no clients waits for a first registration
pub const EMPTY_ROOM_GRACE: Duration = Duration::from_secs(30);

/// Why a message could not be queued for a client
///
/// Never surfaced to publishers; the room drops the client and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection is closed")]
    Disconnected,
}

/// The room's end of a connected client
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: Uuid,
    pub user_id: Uuid,
    tx: mpsc::Sender<Utf8Bytes>,
}

impl ClientHandle {
    /// Create a handle and the queue its write loop drains
    pub fn new(user_id: Uuid, capacity: usize) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            user_id,
            tx,
        };
        (handle, rx)
    }

    fn deliver(&self, message: Utf8Bytes) -> Result<(), DeliveryFailure> {
        self.tx.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryFailure::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryFailure::Disconnected,
        })
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub enum RoomCommand {
    Register(ClientHandle),
    Unregister(Uuid),
    Broadcast(Utf8Bytes),
    /// Deliver only to the clients of one user
    Direct { user_id: Uuid, message: Utf8Bytes },
}

/// Handle to a running room
#[derive(Debug, Clone)]
pub struct Room {
    instance: u64,
    tx: mpsc::Sender<RoomCommand>,
}

impl Room {
    /// Identity of this room instance; a key that is evicted and recreated
    /// gets a new one
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn same_room(&self, other: &Room) -> bool {
        self.instance == other.instance && self.tx.same_channel(&other.tx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a command; gives the command back if the room has stopped
    pub(crate) async fn send(&self, command: RoomCommand) -> Result<(), RoomCommand> {
        self.tx.send(command).await.map_err(|err| err.0)
    }
}

/// Start the task for a new room and return its handle
pub(crate) fn spawn<K: RoomKey>(key: K, instance: u64, capacity: usize, hub: Weak<HubShared<K>>) -> Room {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = RoomTask {
        key,
        instance,
        hub,
        clients: HashMap::new(),
        rx,
    };
    tokio::spawn(task.run());
    Room { instance, tx }
}

struct RoomTask<K: RoomKey> {
    key: K,
    instance: u64,
    hub: Weak<HubShared<K>>,
    clients: HashMap<Uuid, ClientHandle>,
    rx: mpsc::Receiver<RoomCommand>,
}

impl<K: RoomKey> RoomTask<K> {
    async fn run(mut self) {
        tracing::debug!("[Realtime] Room {} started", self.key);

        loop {
            let next = if self.clients.is_empty() {
                // Looked up but never joined.
                match tokio::time::timeout(EMPTY_ROOM_GRACE, self.rx.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        self.evict().await;
                        return;
                    }
                }
            } else {
                self.rx.recv().await
            };
            let Some(command) = next else {
                break;
            };

            self.apply(command);
            if self.clients.is_empty() {
                self.evict().await;
                return;
            }
        }

        tracing::debug!("[Realtime] Room {} stopped", self.key);
    }

    fn apply(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Register(client) => {
                if client.is_closed() {
                    return;
                }
                tracing::debug!(
                    "[Realtime] Client {} (user {}) joined room {}",
                    client.id,
                    client.user_id,
                    self.key
                );
                self.clients.insert(client.id, client);
            }
            RoomCommand::Unregister(client_id) => {
                // Dropping the handle closes the client's queue.
                if self.clients.remove(&client_id).is_some() {
                    tracing::debug!("[Realtime] Client {} left room {}", client_id, self.key);
                }
            }
            RoomCommand::Broadcast(message) => {
                self.deliver(message, |_| true);
            }
            RoomCommand::Direct { user_id, message } => {
                self.deliver(message, |client| client.user_id == user_id);
            }
        }
    }

    fn deliver(&mut self, message: Utf8Bytes, wants: impl Fn(&ClientHandle) -> bool) {
        let mut dropped = Vec::new();
        for client in self.clients.values().filter(|c| wants(c)) {
            if let Err(failure) = client.deliver(message.clone()) {
                dropped.push((client.id, failure));
            }
        }

        for (client_id, failure) in dropped {
            self.clients.remove(&client_id);
            tracing::warn!(
                "[Realtime] Dropped client {} from room {}: {}",
                client_id,
                self.key,
                failure
            );
        }
    }

    async fn evict(&mut self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };

        hub.remove_room(&self.key, self.instance);
        self.rx.close();

        let mut pending = Vec::new();
        while let Ok(command) = self.rx.try_recv() {
            pending.push(command);
        }

        let Some(first) = pending
            .iter()
            .position(|command| matches!(command, RoomCommand::Register(_)))
        else {
            tracing::debug!("[Realtime] Room {} evicted", self.key);
            return;
        };

        tracing::debug!(
            "[Realtime] Room {} evicted, forwarding {} commands",
            self.key,
            pending.len() - first
        );
        let mut successor = hub.room(&self.key);
        for mut command in pending.into_iter().skip(first) {
            // The successor may itself empty out and stop while we forward.
            loop {
                match successor.send(command).await {
                    Ok(()) => break,
                    Err(returned) => {
                        command = returned;
                        successor = hub.room(&self.key);
                    }
                }
            }
        }
    }
}
