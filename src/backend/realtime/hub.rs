/**
 * Hub
 *
 * Registry from scope key to room. The registry lock is only held to look
 * up, create or evict a room; delivery goes through the room's own
 * channel.
 *
 * The server keeps three hubs: projects (board events), issues (comment
 * threads) and users (notifications). They share this implementation and
 * differ only in the key they are addressed by.
 */

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::backend::realtime::room::{self, ClientHandle, Room, RoomCommand};
use crate::shared::{EventType, RealtimeEvent, SharedError};

/// Anything a room can be keyed by
pub trait RoomKey: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static {}

impl<T> RoomKey for T where T: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static {}

pub(crate) struct HubShared<K: RoomKey> {
    name: &'static str,
    rooms: RwLock<HashMap<K, Room>>,
    room_capacity: usize,
    next_instance: AtomicU64,
}

impl<K: RoomKey> HubShared<K> {
    pub(crate) fn room(self: &Arc<Self>, key: &K) -> Room {
        if let Some(room) = self.lookup(key) {
            return room;
        }

        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have created it between the two locks.
        if let Some(room) = rooms.get(key).filter(|room| !room.is_closed()) {
            return room.clone();
        }

        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let room = room::spawn(key.clone(), instance, self.room_capacity, Arc::downgrade(self));
        rooms.insert(key.clone(), room.clone());
        tracing::debug!("[Realtime] {} hub created room {} ({})", self.name, key, instance);
        room
    }

    fn lookup(&self, key: &K) -> Option<Room> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(key).filter(|room| !room.is_closed()).cloned()
    }

    /// Remove `key` only if it still maps to the given room instance
    pub(crate) fn remove_room(&self, key: &K, instance: u64) {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if rooms.get(key).map_or(false, |room| room.instance() == instance) {
            rooms.remove(key);
        }
    }
}

/// Scope-keyed registry of rooms
pub struct Hub<K: RoomKey> {
    shared: Arc<HubShared<K>>,
}

impl<K: RoomKey> Clone for Hub<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: RoomKey> Hub<K> {
    /// `room_capacity` bounds each room's command queue
    pub fn new(name: &'static str, room_capacity: usize) -> Self {
        Self {
            shared: Arc::new(HubShared {
                name,
                rooms: RwLock::new(HashMap::new()),
                room_capacity,
                next_instance: AtomicU64::new(0),
            }),
        }
    }

    /// Room for `key`, created on first use
    ///
    /// Concurrent first lookups of the same key all get the same room.
    pub fn room(&self, key: &K) -> Room {
        self.shared.room(key)
    }

    /// Room for `key` if one is running
    pub fn get(&self, key: &K) -> Option<Room> {
        self.shared.lookup(key)
    }

    pub fn room_count(&self) -> usize {
        self.shared
            .rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Register a client with the room for `key`
    pub async fn join(&self, key: &K, client: ClientHandle) {
        let mut command = RoomCommand::Register(client);
        loop {
            match self.room(key).send(command).await {
                Ok(()) => return,
                // Room was evicted after we looked it up.
                Err(returned) => command = returned,
            }
        }
    }

    pub async fn leave(&self, key: &K, client_id: Uuid) {
        if let Some(room) = self.get(key) {
            let _ = room.send(RoomCommand::Unregister(client_id)).await;
        }
    }

    /// Queue a text frame for every client in the room for `key`
    ///
    /// Returns `false` when nobody is subscribed to `key`.
    pub async fn broadcast(&self, key: &K, message: Utf8Bytes) -> bool {
        let mut command = RoomCommand::Broadcast(message);
        loop {
            let Some(room) = self.get(key) else {
                return false;
            };
            match room.send(command).await {
                Ok(()) => return true,
                Err(returned) => command = returned,
            }
        }
    }

    /// Serialize `event` once and broadcast it to its scope
    pub async fn publish(&self, key: &K, event: &RealtimeEvent) -> Result<bool, SharedError> {
        let frame = Utf8Bytes::from(event.to_json()?);
        Ok(self.broadcast(key, frame).await)
    }

    /// Wrap `payload` in an envelope scoped to `key` and broadcast it
    pub async fn emit<P: Serialize>(
        &self,
        key: &K,
        event_type: EventType,
        actor_id: Uuid,
        payload: &P,
    ) -> Result<bool, SharedError> {
        let event = RealtimeEvent::new(event_type, key, actor_id, payload)?;
        let delivered = self.publish(key, &event).await?;
        tracing::debug!(
            "[Realtime] {} {} for {} ({})",
            self.shared.name,
            event_type,
            key,
            if delivered { "delivered" } else { "no subscribers" }
        );
        Ok(delivered)
    }

    /// Deliver a frame to every client of `user_id`, whichever room it is in
    pub async fn send_to_user(&self, user_id: Uuid, message: Utf8Bytes) {
        let rooms: Vec<Room> = self
            .shared
            .rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for room in rooms {
            let command = RoomCommand::Direct {
                user_id,
                message: message.clone(),
            };
            // A room that stopped had no clients left.
            let _ = room.send(command).await;
        }
    }
}
