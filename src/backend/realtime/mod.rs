//! Real-time Delivery
//!
//! Generic publish/subscribe over WebSockets.
//!
//! # Architecture
//!
//! - **`hub`** - scope key to room registry, one hub per kind of scope
//! - **`room`** - one task per scope owning its client set
//! - **`client`** - per-connection read and write loops
//! - **`subscription`** - the `/ws/...` upgrade handlers
//!
//! # Scopes
//!
//! | Hub      | Key        | Carries                                 |
//! |----------|------------|-----------------------------------------|
//! | `board`  | project id | column and card events                  |
//! | `thread` | issue id   | comment events, typing, direct mentions |
//! | `user`   | user id    | notifications                           |
//!
//! Events are JSON text frames:
//!
//! ```json
//! {"type": "card_moved", "scope_id": "...", "actor_id": "...", "payload": {...}}
//! ```
//!
//! A client that cannot keep up is dropped rather than slowing the room
//! down. It should reconnect and fetch a fresh board snapshot.

pub mod client;
pub mod hub;
pub mod room;
pub mod subscription;

pub use client::{run_client, ClientSettings};
pub use hub::{Hub, RoomKey};
pub use room::{ClientHandle, DeliveryFailure, Room};
