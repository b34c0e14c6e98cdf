/**
 * Client Connection Loops
 *
 * Each WebSocket connection runs a write loop (spawned task) and a read
 * loop (the upgrade task). The write loop drains the client's bounded
 * queue into the socket and pings on an idle timer; the read loop feeds
 * text frames to a handler and records pongs. Whichever side ends first
 * ends the connection, and the client is unregistered from its room.
 */

use std::future::Future;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::backend::realtime::hub::{Hub, RoomKey};
use crate::backend::realtime::room::ClientHandle;

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Outbound frames buffered before the client counts as too slow
    pub queue_capacity: usize,
    pub ping_interval: Duration,
    /// Close the connection when no pong arrived for this long
    pub pong_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// The room dropped the client
    QueueClosed,
    PongTimeout,
    SinkClosed,
}

/// Forward queued frames to `sink` until the queue closes or the peer goes quiet
pub async fn write_loop<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<Utf8Bytes>,
    last_pong: watch::Receiver<Instant>,
    settings: ClientSettings,
) -> WriterExit
where
    S: Sink<Message> + Unpin,
{
    let mut ping = tokio::time::interval(settings.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;

    loop {
        tokio::select! {
            queued = rx.recv() => match queued {
                Some(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        return WriterExit::SinkClosed;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return WriterExit::QueueClosed;
                }
            },
            _ = ping.tick() => {
                if last_pong.borrow().elapsed() > settings.pong_timeout {
                    let _ = sink.send(Message::Close(None)).await;
                    return WriterExit::PongTimeout;
                }
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    return WriterExit::SinkClosed;
                }
            }
        }
    }
}

/// Serve one WebSocket connection subscribed to the room for `key`
///
/// `on_text` is called with every text frame the client sends. Returns when
/// the connection ends, after the client has left the room.
pub async fn run_client<K, H, Fut>(
    socket: WebSocket,
    hub: Hub<K>,
    key: K,
    user_id: Uuid,
    settings: ClientSettings,
    mut on_text: H,
) where
    K: RoomKey,
    H: FnMut(String) -> Fut + Send,
    Fut: Future<Output = ()> + Send,
{
    let (client, rx) = ClientHandle::new(user_id, settings.queue_capacity);
    let client_id = client.id;
    let (sink, mut stream) = socket.split();
    let (pong_tx, pong_rx) = watch::channel(Instant::now());

    hub.join(&key, client).await;
    tracing::info!("[Realtime] User {} connected to {} (client {})", user_id, key, client_id);

    let mut writer = tokio::spawn(write_loop(sink, rx, pong_rx, settings));
    let mut writer_done = false;

    loop {
        tokio::select! {
            exit = &mut writer => {
                writer_done = true;
                tracing::debug!("[Realtime] Writer for client {} finished: {:?}", client_id, exit);
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => on_text(text.to_string()).await,
                Some(Ok(Message::Pong(_))) => {
                    let _ = pong_tx.send(Instant::now());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!("[Realtime] Read error on client {}: {}", client_id, err);
                    break;
                }
            }
        }
    }

    hub.leave(&key, client_id).await;
    if !writer_done {
        // Leaving closes the queue, which lets the writer send Close.
        if tokio::time::timeout(Duration::from_secs(5), &mut writer).await.is_err() {
            writer.abort();
        }
    }
    tracing::info!("[Realtime] User {} disconnected from {} (client {})", user_id, key, client_id);
}
