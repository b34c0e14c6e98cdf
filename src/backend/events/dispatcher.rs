/**
 * Event Dispatcher
 *
 * A bounded queue drained by a fixed number of worker tasks. Workers
 * share the receiver behind a mutex and take one event at a time.
 */

use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::backend::events::{DomainEvent, EventKind, HandlerTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("event queue is full")]
    QueueFull,

    #[error("event workers have stopped")]
    Closed,
}

/// Submits domain events to the worker pool
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<DomainEvent>,
}

impl Dispatcher {
    /// Spawn `workers` tasks sharing a queue of `capacity` events
    pub fn start(table: HandlerTable, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let table = Arc::new(table);

        let workers = workers.max(1);
        for worker in 0..workers {
            tokio::spawn(run_worker(worker, Arc::clone(&rx), Arc::clone(&table)));
        }
        tracing::info!("[Events] Dispatcher started with {} workers, queue {}", workers, capacity);

        Self { tx }
    }

    /// Queue `event` without waiting
    ///
    /// A full queue drops the event; the caller's request is not affected.
    pub fn dispatch(&self, event: DomainEvent) -> Result<(), DispatchError> {
        let kind = event.kind();
        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!("[Events] Queue full, dropped {:?}", kind);
                DispatchError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => {
                tracing::warn!("[Events] Workers stopped, dropped {:?}", kind);
                DispatchError::Closed
            }
        })
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<DomainEvent>>>,
    table: Arc<HandlerTable>,
) {
    loop {
        // Lock is released before the handlers run.
        let next = rx.lock().await.recv().await;
        let Some(event) = next else {
            break;
        };
        handle(worker, &table, &event).await;
    }
    tracing::debug!("[Events] Worker {} stopped", worker);
}

async fn handle(worker: usize, table: &HandlerTable, event: &DomainEvent) {
    let kind: EventKind = event.kind();
    let handlers = table.handlers_for(kind);
    let results = join_all(handlers.iter().map(|handler| handler.handle(event))).await;

    for (handler, result) in handlers.iter().zip(results) {
        match result {
            Ok(()) => tracing::debug!("[Events] Worker {} ran {} for {:?}", worker, handler.name(), kind),
            Err(err) => tracing::warn!("[Events] {} failed for {:?}: {}", handler.name(), kind, err),
        }
    }
}
