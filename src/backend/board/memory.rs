/**
 * In-Memory Board Store
 *
 * A `BoardStore` kept entirely in process memory. The server falls back to
 * it when `DATABASE_URL` is not configured, and tests use it to drive the
 * orchestrator without Postgres.
 *
 * # Units of Work
 *
 * `begin()` takes the store's lock for the lifetime of the unit of work and
 * works on a private copy of the data. `commit()` checks that no scope holds
 * a duplicate order and writes the copy back; rollback or drop throws it
 * away. Holding the lock serializes every unit of work, which plays the role
 * of the per-board advisory lock taken by the Postgres store.
 *
 * Direct handles lock per statement and apply the same duplicate-order check
 * before publishing the write.
 *
 * # Fault Injection
 *
 * `fail_on(FailPoint)` makes the matching statement return a persistence
 * error, so callers can observe what a failed unit of work leaves behind.
 */

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::backend::board::ordering::{OrderScope, OrderSpan, Shift};
use crate::backend::board::repository::{BoardRepository, BoardStore, UnitOfWork};
use crate::backend::error::DomainError;
use crate::shared::board::{Card, Column};

/// Statement that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Shift,
    InsertColumn,
    InsertCard,
    RenameColumn,
    SetColumnOrder,
    SetCardPosition,
    DeleteColumn,
    DeleteCard,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Faults(Arc<std::sync::Mutex<HashSet<FailPoint>>>);

impl Faults {
    fn check(&self, point: FailPoint) -> Result<(), DomainError> {
        let armed = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if armed.contains(&point) {
            return Err(DomainError::persistence(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct BoardData {
    columns: HashMap<Uuid, Column>,
    cards: HashMap<Uuid, Card>,
}

impl BoardData {
    fn max_order(&self, scope: OrderScope) -> Option<i32> {
        match scope {
            OrderScope::ProjectColumns(project_id) => self
                .columns
                .values()
                .filter(|c| c.project_id == project_id)
                .map(|c| c.order)
                .max(),
            OrderScope::ColumnCards(column_id) => self
                .cards
                .values()
                .filter(|c| c.column_id == column_id)
                .map(|c| c.order)
                .max(),
        }
    }

    fn shift(&mut self, scope: OrderScope, span: OrderSpan, exclude: Option<Uuid>, shift: Shift) -> u64 {
        let delta = shift.delta();
        let mut shifted = 0;
        match scope {
            OrderScope::ProjectColumns(project_id) => {
                for column in self.columns.values_mut() {
                    if column.project_id == project_id
                        && Some(column.id) != exclude
                        && span.contains(column.order)
                    {
                        column.order += delta;
                        shifted += 1;
                    }
                }
            }
            OrderScope::ColumnCards(column_id) => {
                let now = Utc::now();
                for card in self.cards.values_mut() {
                    if card.column_id == column_id && Some(card.id) != exclude && span.contains(card.order) {
                        card.order += delta;
                        card.updated_at = now;
                        shifted += 1;
                    }
                }
            }
        }
        shifted
    }

    /// Mirror of the unique `(scope, order)` constraints
    fn check_unique(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for column in self.columns.values() {
            if !seen.insert((OrderScope::ProjectColumns(column.project_id), column.order)) {
                return Err(DomainError::persistence(format!(
                    "duplicate column order {} in project {}",
                    column.order, column.project_id
                )));
            }
        }
        for card in self.cards.values() {
            if !seen.insert((OrderScope::ColumnCards(card.column_id), card.order)) {
                return Err(DomainError::persistence(format!(
                    "duplicate card order {} in column {}",
                    card.order, card.column_id
                )));
            }
        }
        Ok(())
    }
}

enum Access {
    Direct(Arc<Mutex<BoardData>>),
    Work {
        guard: Option<OwnedMutexGuard<BoardData>>,
        working: BoardData,
    },
}

/// Repository handle over a `MemoryBoardStore`
pub struct MemoryBoardHandle {
    access: Access,
    faults: Faults,
}

fn finished() -> DomainError {
    DomainError::persistence("unit of work already finished")
}

impl MemoryBoardHandle {
    async fn read<T, F>(&mut self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&BoardData) -> T + Send,
    {
        match &mut self.access {
            Access::Direct(data) => {
                let data = data.lock().await;
                Ok(f(&data))
            }
            Access::Work { guard: Some(_), working } => Ok(f(working)),
            Access::Work { guard: None, .. } => Err(finished()),
        }
    }

    async fn write<T, F>(&mut self, point: FailPoint, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut BoardData) -> Result<T, DomainError> + Send,
    {
        self.faults.check(point)?;
        match &mut self.access {
            Access::Direct(data) => {
                let mut data = data.lock().await;
                let mut staged = data.clone();
                let out = f(&mut staged)?;
                staged.check_unique()?;
                *data = staged;
                Ok(out)
            }
            Access::Work { guard: Some(_), working } => f(working),
            Access::Work { guard: None, .. } => Err(finished()),
        }
    }
}

#[async_trait]
impl BoardRepository for MemoryBoardHandle {
    async fn max_order(&mut self, scope: OrderScope) -> Result<Option<i32>, DomainError> {
        self.read(|d| d.max_order(scope)).await
    }

    async fn shift(
        &mut self,
        scope: OrderScope,
        span: OrderSpan,
        exclude: Option<Uuid>,
        shift: Shift,
    ) -> Result<u64, DomainError> {
        self.write(FailPoint::Shift, |d| Ok(d.shift(scope, span, exclude, shift)))
            .await
    }

    async fn insert_column(&mut self, column: &Column) -> Result<(), DomainError> {
        let column = column.clone();
        self.write(FailPoint::InsertColumn, move |d| {
            d.columns.insert(column.id, column);
            Ok(())
        })
        .await
    }

    async fn find_column(&mut self, column_id: Uuid) -> Result<Option<Column>, DomainError> {
        self.read(|d| d.columns.get(&column_id).cloned()).await
    }

    async fn list_columns(&mut self, project_id: Uuid) -> Result<Vec<Column>, DomainError> {
        self.read(|d| {
            let mut columns: Vec<Column> = d
                .columns
                .values()
                .filter(|c| c.project_id == project_id)
                .cloned()
                .collect();
            columns.sort_by_key(|c| c.order);
            columns
        })
        .await
    }

    async fn rename_column(&mut self, column_id: Uuid, name: &str) -> Result<Option<Column>, DomainError> {
        let name = name.to_string();
        self.write(FailPoint::RenameColumn, move |d| {
            Ok(d.columns.get_mut(&column_id).map(|column| {
                column.name = name;
                column.clone()
            }))
        })
        .await
    }

    async fn set_column_order(&mut self, column_id: Uuid, order: i32) -> Result<(), DomainError> {
        self.write(FailPoint::SetColumnOrder, |d| {
            let column = d
                .columns
                .get_mut(&column_id)
                .ok_or_else(|| DomainError::not_found("column", column_id))?;
            column.order = order;
            Ok(())
        })
        .await
    }

    async fn delete_column(&mut self, column_id: Uuid) -> Result<(), DomainError> {
        self.write(FailPoint::DeleteColumn, |d| {
            d.columns.remove(&column_id);
            Ok(())
        })
        .await
    }

    async fn insert_card(&mut self, card: &Card) -> Result<(), DomainError> {
        let card = card.clone();
        self.write(FailPoint::InsertCard, move |d| {
            d.cards.insert(card.id, card);
            Ok(())
        })
        .await
    }

    async fn find_card(&mut self, card_id: Uuid) -> Result<Option<Card>, DomainError> {
        self.read(|d| d.cards.get(&card_id).cloned()).await
    }

    async fn list_cards(&mut self, project_id: Uuid) -> Result<Vec<Card>, DomainError> {
        self.read(|d| {
            let mut cards: Vec<Card> = d
                .cards
                .values()
                .filter(|c| c.project_id == project_id)
                .cloned()
                .collect();
            cards.sort_by_key(|c| (c.column_id, c.order));
            cards
        })
        .await
    }

    async fn set_card_position(
        &mut self,
        card_id: Uuid,
        column_id: Uuid,
        order: i32,
    ) -> Result<Card, DomainError> {
        self.write(FailPoint::SetCardPosition, |d| {
            let card = d
                .cards
                .get_mut(&card_id)
                .ok_or_else(|| DomainError::not_found("card", card_id))?;
            card.column_id = column_id;
            card.order = order;
            card.updated_at = Utc::now();
            Ok(card.clone())
        })
        .await
    }

    async fn delete_cards_in_column(&mut self, column_id: Uuid) -> Result<u64, DomainError> {
        self.write(FailPoint::DeleteCard, |d| {
            let before = d.cards.len();
            d.cards.retain(|_, card| card.column_id != column_id);
            Ok((before - d.cards.len()) as u64)
        })
        .await
    }

    async fn delete_card(&mut self, card_id: Uuid) -> Result<(), DomainError> {
        self.write(FailPoint::DeleteCard, |d| {
            d.cards.remove(&card_id);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl UnitOfWork for MemoryBoardHandle {
    async fn lock_board(&mut self, _project_id: Uuid) -> Result<(), DomainError> {
        // The store lock is already held for the whole unit of work.
        match &self.access {
            Access::Work { guard: None, .. } => Err(finished()),
            _ => Ok(()),
        }
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        self.faults.check(FailPoint::Commit)?;
        match &mut self.access {
            Access::Direct(_) => Ok(()),
            Access::Work { guard, working } => {
                let mut guard = guard.take().ok_or_else(finished)?;
                working.check_unique()?;
                *guard = std::mem::take(working);
                Ok(())
            }
        }
    }

    async fn rollback(&mut self) -> Result<(), DomainError> {
        if let Access::Work { guard, working } = &mut self.access {
            guard.take();
            *working = BoardData::default();
        }
        Ok(())
    }
}

/// Process-local board storage
#[derive(Clone, Default)]
pub struct MemoryBoardStore {
    data: Arc<Mutex<BoardData>>,
    faults: Faults,
}

impl MemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every statement at `point` fail until `clear_faults`
    pub fn fail_on(&self, point: FailPoint) {
        self.faults
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(point);
    }

    pub fn clear_faults(&self) {
        self.faults
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl BoardStore for MemoryBoardStore {
    async fn direct(&self) -> Result<Box<dyn BoardRepository>, DomainError> {
        Ok(Box::new(MemoryBoardHandle {
            access: Access::Direct(self.data.clone()),
            faults: self.faults.clone(),
        }))
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        let guard = self.data.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryBoardHandle {
            access: Access::Work {
                guard: Some(guard),
                working,
            },
            faults: self.faults.clone(),
        }))
    }
}
