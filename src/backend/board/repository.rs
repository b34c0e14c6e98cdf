/**
 * Board Repository and Unit of Work
 *
 * `BoardRepository` is the set of raw statements the ordering engine and
 * the orchestrator issue. It is implemented twice per backend: once by a
 * direct handle (each statement commits on its own) and once by a unit of
 * work (nothing is visible until `commit`).
 *
 * `BoardStore` is the factory that hands out either kind of handle.
 * Dropping a unit of work without committing discards its writes.
 */

use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::board::ordering::{OrderScope, OrderSpan, Shift};
use crate::backend::error::DomainError;
use crate::shared::board::{Card, Column};

/// Read/write operations on columns and cards
#[async_trait]
pub trait BoardRepository: Send {
    /// Highest order in `scope`, `None` when the scope is empty
    async fn max_order(&mut self, scope: OrderScope) -> Result<Option<i32>, DomainError>;

    /// Move every item of `scope` whose order lies in `span` by one unit
    ///
    /// `exclude` is left untouched even if its order is in the span.
    /// Returns the number of items shifted.
    async fn shift(
        &mut self,
        scope: OrderScope,
        span: OrderSpan,
        exclude: Option<Uuid>,
        shift: Shift,
    ) -> Result<u64, DomainError>;

    async fn insert_column(&mut self, column: &Column) -> Result<(), DomainError>;

    async fn find_column(&mut self, column_id: Uuid) -> Result<Option<Column>, DomainError>;

    async fn list_columns(&mut self, project_id: Uuid) -> Result<Vec<Column>, DomainError>;

    async fn rename_column(&mut self, column_id: Uuid, name: &str) -> Result<Option<Column>, DomainError>;

    async fn set_column_order(&mut self, column_id: Uuid, order: i32) -> Result<(), DomainError>;

    async fn delete_column(&mut self, column_id: Uuid) -> Result<(), DomainError>;

    async fn insert_card(&mut self, card: &Card) -> Result<(), DomainError>;

    async fn find_card(&mut self, card_id: Uuid) -> Result<Option<Card>, DomainError>;

    /// Every card on a project's board
    async fn list_cards(&mut self, project_id: Uuid) -> Result<Vec<Card>, DomainError>;

    /// Write a card's `(column_id, order)` pair and bump `updated_at`
    async fn set_card_position(
        &mut self,
        card_id: Uuid,
        column_id: Uuid,
        order: i32,
    ) -> Result<Card, DomainError>;

    async fn delete_cards_in_column(&mut self, column_id: Uuid) -> Result<u64, DomainError>;

    async fn delete_card(&mut self, card_id: Uuid) -> Result<(), DomainError>;
}

/// A repository handle whose writes become visible only on `commit`
#[async_trait]
pub trait UnitOfWork: BoardRepository {
    /// Serialize all mutations of one project's board until commit or rollback
    async fn lock_board(&mut self, project_id: Uuid) -> Result<(), DomainError>;

    async fn commit(&mut self) -> Result<(), DomainError>;

    async fn rollback(&mut self) -> Result<(), DomainError>;
}

/// Hands out direct and transactional repository handles
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Handle whose statements apply immediately
    async fn direct(&self) -> Result<Box<dyn BoardRepository>, DomainError>;

    /// Begin a unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError>;
}
