/**
 * Board Orchestrator
 *
 * Entry point for every board mutation. Each operation follows the same
 * shape:
 *
 * 1. Validate the input (no storage access)
 * 2. Check that the actor is a member of the project (`Forbidden` otherwise)
 * 3. Open a unit of work, take the board lock, re-read what the change
 *    depends on, run the ordering engine, write
 * 4. Commit, or roll back on any error
 *
 * Broadcasting is left to the caller, which only does it after a
 * successful return.
 */

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::backend::board::membership::{require_member, MembershipAuthority};
use crate::backend::board::ordering::{
    next_order, shift_after, shift_from, shift_range, validate_target, OrderScope,
};
use crate::backend::board::repository::{BoardStore, UnitOfWork};
use crate::backend::error::DomainError;
use crate::shared::board::{BoardView, Card, Column};

const MAX_NAME_LEN: usize = 255;

fn required_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(field, format!("{} cannot be empty", field)));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(
            field,
            format!("{} cannot exceed {} characters", field, MAX_NAME_LEN),
        ));
    }
    Ok(value.to_string())
}

/// Authorizes actors and runs board mutations inside units of work
#[derive(Clone)]
pub struct BoardOrchestrator {
    store: Arc<dyn BoardStore>,
    members: Arc<dyn MembershipAuthority>,
}

impl BoardOrchestrator {
    pub fn new(store: Arc<dyn BoardStore>, members: Arc<dyn MembershipAuthority>) -> Self {
        Self { store, members }
    }

    /// Fail with `Forbidden` unless `actor` belongs to `project_id`
    pub async fn authorize(&self, project_id: Uuid, actor: Uuid) -> Result<(), DomainError> {
        require_member(self.members.as_ref(), project_id, actor).await
    }

    /// Run `work` in a unit of work holding the board lock for `project_id`
    ///
    /// Commits when `work` succeeds. On error the unit of work is rolled
    /// back and the original error is returned.
    async fn transact<T, F>(&self, project_id: Uuid, work: F) -> Result<T, DomainError>
    where
        T: Send,
        F: for<'u> FnOnce(&'u mut dyn UnitOfWork) -> BoxFuture<'u, Result<T, DomainError>> + Send,
    {
        let mut uow = self.store.begin().await?;
        uow.lock_board(project_id).await?;

        match work(uow.as_mut()).await {
            Ok(value) => {
                uow.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::warn!("[Board] Rollback failed for project {}: {}", project_id, rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn read_card(&self, card_id: Uuid) -> Result<Card, DomainError> {
        let mut repo = self.store.direct().await?;
        repo.find_card(card_id)
            .await?
            .ok_or_else(|| DomainError::not_found("card", card_id))
    }

    /// Full board snapshot, columns and cards in order
    pub async fn get_board(&self, project_id: Uuid, actor: Uuid) -> Result<BoardView, DomainError> {
        self.authorize(project_id, actor).await?;

        let mut repo = self.store.direct().await?;
        let columns = repo.list_columns(project_id).await?;
        let cards = repo.list_cards(project_id).await?;
        Ok(BoardView::assemble(project_id, columns, cards))
    }

    /// Append a column at the end of the board
    pub async fn create_column(
        &self,
        project_id: Uuid,
        name: &str,
        actor: Uuid,
    ) -> Result<Column, DomainError> {
        let name = required_text("name", name)?;
        self.authorize(project_id, actor).await?;

        let column = self
            .transact(project_id, move |uow| {
                Box::pin(async move {
                    let order = next_order(&mut *uow, OrderScope::ProjectColumns(project_id)).await?;
                    let column = Column {
                        id: Uuid::new_v4(),
                        project_id,
                        name,
                        order,
                        created_at: Utc::now(),
                    };
                    uow.insert_column(&column).await?;
                    Ok(column)
                })
            })
            .await?;

        tracing::info!(
            "[Board] Column {} created in project {} at order {}",
            column.id,
            project_id,
            column.order
        );
        Ok(column)
    }

    /// Append a card at the end of a column
    pub async fn create_card(
        &self,
        project_id: Uuid,
        column_id: Uuid,
        title: &str,
        description: Option<String>,
        actor: Uuid,
    ) -> Result<Card, DomainError> {
        let title = required_text("title", title)?;
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.authorize(project_id, actor).await?;

        let card = self
            .transact(project_id, move |uow| {
                Box::pin(async move {
                    uow.find_column(column_id)
                        .await?
                        .filter(|c| c.project_id == project_id)
                        .ok_or_else(|| DomainError::not_found("column", column_id))?;

                    let order = next_order(&mut *uow, OrderScope::ColumnCards(column_id)).await?;
                    let now = Utc::now();
                    let card = Card {
                        id: Uuid::new_v4(),
                        project_id,
                        column_id,
                        title,
                        description,
                        order,
                        created_by: actor,
                        created_at: now,
                        updated_at: now,
                    };
                    uow.insert_card(&card).await?;
                    Ok(card)
                })
            })
            .await?;

        tracing::info!("[Board] Card {} created in column {} at order {}", card.id, column_id, card.order);
        Ok(card)
    }

    /// Move a card to `target_order` in `target_column_id`
    ///
    /// Returns the updated card and the column it came from. A target order
    /// past the end of the destination is clamped to the end.
    ///
    /// # Errors
    ///
    /// * `Validation` - negative order, or a target column not on the card's board
    /// * `NotFound` - the card does not exist
    /// * `Forbidden` - the actor is not a member of the card's project
    /// * `Persistence` - nothing was changed
    pub async fn move_card(
        &self,
        card_id: Uuid,
        target_column_id: Uuid,
        target_order: i32,
        actor: Uuid,
    ) -> Result<(Card, Uuid), DomainError> {
        validate_target(target_order)?;
        let card = self.read_card(card_id).await?;
        self.authorize(card.project_id, actor).await?;
        let project_id = card.project_id;

        let (moved, source_column) = self
            .transact(project_id, move |uow| {
                Box::pin(async move {
                    // Position may have changed before the lock was taken.
                    let card = uow
                        .find_card(card_id)
                        .await?
                        .ok_or_else(|| DomainError::not_found("card", card_id))?;
                    let source_column = card.column_id;
                    let source_order = card.order;

                    let target_exists = uow
                        .find_column(target_column_id)
                        .await?
                        .map_or(false, |c| c.project_id == card.project_id);
                    if !target_exists {
                        return Err(DomainError::validation(
                            "column_id",
                            "target column does not exist on this board",
                        ));
                    }

                    let order = if target_column_id != source_column {
                        let target_scope = OrderScope::ColumnCards(target_column_id);
                        let order = target_order.min(next_order(&mut *uow, target_scope).await?);
                        shift_after(&mut *uow, OrderScope::ColumnCards(source_column), source_order).await?;
                        shift_from(&mut *uow, target_scope, order).await?;
                        order
                    } else {
                        let scope = OrderScope::ColumnCards(source_column);
                        let last = uow.max_order(scope).await?.unwrap_or(source_order);
                        let order = target_order.min(last);
                        shift_range(&mut *uow, scope, card_id, source_order, order).await?;
                        order
                    };

                    let moved = uow.set_card_position(card_id, target_column_id, order).await?;
                    Ok((moved, source_column))
                })
            })
            .await?;

        tracing::info!(
            "[Board] Card {} moved from column {} to column {} at order {}",
            card_id,
            source_column,
            moved.column_id,
            moved.order
        );
        Ok((moved, source_column))
    }

    /// Move a column to `target_order` within its project
    ///
    /// Returns the order the column ended up at.
    pub async fn reorder_column(
        &self,
        project_id: Uuid,
        column_id: Uuid,
        target_order: i32,
        actor: Uuid,
    ) -> Result<i32, DomainError> {
        validate_target(target_order)?;
        self.authorize(project_id, actor).await?;

        let order = self
            .transact(project_id, move |uow| {
                Box::pin(async move {
                    let column = uow
                        .find_column(column_id)
                        .await?
                        .filter(|c| c.project_id == project_id)
                        .ok_or_else(|| DomainError::not_found("column", column_id))?;

                    let scope = OrderScope::ProjectColumns(project_id);
                    let last = uow.max_order(scope).await?.unwrap_or(column.order);
                    let order = target_order.min(last);
                    shift_range(&mut *uow, scope, column_id, column.order, order).await?;
                    uow.set_column_order(column_id, order).await?;
                    Ok(order)
                })
            })
            .await?;

        tracing::info!("[Board] Column {} reordered to {} in project {}", column_id, order, project_id);
        Ok(order)
    }

    pub async fn rename_column(
        &self,
        project_id: Uuid,
        column_id: Uuid,
        name: &str,
        actor: Uuid,
    ) -> Result<Column, DomainError> {
        let name = required_text("name", name)?;
        self.authorize(project_id, actor).await?;

        self.transact(project_id, move |uow| {
            Box::pin(async move {
                uow.find_column(column_id)
                    .await?
                    .filter(|c| c.project_id == project_id)
                    .ok_or_else(|| DomainError::not_found("column", column_id))?;
                uow.rename_column(column_id, &name)
                    .await?
                    .ok_or_else(|| DomainError::not_found("column", column_id))
            })
        })
        .await
    }

    /// Delete a column and every card in it
    ///
    /// Returns the number of cards removed with the column.
    pub async fn delete_column(
        &self,
        project_id: Uuid,
        column_id: Uuid,
        actor: Uuid,
    ) -> Result<u64, DomainError> {
        self.authorize(project_id, actor).await?;

        let removed = self
            .transact(project_id, move |uow| {
                Box::pin(async move {
                    let column = uow
                        .find_column(column_id)
                        .await?
                        .filter(|c| c.project_id == project_id)
                        .ok_or_else(|| DomainError::not_found("column", column_id))?;

                    let removed = uow.delete_cards_in_column(column_id).await?;
                    uow.delete_column(column_id).await?;
                    shift_after(&mut *uow, OrderScope::ProjectColumns(project_id), column.order).await?;
                    Ok(removed)
                })
            })
            .await?;

        tracing::info!(
            "[Board] Column {} deleted from project {} with {} cards",
            column_id,
            project_id,
            removed
        );
        Ok(removed)
    }

    /// Delete a card and close the gap it leaves in its column
    pub async fn delete_card(&self, card_id: Uuid, actor: Uuid) -> Result<Card, DomainError> {
        let card = self.read_card(card_id).await?;
        self.authorize(card.project_id, actor).await?;

        let deleted = self
            .transact(card.project_id, move |uow| {
                Box::pin(async move {
                    let card = uow
                        .find_card(card_id)
                        .await?
                        .ok_or_else(|| DomainError::not_found("card", card_id))?;
                    uow.delete_card(card_id).await?;
                    shift_after(&mut *uow, OrderScope::ColumnCards(card.column_id), card.order).await?;
                    Ok(card)
                })
            })
            .await?;

        tracing::info!("[Board] Card {} deleted from column {}", card_id, deleted.column_id);
        Ok(deleted)
    }
}
