/**
 * PostgreSQL Board Store
 *
 * `PgBoardStore` hands out handles over a `PgPool`. A direct handle owns a
 * pooled connection; a unit of work owns a `Transaction<'static, Postgres>`.
 * Both run the exact same statements through `PgBoardHandle::conn()`.
 *
 * # Concurrency
 *
 * `lock_board` takes `pg_advisory_xact_lock` on a key derived from the
 * project id, so mutations of one board are serialized until the surrounding
 * transaction ends. The `(project_id, "order")` and `(column_id, "order")`
 * unique constraints are deferred to commit time; transient duplicates
 * during a shift are allowed, a duplicate at commit aborts the transaction.
 *
 * # Tables
 *
 * - `board_columns(id, project_id, name, "order", created_at)`
 * - `board_cards(id, project_id, column_id, title, description, "order",
 *   created_by, created_at, updated_at)`
 */

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::backend::board::ordering::{OrderScope, OrderSpan, Shift};
use crate::backend::board::repository::{BoardRepository, BoardStore, UnitOfWork};
use crate::backend::error::DomainError;
use crate::shared::board::{Card, Column};

const COLUMN_FIELDS: &str = r#"id, project_id, name, "order", created_at"#;
const CARD_FIELDS: &str =
    r#"id, project_id, column_id, title, description, "order", created_by, created_at, updated_at"#;

fn column_from_row(row: &PgRow) -> Result<Column, sqlx::Error> {
    Ok(Column {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        name: row.try_get("name")?,
        order: row.try_get("order")?,
        created_at: row.try_get("created_at")?,
    })
}

fn card_from_row(row: &PgRow) -> Result<Card, sqlx::Error> {
    Ok(Card {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        column_id: row.try_get("column_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        order: row.try_get("order")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Advisory lock key namespace for board mutations
fn board_lock_key(project_id: Uuid) -> String {
    format!("board:{}", project_id)
}

enum PgHandle {
    Direct(PoolConnection<Postgres>),
    Work(Option<Transaction<'static, Postgres>>),
}

/// Repository handle over a pooled connection or an open transaction
pub struct PgBoardHandle {
    handle: PgHandle,
}

impl PgBoardHandle {
    fn conn(&mut self) -> Result<&mut PgConnection, DomainError> {
        match &mut self.handle {
            PgHandle::Direct(conn) => Ok(&mut **conn),
            PgHandle::Work(Some(tx)) => Ok(&mut **tx),
            PgHandle::Work(None) => Err(DomainError::persistence("unit of work already finished")),
        }
    }
}

#[async_trait]
impl BoardRepository for PgBoardHandle {
    async fn max_order(&mut self, scope: OrderScope) -> Result<Option<i32>, DomainError> {
        let (sql, key) = match scope {
            OrderScope::ProjectColumns(project_id) => (
                r#"SELECT MAX("order") FROM board_columns WHERE project_id = $1"#,
                project_id,
            ),
            OrderScope::ColumnCards(column_id) => (
                r#"SELECT MAX("order") FROM board_cards WHERE column_id = $1"#,
                column_id,
            ),
        };
        let max: Option<i32> = sqlx::query_scalar(sql)
            .bind(key)
            .fetch_one(self.conn()?)
            .await?;
        Ok(max)
    }

    async fn shift(
        &mut self,
        scope: OrderScope,
        span: OrderSpan,
        exclude: Option<Uuid>,
        shift: Shift,
    ) -> Result<u64, DomainError> {
        let (sql, key) = match scope {
            OrderScope::ProjectColumns(project_id) => (
                r#"UPDATE board_columns SET "order" = "order" + $1
                   WHERE project_id = $2
                     AND "order" >= $3
                     AND ($4::int IS NULL OR "order" <= $4)
                     AND ($5::uuid IS NULL OR id <> $5)"#,
                project_id,
            ),
            OrderScope::ColumnCards(column_id) => (
                r#"UPDATE board_cards SET "order" = "order" + $1, updated_at = NOW()
                   WHERE column_id = $2
                     AND "order" >= $3
                     AND ($4::int IS NULL OR "order" <= $4)
                     AND ($5::uuid IS NULL OR id <> $5)"#,
                column_id,
            ),
        };
        let result = sqlx::query(sql)
            .bind(shift.delta())
            .bind(key)
            .bind(span.start)
            .bind(span.end)
            .bind(exclude)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_column(&mut self, column: &Column) -> Result<(), DomainError> {
        sqlx::query(
            r#"INSERT INTO board_columns (id, project_id, name, "order", created_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(column.id)
        .bind(column.project_id)
        .bind(&column.name)
        .bind(column.order)
        .bind(column.created_at)
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn find_column(&mut self, column_id: Uuid) -> Result<Option<Column>, DomainError> {
        let sql = format!("SELECT {} FROM board_columns WHERE id = $1", COLUMN_FIELDS);
        let row = sqlx::query(&sql)
            .bind(column_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.as_ref().map(column_from_row).transpose()?)
    }

    async fn list_columns(&mut self, project_id: Uuid) -> Result<Vec<Column>, DomainError> {
        let sql = format!(
            r#"SELECT {} FROM board_columns WHERE project_id = $1 ORDER BY "order""#,
            COLUMN_FIELDS
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(rows.iter().map(column_from_row).collect::<Result<_, _>>()?)
    }

    async fn rename_column(&mut self, column_id: Uuid, name: &str) -> Result<Option<Column>, DomainError> {
        let sql = format!(
            "UPDATE board_columns SET name = $2 WHERE id = $1 RETURNING {}",
            COLUMN_FIELDS
        );
        let row = sqlx::query(&sql)
            .bind(column_id)
            .bind(name)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.as_ref().map(column_from_row).transpose()?)
    }

    async fn set_column_order(&mut self, column_id: Uuid, order: i32) -> Result<(), DomainError> {
        let result = sqlx::query(r#"UPDATE board_columns SET "order" = $2 WHERE id = $1"#)
            .bind(column_id)
            .bind(order)
            .execute(self.conn()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("column", column_id));
        }
        Ok(())
    }

    async fn delete_column(&mut self, column_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM board_columns WHERE id = $1")
            .bind(column_id)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn insert_card(&mut self, card: &Card) -> Result<(), DomainError> {
        sqlx::query(
            r#"INSERT INTO board_cards
                 (id, project_id, column_id, title, description, "order", created_by, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(card.id)
        .bind(card.project_id)
        .bind(card.column_id)
        .bind(&card.title)
        .bind(&card.description)
        .bind(card.order)
        .bind(card.created_by)
        .bind(card.created_at)
        .bind(card.updated_at)
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn find_card(&mut self, card_id: Uuid) -> Result<Option<Card>, DomainError> {
        let sql = format!("SELECT {} FROM board_cards WHERE id = $1", CARD_FIELDS);
        let row = sqlx::query(&sql)
            .bind(card_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.as_ref().map(card_from_row).transpose()?)
    }

    async fn list_cards(&mut self, project_id: Uuid) -> Result<Vec<Card>, DomainError> {
        let sql = format!(
            r#"SELECT {} FROM board_cards WHERE project_id = $1 ORDER BY column_id, "order""#,
            CARD_FIELDS
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(rows.iter().map(card_from_row).collect::<Result<_, _>>()?)
    }

    async fn set_card_position(
        &mut self,
        card_id: Uuid,
        column_id: Uuid,
        order: i32,
    ) -> Result<Card, DomainError> {
        let sql = format!(
            r#"UPDATE board_cards SET column_id = $2, "order" = $3, updated_at = NOW()
               WHERE id = $1 RETURNING {}"#,
            CARD_FIELDS
        );
        let row = sqlx::query(&sql)
            .bind(card_id)
            .bind(column_id)
            .bind(order)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| DomainError::not_found("card", card_id))?;
        Ok(card_from_row(&row)?)
    }

    async fn delete_cards_in_column(&mut self, column_id: Uuid) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM board_cards WHERE column_id = $1")
            .bind(column_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_card(&mut self, card_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM board_cards WHERE id = $1")
            .bind(card_id)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgBoardHandle {
    async fn lock_board(&mut self, project_id: Uuid) -> Result<(), DomainError> {
        if let PgHandle::Direct(_) = self.handle {
            return Err(DomainError::persistence("board lock requires a unit of work"));
        }
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(board_lock_key(project_id))
            .execute(self.conn()?)
            .await?;
        tracing::debug!("[Board] Advisory lock taken for project {}", project_id);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        match &mut self.handle {
            PgHandle::Direct(_) => Ok(()),
            PgHandle::Work(tx) => {
                let tx = tx
                    .take()
                    .ok_or_else(|| DomainError::persistence("unit of work already finished"))?;
                tx.commit().await?;
                Ok(())
            }
        }
    }

    async fn rollback(&mut self) -> Result<(), DomainError> {
        if let PgHandle::Work(tx) = &mut self.handle {
            if let Some(tx) = tx.take() {
                tx.rollback().await?;
            }
        }
        Ok(())
    }
}

/// Board storage backed by PostgreSQL
#[derive(Clone)]
pub struct PgBoardStore {
    pool: PgPool,
}

impl PgBoardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoardStore for PgBoardStore {
    async fn direct(&self) -> Result<Box<dyn BoardRepository>, DomainError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgBoardHandle {
            handle: PgHandle::Direct(conn),
        }))
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBoardHandle {
            handle: PgHandle::Work(Some(tx)),
        }))
    }
}
