/**
 * Board Data Model
 *
 * Columns and cards as they are persisted and as they travel to clients,
 * plus the typed payloads carried by board broadcast events.
 *
 * # Ordering
 *
 * Both columns (within a project) and cards (within a column) carry an
 * integer `order`. Values are 0-based and ascending. They are unique within
 * their scope but not required to be contiguous.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A column on a project's board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

/// A card inside a column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: Uuid,
    pub project_id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A column together with its cards, sorted by card order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnWithCards {
    #[serde(flatten)]
    pub column: Column,
    pub cards: Vec<Card>,
}

/// Full board snapshot
///
/// Clients fetch this after (re)connecting. Columns are sorted by column
/// order and each column's cards by card order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardView {
    pub project_id: Uuid,
    pub columns: Vec<ColumnWithCards>,
}

impl BoardView {
    /// Assemble a snapshot from unsorted rows
    ///
    /// Cards whose column is not in `columns` are ignored.
    pub fn assemble(project_id: Uuid, mut columns: Vec<Column>, mut cards: Vec<Card>) -> Self {
        columns.sort_by_key(|c| c.order);
        cards.sort_by_key(|c| c.order);

        let columns = columns
            .into_iter()
            .map(|column| {
                let cards = cards
                    .iter()
                    .filter(|card| card.column_id == column.id)
                    .cloned()
                    .collect();
                ColumnWithCards { column, cards }
            })
            .collect();

        Self { project_id, columns }
    }
}

/// Payload of a `card_moved` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardMoved {
    pub card_id: Uuid,
    pub from_column: Uuid,
    pub to_column: Uuid,
    pub new_order: i32,
}

/// Payload of a `column_reordered` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnReordered {
    pub column_id: Uuid,
    pub new_order: i32,
}

/// Payload of a `column_renamed` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnRenamed {
    pub column_id: Uuid,
    pub name: String,
}

/// Payload of a `column_deleted` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDeleted {
    pub column_id: Uuid,
}

/// Payload of a `card_deleted` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardDeleted {
    pub card_id: Uuid,
    pub column_id: Uuid,
}
