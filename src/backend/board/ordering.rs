/**
 * Ordering Engine
 *
 * Maintains the integer `order` of columns within a project and of cards
 * within a column. Orders are never renumbered globally: every mutation
 * touches only the range it has to, by exactly one unit.
 *
 * # Operations
 *
 * - `next_order` - one past the current maximum, or `BASE_ORDER` for an empty scope
 * - `shift_from` - `[from, ..)` moves up by one, opening a slot at `from`
 * - `shift_after` - `(from, ..)` moves down by one, closing the gap left at `from`
 * - `shift_range` - same-scope move; only the items between origin and
 *   destination shift, in the direction opposite to the move
 *
 * The engine never opens a transaction itself. Each function runs against
 * whatever `BoardRepository` handle it is given, so the caller decides
 * whether a sequence of shifts is atomic.
 */

use uuid::Uuid;

use crate::backend::board::repository::BoardRepository;
use crate::backend::error::DomainError;

/// Order given to the first item of an empty scope
pub const BASE_ORDER: i32 = 0;

/// The grouping an order value is relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderScope {
    /// Column order within a project
    ProjectColumns(Uuid),
    /// Card order within a column
    ColumnCards(Uuid),
}

/// Inclusive range of order values; `end: None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpan {
    pub start: i32,
    pub end: Option<i32>,
}

impl OrderSpan {
    /// Every order `>= start`
    pub fn from(start: i32) -> Self {
        Self { start, end: None }
    }

    /// Orders in `[start, end]`
    pub fn between(start: i32, end: i32) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn contains(&self, order: i32) -> bool {
        order >= self.start && self.end.map_or(true, |end| order <= end)
    }
}

/// Direction of a one-unit shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
}

impl Shift {
    pub fn delta(self) -> i32 {
        match self {
            Shift::Up => 1,
            Shift::Down => -1,
        }
    }
}

/// Shift needed to move one item within its own scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeShift {
    pub span: OrderSpan,
    pub shift: Shift,
}

/// Plan a same-scope move from `from` to `to`
///
/// Moving earlier opens a slot at `to` by pushing `[to, from)` up; moving
/// later closes the origin by pulling `(from, to]` down. Equal positions
/// need no shift.
///
/// # Example
///
/// ```rust
/// use boardsync::backend::board::ordering::{plan_move, OrderSpan, Shift};
///
/// let plan = plan_move(3, 1).unwrap();
/// assert_eq!(plan.span, OrderSpan::between(1, 2));
/// assert_eq!(plan.shift, Shift::Up);
/// assert!(plan_move(2, 2).is_none());
/// ```
pub fn plan_move(from: i32, to: i32) -> Option<RangeShift> {
    if to < from {
        Some(RangeShift {
            span: OrderSpan::between(to, from - 1),
            shift: Shift::Up,
        })
    } else if to > from {
        Some(RangeShift {
            span: OrderSpan::between(from + 1, to),
            shift: Shift::Down,
        })
    } else {
        None
    }
}

/// Reject orders that can never be valid positions
pub fn validate_target(order: i32) -> Result<(), DomainError> {
    if order < BASE_ORDER {
        return Err(DomainError::validation(
            "order",
            format!("order must be at least {}", BASE_ORDER),
        ));
    }
    Ok(())
}

/// One greater than the highest order in `scope`, or `BASE_ORDER`
pub async fn next_order<R>(repo: &mut R, scope: OrderScope) -> Result<i32, DomainError>
where
    R: BoardRepository + ?Sized,
{
    Ok(repo
        .max_order(scope)
        .await?
        .map_or(BASE_ORDER, |max| max + 1))
}

/// Open a slot at `from`: every order `>= from` moves up by one
pub async fn shift_from<R>(repo: &mut R, scope: OrderScope, from: i32) -> Result<u64, DomainError>
where
    R: BoardRepository + ?Sized,
{
    repo.shift(scope, OrderSpan::from(from), None, Shift::Up).await
}

/// Close the gap at `from`: every order `> from` moves down by one
pub async fn shift_after<R>(repo: &mut R, scope: OrderScope, from: i32) -> Result<u64, DomainError>
where
    R: BoardRepository + ?Sized,
{
    repo.shift(scope, OrderSpan::from(from + 1), None, Shift::Down).await
}

/// Shift the items between `from` and `to` so `item` can take `to`
///
/// `item` itself is excluded from the update. Returns the number of rows
/// shifted; zero when `from == to`.
pub async fn shift_range<R>(
    repo: &mut R,
    scope: OrderScope,
    item: Uuid,
    from: i32,
    to: i32,
) -> Result<u64, DomainError>
where
    R: BoardRepository + ?Sized,
{
    match plan_move(from, to) {
        Some(plan) => repo.shift(scope, plan.span, Some(item), plan.shift).await,
        None => Ok(0),
    }
}
