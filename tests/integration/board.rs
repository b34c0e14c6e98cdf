//! Board orchestrator tests
//!
//! Ordering, atomicity and authorization of kanban mutations, driven
//! through the in-memory store.

use pretty_assertions::assert_eq;
use uuid::Uuid;

use boardsync::backend::board::FailPoint;
use boardsync::backend::DomainError;

use crate::common::fixtures::TestApp;

fn ids(cards: &[(Uuid, i32)]) -> Vec<Uuid> {
    cards.iter().map(|(id, _)| *id).collect()
}

fn orders(cards: &[(Uuid, i32)]) -> Vec<i32> {
    cards.iter().map(|(_, order)| *order).collect()
}

#[tokio::test]
async fn test_move_earlier_shifts_only_the_range() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 4).await;

    let (moved, source) = assert_ok!(app.state.board.move_card(cards[3].id, column.id, 1, app.user).await);
    assert_eq!(moved.order, 1);
    assert_eq!(source, column.id);

    let after = app.column_cards(column.id).await;
    assert_eq!(ids(&after), vec![cards[0].id, cards[3].id, cards[1].id, cards[2].id]);
    assert_eq!(orders(&after), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_move_later_shifts_only_the_range() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 4).await;

    assert_ok!(app.state.board.move_card(cards[0].id, column.id, 2, app.user).await);

    let after = app.column_cards(column.id).await;
    assert_eq!(ids(&after), vec![cards[1].id, cards[2].id, cards[0].id, cards[3].id]);
    assert_eq!(orders(&after), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_move_to_same_position_changes_nothing() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 3).await;
    let before = app.column_cards(column.id).await;

    let (moved, _) = assert_ok!(app.state.board.move_card(cards[1].id, column.id, 1, app.user).await);

    assert_eq!(moved.order, 1);
    assert_eq!(app.column_cards(column.id).await, before);
}

#[tokio::test]
async fn test_cross_column_move_closes_and_opens_gaps() {
    let app = TestApp::new().await;
    let todo = app.column("Todo").await;
    let doing = app.column("Doing").await;
    let a = app.cards(todo.id, 3).await;
    let b = app.cards(doing.id, 2).await;

    let (moved, source) = assert_ok!(app.state.board.move_card(a[1].id, doing.id, 1, app.user).await);
    assert_eq!(source, todo.id);
    assert_eq!(moved.column_id, doing.id);
    assert_eq!(moved.order, 1);

    let todo_after = app.column_cards(todo.id).await;
    assert_eq!(ids(&todo_after), vec![a[0].id, a[2].id]);
    assert_eq!(orders(&todo_after), vec![0, 1]);

    let doing_after = app.column_cards(doing.id).await;
    assert_eq!(ids(&doing_after), vec![b[0].id, a[1].id, b[1].id]);
    assert_eq!(orders(&doing_after), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_move_past_the_end_is_clamped() {
    let app = TestApp::new().await;
    let todo = app.column("Todo").await;
    let doing = app.column("Doing").await;
    let a = app.cards(todo.id, 4).await;
    app.cards(doing.id, 2).await;

    let (moved, _) = assert_ok!(app.state.board.move_card(a[0].id, todo.id, 99, app.user).await);
    assert_eq!(moved.order, 3);
    assert_eq!(orders(&app.column_cards(todo.id).await), vec![0, 1, 2, 3]);

    let (moved, _) = assert_ok!(app.state.board.move_card(a[1].id, doing.id, 99, app.user).await);
    assert_eq!(moved.order, 2);
    assert_eq!(orders(&app.column_cards(doing.id).await), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_move_into_empty_column() {
    let app = TestApp::new().await;
    let todo = app.column("Todo").await;
    let done = app.column("Done").await;
    let cards = app.cards(todo.id, 2).await;

    let (moved, _) = assert_ok!(app.state.board.move_card(cards[0].id, done.id, 5, app.user).await);

    assert_eq!(moved.order, 0);
    assert_eq!(app.column_cards(done.id).await, vec![(cards[0].id, 0)]);
    assert_eq!(app.column_cards(todo.id).await, vec![(cards[1].id, 0)]);
}

#[tokio::test]
async fn test_failed_position_write_leaves_board_untouched() {
    let app = TestApp::new().await;
    let todo = app.column("Todo").await;
    let doing = app.column("Doing").await;
    let a = app.cards(todo.id, 3).await;
    app.cards(doing.id, 2).await;
    let before = assert_ok!(app.state.board.get_board(app.project, app.user).await);

    app.store.fail_on(FailPoint::SetCardPosition);
    assert_err!(
        app.state.board.move_card(a[0].id, doing.id, 0, app.user).await,
        DomainError::Persistence(_)
    );
    app.store.clear_faults();

    let after = assert_ok!(app.state.board.get_board(app.project, app.user).await);
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_failed_shift_leaves_board_untouched() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 4).await;
    let before = app.column_cards(column.id).await;

    app.store.fail_on(FailPoint::Shift);
    assert_err!(
        app.state.board.move_card(cards[3].id, column.id, 0, app.user).await,
        DomainError::Persistence(_)
    );
    app.store.clear_faults();

    assert_eq!(app.column_cards(column.id).await, before);
}

#[tokio::test]
async fn test_failed_commit_leaves_board_untouched() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 3).await;
    let before = app.column_cards(column.id).await;

    app.store.fail_on(FailPoint::Commit);
    assert_err!(
        app.state.board.move_card(cards[0].id, column.id, 2, app.user).await,
        DomainError::Persistence(_)
    );
    app.store.clear_faults();

    assert_eq!(app.column_cards(column.id).await, before);
}

#[tokio::test]
async fn test_non_member_is_forbidden() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 2).await;
    let stranger = Uuid::new_v4();

    assert_err!(
        app.state.board.move_card(cards[0].id, column.id, 1, stranger).await,
        DomainError::Forbidden { .. }
    );
    assert_err!(
        app.state.board.get_board(app.project, stranger).await,
        DomainError::Forbidden { .. }
    );
    assert_err!(
        app.state.board.create_column(app.project, "Mine", stranger).await,
        DomainError::Forbidden { .. }
    );
    assert_eq!(orders(&app.column_cards(column.id).await), vec![0, 1]);
}

#[tokio::test]
async fn test_removed_member_loses_access() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 2).await;
    let other = app.member().await;

    assert_ok!(app.state.board.move_card(cards[0].id, column.id, 1, other).await);
    app.members.remove_member(app.project, other).await;
    assert_err!(
        app.state.board.move_card(cards[0].id, column.id, 0, other).await,
        DomainError::Forbidden { .. }
    );
}

#[tokio::test]
async fn test_move_of_missing_card_is_not_found() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;

    assert_err!(
        app.state.board.move_card(Uuid::new_v4(), column.id, 0, app.user).await,
        DomainError::NotFound { entity: "card", .. }
    );
}

#[tokio::test]
async fn test_move_validation() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 2).await;

    assert_err!(
        app.state.board.move_card(cards[0].id, column.id, -1, app.user).await,
        DomainError::Validation { field: "order", .. }
    );
    assert_err!(
        app.state.board.move_card(cards[0].id, Uuid::new_v4(), 0, app.user).await,
        DomainError::Validation { field: "column_id", .. }
    );

    // A column the actor can see, but on another board
    let other_project = Uuid::new_v4();
    app.members.add_member(other_project, app.user).await;
    let foreign = assert_ok!(app.state.board.create_column(other_project, "Elsewhere", app.user).await);
    assert_err!(
        app.state.board.move_card(cards[0].id, foreign.id, 0, app.user).await,
        DomainError::Validation { field: "column_id", .. }
    );

    assert_eq!(orders(&app.column_cards(column.id).await), vec![0, 1]);
}

#[tokio::test]
async fn test_reorder_column() {
    let app = TestApp::new().await;
    let todo = app.column("Todo").await;
    let doing = app.column("Doing").await;
    let done = app.column("Done").await;

    let order = assert_ok!(app.state.board.reorder_column(app.project, done.id, 0, app.user).await);
    assert_eq!(order, 0);

    let view = assert_ok!(app.state.board.get_board(app.project, app.user).await);
    let names: Vec<&str> = view.columns.iter().map(|c| c.column.name.as_str()).collect();
    assert_eq!(names, vec!["Done", "Todo", "Doing"]);
    let column_orders: Vec<i32> = view.columns.iter().map(|c| c.column.order).collect();
    assert_eq!(column_orders, vec![0, 1, 2]);
    assert!(view.columns.iter().any(|c| c.column.id == todo.id));
    assert!(view.columns.iter().any(|c| c.column.id == doing.id));
}

#[tokio::test]
async fn test_reorder_column_past_the_end_is_clamped() {
    let app = TestApp::new().await;
    let todo = app.column("Todo").await;
    app.column("Doing").await;

    let order = assert_ok!(app.state.board.reorder_column(app.project, todo.id, 10, app.user).await);
    assert_eq!(order, 1);
}

#[tokio::test]
async fn test_delete_card_closes_gap() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;
    let cards = app.cards(column.id, 3).await;

    let deleted = assert_ok!(app.state.board.delete_card(cards[0].id, app.user).await);
    assert_eq!(deleted.id, cards[0].id);

    let after = app.column_cards(column.id).await;
    assert_eq!(after, vec![(cards[1].id, 0), (cards[2].id, 1)]);
}

#[tokio::test]
async fn test_delete_column_removes_cards_and_closes_gap() {
    let app = TestApp::new().await;
    let todo = app.column("Todo").await;
    let doing = app.column("Doing").await;
    app.cards(todo.id, 3).await;

    let removed = assert_ok!(app.state.board.delete_column(app.project, todo.id, app.user).await);
    assert_eq!(removed, 3);

    let view = assert_ok!(app.state.board.get_board(app.project, app.user).await);
    assert_eq!(view.columns.len(), 1);
    assert_eq!(view.columns[0].column.id, doing.id);
    assert_eq!(view.columns[0].column.order, 0);

    assert_err!(
        app.state.board.delete_column(app.project, todo.id, app.user).await,
        DomainError::NotFound { entity: "column", .. }
    );
}

#[tokio::test]
async fn test_rename_column_validates_name() {
    let app = TestApp::new().await;
    let column = app.column("Todo").await;

    assert_err!(
        app.state.board.rename_column(app.project, column.id, "   ", app.user).await,
        DomainError::Validation { field: "name", .. }
    );
    let long = "x".repeat(256);
    assert_err!(
        app.state.board.rename_column(app.project, column.id, &long, app.user).await,
        DomainError::Validation { field: "name", .. }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moves_keep_orders_unique() {
    let app = TestApp::new().await;
    let todo = app.column("Todo").await;
    let doing = app.column("Doing").await;
    let mut cards = app.cards(todo.id, 6).await;
    cards.extend(app.cards(doing.id, 4).await);

    let mut tasks = Vec::new();
    for (i, card) in cards.iter().enumerate() {
        let board = app.state.board.clone();
        let user = app.user;
        let card_id = card.id;
        let target = if i % 2 == 0 { todo.id } else { doing.id };
        let order = (i as i32 * 7) % 5;
        tasks.push(tokio::spawn(async move {
            board.move_card(card_id, target, order, user).await
        }));
    }
    for task in tasks {
        assert_ok!(assert_ok!(task.await));
    }

    let todo_after = app.column_cards(todo.id).await;
    let doing_after = app.column_cards(doing.id).await;
    assert_eq!(todo_after.len() + doing_after.len(), 10);

    let expected: Vec<i32> = (0..todo_after.len() as i32).collect();
    assert_eq!(orders(&todo_after), expected);
    let expected: Vec<i32> = (0..doing_after.len() as i32).collect();
    assert_eq!(orders(&doing_after), expected);
}
