//! Postgres store tests
//!
//! Skipped unless `DATABASE_URL` points at a disposable database.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use boardsync::backend::board::{
    BoardOrchestrator, BoardRepository, BoardStore, PgBoardStore, PgMembership, UnitOfWork,
};
use boardsync::backend::server::init::postgres_backends;
use boardsync::backend::server::{AppState, ServerConfig};
use boardsync::backend::DomainError;
use boardsync::shared::NotificationPayload;

use crate::common::database::{seed_issue, seed_member, test_pool, username_of};

#[tokio::test]
async fn test_migrations_create_tables() {
    let Some(pool) = test_pool().await else {
        return;
    };

    for table in [
        "users",
        "project_members",
        "issues",
        "board_columns",
        "board_cards",
        "issue_comments",
        "activity_logs",
        "notifications",
    ] {
        let result = sqlx::query(&format!("SELECT 1 FROM {} LIMIT 1", table))
            .execute(&pool)
            .await;
        assert!(result.is_ok(), "{} table should exist", table);
    }
}

#[tokio::test]
async fn test_pg_move_and_rollback() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let project = Uuid::new_v4();
    let user = seed_member(&pool, project).await;
    let store = Arc::new(PgBoardStore::new(pool.clone()));
    let board = BoardOrchestrator::new(store.clone(), Arc::new(PgMembership::new(pool.clone())));

    let column = assert_ok!(board.create_column(project, "Todo", user).await);
    let mut cards = Vec::new();
    for i in 0..4 {
        cards.push(assert_ok!(board.create_card(project, column.id, &format!("card {}", i), None, user).await));
    }

    let (moved, _) = assert_ok!(board.move_card(cards[3].id, column.id, 1, user).await);
    assert_eq!(moved.order, 1);

    let view = assert_ok!(board.get_board(project, user).await);
    let ids: Vec<Uuid> = view.columns[0].cards.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![cards[0].id, cards[3].id, cards[1].id, cards[2].id]);

    // A unit of work dropped without commit leaves nothing behind.
    {
        let mut uow = assert_ok!(store.begin().await);
        assert_ok!(uow.lock_board(project).await);
        assert_ok!(uow.delete_card(cards[0].id).await);
        assert_ok!(uow.rollback().await);
    }
    let view = assert_ok!(board.get_board(project, user).await);
    assert_eq!(view.columns[0].cards.len(), 4);

    assert_err!(
        board.get_board(project, Uuid::new_v4()).await,
        DomainError::Forbidden { .. }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_concurrent_moves_keep_orders_unique() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let project = Uuid::new_v4();
    let user = seed_member(&pool, project).await;
    let board = BoardOrchestrator::new(
        Arc::new(PgBoardStore::new(pool.clone())),
        Arc::new(PgMembership::new(pool.clone())),
    );

    let column = assert_ok!(board.create_column(project, "Todo", user).await);
    let mut cards = Vec::new();
    for i in 0..6 {
        cards.push(assert_ok!(board.create_card(project, column.id, &format!("card {}", i), None, user).await));
    }

    let mut tasks = Vec::new();
    for (i, card) in cards.iter().enumerate() {
        let board = board.clone();
        let card_id = card.id;
        let column_id = column.id;
        tasks.push(tokio::spawn(async move {
            board.move_card(card_id, column_id, (i as i32 * 5) % 6, user).await
        }));
    }
    for task in tasks {
        assert_ok!(assert_ok!(task.await));
    }

    let view = assert_ok!(board.get_board(project, user).await);
    let orders: Vec<i32> = view.columns[0].cards.iter().map(|c| c.order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_pg_comment_thread() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let project = Uuid::new_v4();
    let author = seed_member(&pool, project).await;
    let assignee = seed_member(&pool, project).await;
    let mentioned = seed_member(&pool, project).await;
    let issue = seed_issue(&pool, project, Some(assignee)).await;
    let state = AppState::new(&ServerConfig::default(), postgres_backends(pool.clone()), "postgres");
    let threads = &state.threads;

    let comment = assert_ok!(threads.create_comment(issue, author, "First look").await);
    assert!(comment.updated_at.is_none());

    let listed = assert_ok!(threads.list_comments(issue, author).await);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, comment.id);
    assert!(listed[0].updated_at.is_none());

    let body = format!("First look, cc @{}", username_of(mentioned));
    let edited = assert_ok!(threads.update_comment(comment.id, author, &body).await);
    assert_eq!(edited.body, body);
    assert!(edited.updated_at.is_some());

    assert_err!(
        threads.delete_comment(comment.id, assignee).await,
        DomainError::NotPermitted { .. }
    );

    // Activity and notifications are written by the event workers.
    let mut activity = Vec::new();
    let mut assignee_inbox = Vec::new();
    let mut mentioned_inbox = Vec::new();
    for _ in 0..200 {
        activity = assert_ok!(threads.list_activity(issue, author).await);
        assignee_inbox = assert_ok!(threads.notifications(assignee).await);
        mentioned_inbox = assert_ok!(threads.notifications(mentioned).await);
        if activity.len() >= 3 && !assignee_inbox.is_empty() && !mentioned_inbox.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut actions: Vec<&str> = activity.iter().map(|e| e.payload.action()).collect();
    actions.sort();
    assert_eq!(actions, vec!["comment_edited", "commented", "mentioned"]);

    assert_eq!(assignee_inbox.len(), 1);
    assert_eq!(
        assignee_inbox[0].payload,
        NotificationPayload::NewComment {
            issue_id: issue,
            comment_id: comment.id,
        }
    );
    assert_eq!(mentioned_inbox.len(), 1);
    assert_eq!(mentioned_inbox[0].payload.kind(), "mentioned");

    // Only the owner can mark a notification read.
    assert_err!(
        threads.mark_notification_read(assignee_inbox[0].id, author).await,
        DomainError::NotFound { entity: "notification", .. }
    );
    assert_ok!(threads.mark_notification_read(assignee_inbox[0].id, assignee).await);
    let after = assert_ok!(threads.notifications(assignee).await);
    assert!(after[0].is_read);

    assert_ok!(threads.delete_comment(comment.id, author).await);
    assert!(assert_ok!(threads.list_comments(issue, author).await).is_empty());
}
