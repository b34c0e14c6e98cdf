//! Comment thread tests
//!
//! Broadcasts to the issue room, mentions, and the notifications and
//! activity entries produced by the event workers.

use std::time::Duration;

use pretty_assertions::assert_eq;
use uuid::Uuid;

use boardsync::backend::realtime::ClientHandle;
use boardsync::backend::DomainError;
use boardsync::shared::{ActivityEntry, Notification, NotificationPayload};

use crate::common::fixtures::{assert_silent, next_event, TestApp};

/// Poll until `user` has at least `count` notifications
async fn notifications(app: &TestApp, user: Uuid, count: usize) -> Vec<Notification> {
    for _ in 0..100 {
        let found = assert_ok!(app.state.threads.notifications(user).await);
        if found.len() >= count {
            return found;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Expected {} notifications for {}", count, user);
}

/// Poll until the issue has at least `count` activity entries
async fn activity(app: &TestApp, issue_id: Uuid, count: usize) -> Vec<ActivityEntry> {
    for _ in 0..100 {
        let found = assert_ok!(app.state.threads.list_activity(issue_id, app.user).await);
        if found.len() >= count {
            return found;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Expected {} activity entries on {}", count, issue_id);
}

#[tokio::test]
async fn test_comment_is_broadcast_to_thread_room() {
    let app = TestApp::new().await;
    let issue = app.issue(None).await;
    let (watcher, mut rx) = ClientHandle::new(app.user, 8);
    app.state.hubs.thread.join(&issue.id, watcher).await;

    let comment = assert_ok!(app.state.threads.create_comment(issue.id, app.user, "  Looks good  ").await);
    assert_eq!(comment.body, "Looks good");

    let event = next_event(&mut rx).await;
    assert_eq!(event["type"], "comment_created");
    assert_eq!(event["scope_id"], issue.id.to_string());
    assert_eq!(event["payload"]["id"], comment.id.to_string());
    assert_eq!(event["payload"]["body"], "Looks good");

    let listed = assert_ok!(app.state.threads.list_comments(issue.id, app.user).await);
    assert_eq!(listed, vec![comment]);
}

#[tokio::test]
async fn test_assignee_is_notified_of_new_comment() {
    let app = TestApp::new().await;
    let assignee = app.member().await;
    let issue = app.issue(Some(assignee)).await;
    let (inbox, mut rx) = ClientHandle::new(assignee, 8);
    app.state.hubs.user.join(&assignee, inbox).await;

    let comment = assert_ok!(app.state.threads.create_comment(issue.id, app.user, "On it").await);

    let event = next_event(&mut rx).await;
    assert_eq!(event["type"], "notification");
    assert_eq!(event["scope_id"], assignee.to_string());
    assert_eq!(event["payload"]["title"], "New Comment");
    assert_eq!(event["payload"]["kind"], "new_comment");

    let stored = notifications(&app, assignee, 1).await;
    assert_eq!(
        stored[0].payload,
        NotificationPayload::NewComment {
            issue_id: issue.id,
            comment_id: comment.id,
        }
    );
    assert!(!stored[0].is_read);
}

#[tokio::test]
async fn test_assignee_commenting_is_not_notified() {
    let app = TestApp::new().await;
    let issue = app.issue(Some(app.user)).await;

    assert_ok!(app.state.threads.create_comment(issue.id, app.user, "Note to self").await);

    let entries = activity(&app, issue.id, 1).await;
    assert_eq!(entries[0].payload.action(), "commented");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(assert_ok!(app.state.threads.notifications(app.user).await).is_empty());
}

#[tokio::test]
async fn test_mention_goes_only_to_mentioned_user() {
    let app = TestApp::new().await;
    let bob = app.named_member("bob").await;
    let carol = app.member().await;
    let issue = app.issue(None).await;

    let (bob_tab, mut bob_rx) = ClientHandle::new(bob, 8);
    let (carol_tab, mut carol_rx) = ClientHandle::new(carol, 8);
    app.state.hubs.thread.join(&issue.id, bob_tab).await;
    app.state.hubs.thread.join(&issue.id, carol_tab).await;

    let comment = assert_ok!(
        app.state
            .threads
            .create_comment(issue.id, app.user, "@bob can you check this? thanks @bob")
            .await
    );

    assert_eq!(next_event(&mut bob_rx).await["type"], "comment_created");
    let mention = next_event(&mut bob_rx).await;
    assert_eq!(mention["type"], "mention");
    assert_eq!(mention["payload"]["mentioned_user_id"], bob.to_string());
    assert_eq!(mention["payload"]["comment_id"], comment.id.to_string());
    assert_silent(&mut bob_rx).await;

    assert_eq!(next_event(&mut carol_rx).await["type"], "comment_created");
    assert_silent(&mut carol_rx).await;

    let stored = notifications(&app, bob, 1).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "You were mentioned");
    assert_contains!(stored[0].message, "Login page is blank");
}

#[tokio::test]
async fn test_mentions_of_outsiders_and_self_are_ignored() {
    let app = TestApp::new().await;
    let outsider = Uuid::new_v4();
    app.threads.add_user("mallory", outsider).await;
    app.threads.add_user("me", app.user).await;
    let issue = app.issue(None).await;

    let (tab, mut rx) = ClientHandle::new(outsider, 8);
    app.state.hubs.thread.join(&issue.id, tab).await;
    let (own_tab, mut own_rx) = ClientHandle::new(app.user, 8);
    app.state.hubs.thread.join(&issue.id, own_tab).await;

    assert_ok!(app.state.threads.create_comment(issue.id, app.user, "@mallory @me @nobody").await);

    assert_eq!(next_event(&mut rx).await["type"], "comment_created");
    assert_silent(&mut rx).await;
    assert_eq!(next_event(&mut own_rx).await["type"], "comment_created");
    assert_silent(&mut own_rx).await;

    activity(&app, issue.id, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(assert_ok!(app.state.threads.notifications(outsider).await).is_empty());
    assert!(assert_ok!(app.state.threads.notifications(app.user).await).is_empty());
}

#[tokio::test]
async fn test_edit_only_announces_new_mentions() {
    let app = TestApp::new().await;
    let bob = app.named_member("bob").await;
    let dave = app.named_member("dave").await;
    let issue = app.issue(None).await;

    let comment = assert_ok!(app.state.threads.create_comment(issue.id, app.user, "ping @bob").await);
    notifications(&app, bob, 1).await;

    let edited = assert_ok!(
        app.state
            .threads
            .update_comment(comment.id, app.user, "ping @bob and @dave")
            .await
    );
    assert!(edited.updated_at.is_some());

    notifications(&app, dave, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(assert_ok!(app.state.threads.notifications(bob).await).len(), 1);

    let entries = activity(&app, issue.id, 4).await;
    let mut actions: Vec<&str> = entries.iter().map(|e| e.payload.action()).collect();
    actions.sort();
    assert_eq!(actions, vec!["comment_edited", "commented", "mentioned", "mentioned"]);
}

#[tokio::test]
async fn test_only_author_may_edit_or_delete() {
    let app = TestApp::new().await;
    let other = app.member().await;
    let issue = app.issue(None).await;
    let comment = assert_ok!(app.state.threads.create_comment(issue.id, app.user, "mine").await);

    assert_err!(
        app.state.threads.update_comment(comment.id, other, "theirs").await,
        DomainError::NotPermitted { .. }
    );
    assert_err!(
        app.state.threads.delete_comment(comment.id, other).await,
        DomainError::NotPermitted { .. }
    );

    let listed = assert_ok!(app.state.threads.list_comments(issue.id, app.user).await);
    assert_eq!(listed[0].body, "mine");
}

#[tokio::test]
async fn test_delete_broadcasts_removal() {
    let app = TestApp::new().await;
    let issue = app.issue(None).await;
    let comment = assert_ok!(app.state.threads.create_comment(issue.id, app.user, "oops").await);

    let (watcher, mut rx) = ClientHandle::new(app.user, 8);
    app.state.hubs.thread.join(&issue.id, watcher).await;

    assert_ok!(app.state.threads.delete_comment(comment.id, app.user).await);

    let event = next_event(&mut rx).await;
    assert_eq!(event["type"], "comment_deleted");
    assert_eq!(event["payload"]["id"], comment.id.to_string());
    assert!(assert_ok!(app.state.threads.list_comments(issue.id, app.user).await).is_empty());

    assert_err!(
        app.state.threads.delete_comment(comment.id, app.user).await,
        DomainError::NotFound { entity: "comment", .. }
    );
}

#[tokio::test]
async fn test_comment_errors() {
    let app = TestApp::new().await;
    let issue = app.issue(None).await;

    assert_err!(
        app.state.threads.create_comment(issue.id, app.user, "   ").await,
        DomainError::Validation { field: "body", .. }
    );
    assert_err!(
        app.state.threads.create_comment(issue.id, Uuid::new_v4(), "hi").await,
        DomainError::Forbidden { .. }
    );
    assert_err!(
        app.state.threads.create_comment(Uuid::new_v4(), app.user, "hi").await,
        DomainError::NotFound { entity: "issue", .. }
    );
}

#[tokio::test]
async fn test_mark_notifications_read() {
    let app = TestApp::new().await;
    let assignee = app.member().await;
    let issue = app.issue(Some(assignee)).await;
    assert_ok!(app.state.threads.create_comment(issue.id, app.user, "first").await);
    assert_ok!(app.state.threads.create_comment(issue.id, app.user, "second").await);

    let stored = notifications(&app, assignee, 2).await;

    // Someone else cannot mark them.
    assert_err!(
        app.state.threads.mark_notification_read(stored[0].id, app.user).await,
        DomainError::NotFound { entity: "notification", .. }
    );

    assert_ok!(app.state.threads.mark_notification_read(stored[0].id, assignee).await);
    let updated = assert_ok!(app.state.threads.mark_all_notifications_read(assignee).await);
    assert_eq!(updated, 1);

    let after = assert_ok!(app.state.threads.notifications(assignee).await);
    assert!(after.iter().all(|n| n.is_read));
}
