//! Login detection by the session watcher

mod common;

use std::{sync::Arc, time::Duration};

use serde_json::json;
use tas_accounts::{ChannelEvents, SessionWatcher, SwitchEvent, Timings, WatchOutcome};
use tokio::{sync::mpsc, task::JoinHandle};

const WAIT: Duration = Duration::from_secs(5);

/// Long enough for several polls with the fast timings
const A_FEW_POLLS: Duration = Duration::from_millis(150);

fn watcher(
    h: &common::Harness,
    timings: &Timings,
) -> (SessionWatcher, mpsc::UnboundedReceiver<SwitchEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let watcher = SessionWatcher::new(
        Arc::clone(&h.bridge),
        Arc::clone(&h.store),
        Arc::new(ChannelEvents(sender)),
        timings,
    );
    (watcher, receiver)
}

async fn finish(handle: JoinHandle<WatchOutcome>) -> WatchOutcome {
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_captures_only_once_both_tokens_are_there() {
    let h = common::Harness::new();
    let id = h.store.add_account("Main", "a@b.com").await.unwrap();
    let (watcher, mut events) = watcher(&h, &common::fast_timings());

    let handle = watcher.start(&id, "a@b.com").await;
    h.write_launcher_settings(json!({"login": "a@b.com", "at": "", "rt": "t2"}))
        .await;
    tokio::time::sleep(A_FEW_POLLS).await;

    assert!(watcher.is_watching().await);
    assert_eq!(watcher.watching_account().await.as_deref(), Some(id.as_str()));
    assert!(!h.store.find_by_id(&id).await.unwrap().unwrap().has_session());

    h.write_game_settings(json!({"EnvironmentUiType": "Factory"}))
        .await;
    h.write_launcher_settings(json!({
        "login": "a@b.com",
        "at": "t1",
        "rt": "t2",
        "selectedGame": "eft",
        "games": ["eft"],
    }))
    .await;

    assert_eq!(finish(handle).await, WatchOutcome::Captured);
    assert!(!watcher.is_watching().await);
    assert_eq!(events.recv().await, Some(SwitchEvent::SessionCaptured(id.clone())));

    let account = h.store.find_by_id(&id).await.unwrap().unwrap();
    let session = h.store.load_session(&account).unwrap().unwrap();
    assert_eq!(session.login.as_deref(), Some("a@b.com"));
    assert_eq!(session.at.as_deref(), Some("t1"));
    assert_eq!(session.selected_game, Some(json!("eft")));
    assert_eq!(session.environment_ui_type.as_deref(), Some("Factory"));

    // One-shot: nothing else arrives
    tokio::time::sleep(A_FEW_POLLS).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_other_login_is_ignored() {
    let h = common::Harness::new();
    let id = h.store.add_account("Main", "a@b.com").await.unwrap();
    let (watcher, _events) = watcher(&h, &common::fast_timings());

    let handle = watcher.start(&id, "a@b.com").await;
    h.write_launcher_settings(json!({"login": "someone@else.com", "at": "t1", "rt": "t2"}))
        .await;
    tokio::time::sleep(A_FEW_POLLS).await;

    assert!(watcher.is_watching().await);
    assert!(!h.store.find_by_id(&id).await.unwrap().unwrap().has_session());

    watcher.stop().await;
    assert_eq!(finish(handle).await, WatchOutcome::Cancelled);
}

#[tokio::test]
async fn test_newer_watch_supersedes_older() {
    let h = common::Harness::new();
    let a = h.store.add_account("A", "a@b.com").await.unwrap();
    let b = h.store.add_account("B", "b@b.com").await.unwrap();
    let (watcher, mut events) = watcher(&h, &common::fast_timings());

    let handle_a = watcher.start(&a, "a@b.com").await;
    let handle_b = watcher.start(&b, "b@b.com").await;
    assert_eq!(watcher.watching_account().await.as_deref(), Some(b.as_str()));

    // A's condition comes true after B started
    h.write_launcher_settings(json!({"login": "a@b.com", "at": "t1", "rt": "t2"}))
        .await;
    assert_eq!(finish(handle_a).await, WatchOutcome::Cancelled);
    tokio::time::sleep(A_FEW_POLLS).await;
    assert!(!h.store.find_by_id(&a).await.unwrap().unwrap().has_session());
    assert!(watcher.is_watching().await);

    h.write_launcher_settings(json!({"login": "b@b.com", "at": "t3", "rt": "t4"}))
        .await;
    assert_eq!(finish(handle_b).await, WatchOutcome::Captured);
    assert!(h.store.find_by_id(&b).await.unwrap().unwrap().has_session());
    assert!(!h.store.find_by_id(&a).await.unwrap().unwrap().has_session());
    assert_eq!(events.recv().await, Some(SwitchEvent::SessionCaptured(b)));
}

#[tokio::test]
async fn test_times_out_quietly() {
    let h = common::Harness::new();
    let id = h.store.add_account("Main", "a@b.com").await.unwrap();
    let timings = Timings {
        watch_timeout: Duration::from_millis(100),
        ..common::fast_timings()
    };
    let (watcher, mut events) = watcher(&h, &timings);

    let handle = watcher.start(&id, "a@b.com").await;
    assert_eq!(finish(handle).await, WatchOutcome::TimedOut);

    assert!(!watcher.is_watching().await);
    assert!(events.try_recv().is_err());
    assert!(!h.store.find_by_id(&id).await.unwrap().unwrap().has_session());
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let h = common::Harness::new();
    let (watcher, _events) = watcher(&h, &common::fast_timings());

    watcher.stop().await;
    let handle = watcher.start("some-id", "a@b.com").await;
    watcher.stop().await;
    watcher.stop().await;

    assert_eq!(finish(handle).await, WatchOutcome::Cancelled);
    assert!(!watcher.is_watching().await);
    assert!(watcher.watching_account().await.is_none());
}

#[tokio::test]
async fn test_deleted_account_is_not_resurrected() {
    let h = common::Harness::new();
    let keep = h.store.add_account("Keep", "k@b.com").await.unwrap();
    let gone = h.store.add_account("Gone", "a@b.com").await.unwrap();
    let (watcher, mut events) = watcher(&h, &common::fast_timings());

    let handle = watcher.start(&gone, "a@b.com").await;
    h.store.delete_account(&gone).await.unwrap();
    h.write_launcher_settings(json!({"login": "a@b.com", "at": "t1", "rt": "t2"}))
        .await;

    assert_eq!(finish(handle).await, WatchOutcome::Orphaned);
    assert!(!watcher.is_watching().await);
    assert!(events.try_recv().is_err());

    let ids: Vec<_> = h
        .store
        .list_accounts()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, [keep]);
}
