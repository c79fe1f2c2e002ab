//! Adding and switching accounts end to end

mod common;

use std::{sync::Arc, time::Duration};

use common::Call;
use serde_json::json;
use tas_accounts::{
    CapturedSession, ChannelEvents, LauncherBridge, NoEvents, SwitchEvent, SwitchOrchestrator,
    WatchOutcome, LAUNCHER_PROCESS,
};
use tokio::sync::mpsc;

fn with_channel(
    h: &common::Harness,
) -> (SwitchOrchestrator, mpsc::UnboundedReceiver<SwitchEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (h.orchestrator(Arc::new(ChannelEvents(sender))), receiver)
}

async fn wait_for_watch(switcher: &SwitchOrchestrator) -> Option<WatchOutcome> {
    tokio::time::timeout(Duration::from_secs(5), switcher.wait_for_watch())
        .await
        .unwrap()
}

fn session(login: &str, at: &str) -> CapturedSession {
    CapturedSession {
        login: Some(login.to_owned()),
        at: Some(at.to_owned()),
        rt: Some("refresh".to_owned()),
        save_login: Some(json!(true)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_add_account_captures_first_login() {
    let h = common::Harness::new();
    h.write_launcher_settings(json!({"login": "old@b.com", "at": "x", "rt": "y", "games": ["eft"]}))
        .await;
    let (switcher, mut events) = with_channel(&h);

    let id = switcher.add_account("Main", "a@b.com").await.unwrap();

    assert_eq!(
        h.process.calls(),
        [
            Call::Kill(LAUNCHER_PROCESS.to_owned()),
            Call::Spawn(h.launcher_exe.clone())
        ]
    );
    assert_eq!(events.recv().await, Some(SwitchEvent::LauncherStarted));
    let state = h.bridge.read_login_state().await.unwrap();
    assert_eq!(state.login, "a@b.com");
    assert!(!state.has_tokens());

    // The user logs in
    h.write_launcher_settings(json!({"login": "a@b.com", "at": "t1", "rt": "t2", "games": ["eft"]}))
        .await;

    assert_eq!(wait_for_watch(&switcher).await, Some(WatchOutcome::Captured));
    assert_eq!(events.recv().await, Some(SwitchEvent::SessionCaptured(id.clone())));
    let account = h.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(account.name, "Main");
    assert!(account.has_session());
}

#[tokio::test]
async fn test_switch_restores_saved_session() {
    let h = common::Harness::new();
    let id = h.store.add_account("Alt", "b@b.com").await.unwrap();
    h.store
        .update_session(&id, &session("b@b.com", "saved_token"))
        .await
        .unwrap();
    h.write_launcher_settings(json!({"login": "stranger@b.com", "at": "", "rt": "", "games": ["eft"]}))
        .await;
    let cache = &h.paths.cache_dirs[0];
    tokio::fs::create_dir_all(cache).await.unwrap();
    let (switcher, mut events) = with_channel(&h);

    let result = switcher.switch_account(&id).await;

    assert!(result.success, "{result:?}");
    assert!(result.has_session);
    assert_eq!(result.account_name, "Alt");
    assert_eq!(result.email, "b@b.com");
    assert!(result.error.is_none());
    assert_eq!(events.recv().await, Some(SwitchEvent::LauncherStarted));

    let settings = h.launcher_settings().await;
    assert_eq!(settings["login"], json!("b@b.com"));
    assert_eq!(settings["at"], json!("saved_token"));
    assert_eq!(settings["games"], json!(["eft"]));
    assert!(!cache.exists());
    assert_eq!(h.process.spawn_count(), 1);

    // Nothing to wait for
    assert!(!switcher.watcher().is_watching().await);
    assert_eq!(switcher.wait_for_watch().await, None);
}

#[tokio::test]
async fn test_switch_without_session_waits_for_login() {
    let h = common::Harness::new();
    let id = h.store.add_account("New", "c@b.com").await.unwrap();
    let (switcher, mut events) = with_channel(&h);

    let result = switcher.switch_account(&id).await;
    assert!(result.success, "{result:?}");
    assert!(!result.has_session);
    assert_eq!(events.recv().await, Some(SwitchEvent::LauncherStarted));
    assert!(!h.bridge.read_login_state().await.unwrap().has_tokens());

    h.write_launcher_settings(json!({"login": "c@b.com", "at": "t1", "rt": "t2"}))
        .await;
    assert_eq!(wait_for_watch(&switcher).await, Some(WatchOutcome::Captured));
    assert!(h.store.find_by_id(&id).await.unwrap().unwrap().has_session());
}

#[tokio::test]
async fn test_switch_saves_the_outgoing_session_first() {
    let h = common::Harness::new();
    let current = h.store.add_account("Current", "a@b.com").await.unwrap();
    let target = h.store.add_account("Target", "b@b.com").await.unwrap();
    h.store
        .update_session(&current, &session("a@b.com", "old_token"))
        .await
        .unwrap();
    h.store
        .update_session(&target, &session("b@b.com", "target_token"))
        .await
        .unwrap();
    // The launcher refreshed a@b.com's tokens meanwhile
    h.write_launcher_settings(json!({"login": "a@b.com", "at": "refreshed", "rt": "r2"}))
        .await;

    let result = h.orchestrator(Arc::new(NoEvents)).switch_account(&target).await;
    assert!(result.success, "{result:?}");

    let account = h.store.find_by_id(&current).await.unwrap().unwrap();
    let saved = h.store.load_session(&account).unwrap().unwrap();
    assert_eq!(saved.at.as_deref(), Some("refreshed"));
    assert_eq!(saved.rt.as_deref(), Some("r2"));
    assert_eq!(h.launcher_settings().await["at"], json!("target_token"));
}

#[tokio::test]
async fn test_switch_to_unknown_account() {
    let h = common::Harness::new();
    let switcher = h.orchestrator(Arc::new(NoEvents));

    let result = switcher.switch_account("does-not-exist").await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("does-not-exist"));
    assert_eq!(h.process.spawn_count(), 0);
}

#[tokio::test]
async fn test_switch_with_missing_launcher() {
    let h = common::Harness::new();
    let id = h.store.add_account("Main", "a@b.com").await.unwrap();
    let bridge = LauncherBridge::new(h.paths.clone(), h.dir.path().join("missing.exe"))
        .with_process(h.process.clone())
        .with_settle_delay(Duration::ZERO);
    let switcher = SwitchOrchestrator::new(
        Arc::clone(&h.store),
        Arc::new(bridge),
        Arc::new(NoEvents),
        common::fast_timings(),
    );

    let result = switcher.switch_account(&id).await;

    assert!(!result.success);
    assert_eq!(result.email, "a@b.com");
    assert!(result.error.unwrap().contains("missing.exe"));
    assert_eq!(h.process.spawn_count(), 0);
    assert!(!switcher.watcher().is_watching().await);
}

#[tokio::test]
async fn test_unusable_session_falls_back_to_login() {
    let h = common::Harness::new();
    let id = h.store.add_account("Main", "a@b.com").await.unwrap();
    h.store
        .update_session(&id, &session("a@b.com", "t1"))
        .await
        .unwrap();
    // Lose the key
    tokio::fs::remove_file(&h.paths.key_file).await.unwrap();
    let fresh_store = Arc::new(tas_accounts::AccountStore::new(
        &h.paths.accounts_file,
        Arc::new(tas_accounts::CredentialVault::new(&h.paths.key_file)),
    ));
    let switcher = SwitchOrchestrator::new(
        fresh_store,
        Arc::clone(&h.bridge),
        Arc::new(NoEvents),
        common::fast_timings(),
    );

    let result = switcher.switch_account(&id).await;

    assert!(result.success, "{result:?}");
    assert!(!result.has_session);
    let state = h.bridge.read_login_state().await.unwrap();
    assert_eq!(state.login, "a@b.com");
    assert!(!state.has_tokens());
}

#[tokio::test]
async fn test_save_current_session() {
    let h = common::Harness::new();
    let id = h.store.add_account("Main", "a@b.com").await.unwrap();
    let switcher = h.orchestrator(Arc::new(NoEvents));

    // Nobody logged in
    assert_eq!(switcher.save_current_session().await.unwrap(), None);

    h.write_launcher_settings(json!({"login": "unknown@b.com", "at": "t1", "rt": "t2"}))
        .await;
    assert_eq!(switcher.save_current_session().await.unwrap(), None);

    h.write_launcher_settings(json!({"login": "a@b.com", "at": "t1", "rt": ""}))
        .await;
    assert_eq!(switcher.save_current_session().await.unwrap(), None);

    h.write_launcher_settings(json!({"login": "a@b.com", "at": "t1", "rt": "t2"}))
        .await;
    assert_eq!(switcher.save_current_session().await.unwrap(), Some(id.clone()));
    assert!(h.store.find_by_id(&id).await.unwrap().unwrap().has_session());
}

#[tokio::test]
async fn test_delete_leaves_the_watch_running() {
    let h = common::Harness::new();
    let id = h.store.add_account("Main", "a@b.com").await.unwrap();
    let switcher = h.orchestrator(Arc::new(NoEvents));

    assert!(switcher.switch_account(&id).await.success);
    switcher.delete_account(&id).await.unwrap();
    assert!(h.store.list_accounts().await.unwrap().is_empty());

    h.write_launcher_settings(json!({"login": "a@b.com", "at": "t1", "rt": "t2"}))
        .await;
    assert_eq!(wait_for_watch(&switcher).await, Some(WatchOutcome::Orphaned));
    assert!(h.store.list_accounts().await.unwrap().is_empty());
}
