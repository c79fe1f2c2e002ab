//! Shared setup: everything lives in a temporary directory and the
//! launcher "process" is a recording fake.

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::Value;
use tas_accounts::{
    AccountStore, CredentialVault, LauncherBridge, ProcessControl, SwitchEvents, SwitchOrchestrator,
    Timings,
};
use tas_core::AppPaths;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Kill(String),
    Spawn(PathBuf),
}

#[derive(Default)]
pub struct RecordingProcess {
    calls: Mutex<Vec<Call>>,
}

impl RecordingProcess {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Spawn(_)))
            .count()
    }
}

impl ProcessControl for RecordingProcess {
    fn kill_by_name(&self, process_name: &str) -> std::io::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Kill(process_name.to_owned()));
        Ok(())
    }

    fn spawn_detached(&self, exe: &Path) -> std::io::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Spawn(exe.to_owned()));
        Ok(())
    }
}

pub fn fast_timings() -> Timings {
    Timings {
        settle_delay: Duration::from_millis(5),
        watch_delay: Duration::from_millis(20),
        poll_interval: Duration::from_millis(25),
        watch_timeout: Duration::from_secs(3),
    }
}

pub struct Harness {
    // Keeps the directory alive
    pub dir: TempDir,
    pub paths: AppPaths,
    pub launcher_exe: PathBuf,
    pub process: Arc<RecordingProcess>,
    pub store: Arc<AccountStore>,
    pub bridge: Arc<LauncherBridge>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::in_root(dir.path());

        let launcher_exe = dir.path().join("BsgLauncher").join("BsgLauncher.exe");
        std::fs::create_dir_all(launcher_exe.parent().unwrap()).unwrap();
        std::fs::write(&launcher_exe, b"").unwrap();

        let process = Arc::new(RecordingProcess::default());
        let vault = Arc::new(CredentialVault::new(&paths.key_file));
        let store = Arc::new(AccountStore::new(&paths.accounts_file, vault));
        let bridge = Arc::new(
            LauncherBridge::new(paths.clone(), &launcher_exe)
                .with_process(process.clone())
                .with_settle_delay(fast_timings().settle_delay),
        );

        Self {
            dir,
            paths,
            launcher_exe,
            process,
            store,
            bridge,
        }
    }

    pub fn orchestrator(&self, events: Arc<dyn SwitchEvents>) -> SwitchOrchestrator {
        SwitchOrchestrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.bridge),
            events,
            fast_timings(),
        )
    }

    /// Plays the launcher writing its settings file.
    pub async fn write_launcher_settings(&self, value: Value) {
        write_json(&self.paths.launcher_settings, &value).await;
    }

    pub async fn launcher_settings(&self) -> Value {
        read_json(&self.paths.launcher_settings).await
    }

    pub async fn write_game_settings(&self, value: Value) {
        write_json(&self.paths.game_settings, &value).await;
    }

    pub async fn game_settings(&self) -> Value {
        read_json(&self.paths.game_settings).await
    }
}

pub async fn write_json(path: &Path, value: &Value) {
    tokio::fs::create_dir_all(path.parent().unwrap())
        .await
        .unwrap();
    tokio::fs::write(path, serde_json::to_string_pretty(value).unwrap())
        .await
        .unwrap();
}

pub async fn read_json(path: &Path) -> Value {
    let text = tokio::fs::read_to_string(path).await.unwrap();
    serde_json::from_str(&text).unwrap()
}
