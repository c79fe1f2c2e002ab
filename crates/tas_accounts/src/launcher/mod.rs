//! Everything that touches the BSG launcher: its settings file,
//! its process, its caches and the game's settings file.
//! Nothing else in the crate does.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde_json::{Map, Value};
use tas_core::{err, info, pt, AppPaths, IntoIoError};

use crate::{
    types::{CapturedSession, LoginState, ENVIRONMENT_UI_TYPE_FIELD},
    AccountError, ProcessControl, Result,
};

mod process;
pub mod settings;

pub use process::{SystemProcess, LAUNCHER_PROCESS};

/// Result of an operation whose failure doesn't matter for correctness.
///
/// Failures are logged where they happen. The value is returned so
/// callers (and tests) can still see what was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum BestEffort {
    Done,
    /// Nothing to do (e.g. the target file doesn't exist)
    Skipped,
    Failed(String),
}

impl BestEffort {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, BestEffort::Failed(_))
    }
}

/// What [`LauncherBridge::clear_game_cache`] got through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct CacheReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct LauncherBridge {
    paths: AppPaths,
    launcher_exe: PathBuf,
    process: Arc<dyn ProcessControl>,
    settle_delay: Duration,
}

impl LauncherBridge {
    pub fn new(paths: AppPaths, launcher_exe: impl Into<PathBuf>) -> Self {
        Self {
            paths,
            launcher_exe: launcher_exe.into(),
            process: Arc::new(SystemProcess),
            settle_delay: crate::Timings::default().settle_delay,
        }
    }

    #[must_use]
    pub fn with_process(mut self, process: Arc<dyn ProcessControl>) -> Self {
        self.process = process;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    #[must_use]
    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    #[must_use]
    pub fn launcher_exe(&self) -> &Path {
        &self.launcher_exe
    }

    /// Kills the launcher, then waits for it to finish flushing
    /// its settings to disk.
    pub async fn kill_launcher_process(&self) -> BestEffort {
        pt!("Closing the launcher");
        let process = Arc::clone(&self.process);
        let result =
            tokio::task::spawn_blocking(move || process.kill_by_name(LAUNCHER_PROCESS)).await;

        let outcome = match result {
            Ok(Ok(())) => BestEffort::Done,
            Ok(Err(e)) => BestEffort::Failed(e.to_string()),
            Err(e) => BestEffort::Failed(e.to_string()),
        };
        if let BestEffort::Failed(e) = &outcome {
            err!("Couldn't close the launcher (continuing anyway): {e}");
        }

        tokio::time::sleep(self.settle_delay).await;
        outcome
    }

    /// Starts the launcher without waiting for it.
    ///
    /// # Errors
    /// - [`AccountError::LauncherNotFound`] if the configured path doesn't exist
    /// - [`AccountError::Spawn`] if it exists but couldn't be started
    pub fn start_launcher_process(&self) -> Result<()> {
        if !self.launcher_exe.exists() {
            return Err(AccountError::LauncherNotFound(self.launcher_exe.clone()));
        }
        info!("Starting the launcher");
        self.process
            .spawn_detached(&self.launcher_exe)
            .path(&self.launcher_exe)
            .map_err(AccountError::Spawn)
    }

    /// Deletes the caches that hold the previous account's
    /// backgrounds and icons. Never touches the settings file.
    pub async fn clear_game_cache(&self) -> CacheReport {
        let mut report = CacheReport::default();

        for dir in &self.paths.cache_dirs {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => report.removed.push(dir.clone()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => report.failed.push((dir.clone(), e.to_string())),
            }
        }
        for file in &self.paths.cache_files {
            match tokio::fs::remove_file(file).await {
                Ok(()) => report.removed.push(file.clone()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => report.failed.push((file.clone(), e.to_string())),
            }
        }

        for (path, e) in &report.failed {
            err!("Couldn't clear cache {path:?}: {e}");
        }
        report
    }

    /// Sets the launcher up to log `email` in from scratch:
    /// address filled in, tokens gone.
    ///
    /// # Errors
    /// If the settings file couldn't be written.
    pub async fn force_fresh_login(&self, email: &str) -> Result<()> {
        pt!("Clearing the launcher session for {email}");
        let mut launcher_settings = self.load_or_empty(&self.paths.launcher_settings).await;

        self.ensure_temp_folder().await;
        settings::apply_fresh_login(&mut launcher_settings, email, &self.paths.temp_folder);

        self.write_launcher_settings(&launcher_settings).await?;

        let dir = self.paths.launcher_dir();
        for name in settings::ALT_SESSION_FILES {
            let file = dir.join(name);
            match tokio::fs::remove_file(&file).await {
                Ok(()) => pt!("Removed cached session file {name}"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => err!("Couldn't remove {file:?}: {e}"),
            }
        }
        Ok(())
    }

    /// Writes a captured session back into the launcher's settings,
    /// keeping every unrelated key as it is.
    ///
    /// # Errors
    /// If the settings file couldn't be written.
    pub async fn restore_session(&self, session: &CapturedSession) -> Result<()> {
        pt!("Restoring saved launcher session");
        let mut launcher_settings = match settings::read_object(&self.paths.launcher_settings).await {
            Ok(existing) => existing,
            Err(e) => {
                if !e.is_not_found() {
                    err!("Launcher settings unreadable, rebuilding from the saved session: {e}");
                }
                session.auth_fields()
            }
        };

        self.ensure_temp_folder().await;
        settings::merge_session(&mut launcher_settings, session, &self.paths.temp_folder);

        self.write_launcher_settings(&launcher_settings).await?;

        if let Some(environment) = session.environment_ui_type() {
            _ = self.write_environment_ui_type(environment).await;
        }
        Ok(())
    }

    /// The launcher's current login, or `None` if its settings
    /// can't be read right now.
    pub async fn read_login_state(&self) -> Option<LoginState> {
        settings::read_object(&self.paths.launcher_settings)
            .await
            .ok()
            .map(|s| LoginState::from_settings(&s))
    }

    /// The in-game background from the game's settings, if set.
    pub async fn read_environment_ui_type(&self) -> Option<String> {
        let game_settings = settings::read_object(&self.paths.game_settings).await.ok()?;
        game_settings
            .get(ENVIRONMENT_UI_TYPE_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    /// Patches the in-game background into the game's settings.
    /// Skipped if the game has never written that file.
    pub async fn write_environment_ui_type(&self, environment: &str) -> BestEffort {
        let path = &self.paths.game_settings;
        let outcome = match settings::read_object(path).await {
            Err(e) if e.is_not_found() => BestEffort::Skipped,
            Err(e) => BestEffort::Failed(e.to_string()),
            Ok(mut game_settings) => {
                game_settings.insert(
                    ENVIRONMENT_UI_TYPE_FIELD.to_owned(),
                    Value::String(environment.to_owned()),
                );
                match settings::write_object(path, &game_settings).await {
                    Ok(()) => BestEffort::Done,
                    Err(e) => BestEffort::Failed(e.to_string()),
                }
            }
        };
        if let BestEffort::Failed(e) = &outcome {
            err!("Couldn't restore the in-game background: {e}");
        }
        outcome
    }

    async fn write_launcher_settings(&self, launcher_settings: &Map<String, Value>) -> Result<()> {
        let dir = self.paths.launcher_dir();
        tokio::fs::create_dir_all(dir)
            .await
            .path(dir)
            .map_err(|e| AccountError::LauncherSettings(e.into()))?;
        settings::write_object(&self.paths.launcher_settings, launcher_settings)
            .await
            .map_err(AccountError::LauncherSettings)
    }

    async fn load_or_empty(&self, path: &Path) -> Map<String, Value> {
        match settings::read_object(path).await {
            Ok(existing) => existing,
            Err(e) => {
                if !e.is_not_found() {
                    err!("Launcher settings unreadable, starting from empty: {e}");
                }
                Map::new()
            }
        }
    }

    async fn ensure_temp_folder(&self) {
        let dir = &self.paths.temp_folder;
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            err!("Couldn't create temp folder {dir:?}: {e}");
        }
    }
}
