//! Adding, switching and deleting accounts, start to finish.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tas_core::{err, info, pt};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    Account, AccountError, AccountStore, LauncherBridge, Result, SessionWatcher, SwitchEvents,
    Timings, WatchOutcome,
};

/// What happened when switching, for the UI to show.
///
/// Switching never fails with an `Err`: the reason ends up in
/// `error` and `success` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchResult {
    pub success: bool,
    pub account_name: String,
    pub email: String,
    /// Whether a saved session was restored (no login needed)
    pub has_session: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SwitchResult {
    fn failed(account: Option<&Account>, error: &AccountError) -> Self {
        Self {
            success: false,
            account_name: account.map(|a| a.name.clone()).unwrap_or_default(),
            email: account.map(|a| a.email.clone()).unwrap_or_default(),
            has_session: false,
            message: String::new(),
            error: Some(error.to_string()),
        }
    }
}

type PendingWatch = JoinHandle<Option<WatchOutcome>>;

pub struct SwitchOrchestrator {
    store: Arc<AccountStore>,
    bridge: Arc<LauncherBridge>,
    watcher: Arc<SessionWatcher>,
    events: Arc<dyn SwitchEvents>,
    watch_delay: Duration,
    /// The most recently scheduled watch, see [`Self::wait_for_watch`]
    pending: Mutex<Option<PendingWatch>>,
}

impl SwitchOrchestrator {
    pub fn new(
        store: Arc<AccountStore>,
        bridge: Arc<LauncherBridge>,
        events: Arc<dyn SwitchEvents>,
        timings: Timings,
    ) -> Self {
        let watcher = Arc::new(SessionWatcher::new(
            Arc::clone(&bridge),
            Arc::clone(&store),
            Arc::clone(&events),
            &timings,
        ));
        Self {
            store,
            bridge,
            watcher,
            events,
            watch_delay: timings.watch_delay,
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    #[must_use]
    pub fn bridge(&self) -> &LauncherBridge {
        &self.bridge
    }

    #[must_use]
    pub fn watcher(&self) -> &SessionWatcher {
        &self.watcher
    }

    /// Registers a new account and opens the launcher on its login
    /// screen. Its session gets stored once the login goes through.
    ///
    /// Returns the new account's id.
    ///
    /// # Errors
    /// - [`AccountError::Storage`] if `accounts.json` couldn't be updated
    /// - [`AccountError::LauncherSettings`] if the launcher couldn't be prepared
    /// - [`AccountError::LauncherNotFound`] if the launcher isn't where it's configured
    ///
    /// The account is kept even if starting the launcher fails.
    pub async fn add_account(&self, name: &str, email: &str) -> Result<String> {
        let id = self.store.add_account(name, email).await?;

        _ = self.bridge.kill_launcher_process().await;
        self.bridge.force_fresh_login(email).await?;
        self.bridge.start_launcher_process()?;
        self.events.launcher_started();

        self.schedule_watch(&id, email).await;
        Ok(id)
    }

    /// Puts the launcher on account `id`, restoring its saved session
    /// or asking for a login if there is none yet.
    pub async fn switch_account(&self, id: &str) -> SwitchResult {
        // Whoever is logged in now may have refreshed tokens
        if let Err(e) = self.save_current_session().await {
            err!("Couldn't save the current session (continuing): {e}");
        }

        _ = self.bridge.kill_launcher_process().await;
        _ = self.bridge.clear_game_cache().await;

        let account = match self.store.find_by_id(id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                return SwitchResult::failed(None, &AccountError::AccountNotFound(id.to_owned()))
            }
            Err(e) => return SwitchResult::failed(None, &e),
        };

        let outcome = if account.has_session() {
            self.switch_with_session(&account).await
        } else {
            self.switch_without_session(&account).await
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                err!("Couldn't switch to {}: {e}", account.email);
                SwitchResult::failed(Some(&account), &e)
            }
        }
    }

    async fn switch_with_session(&self, account: &Account) -> Result<SwitchResult> {
        let session = match self.store.load_session(account) {
            Ok(Some(session)) => session,
            Ok(None) => return self.switch_without_session(account).await,
            Err(e) => {
                err!("Saved session of {} is unusable, logging in again: {e}", account.email);
                return self.switch_without_session(account).await;
            }
        };
        self.bridge.restore_session(&session).await?;
        self.bridge.start_launcher_process()?;
        self.events.launcher_started();

        info!("Switched to {} ({})", account.name, account.email);
        Ok(SwitchResult {
            success: true,
            account_name: account.name.clone(),
            email: account.email.clone(),
            has_session: true,
            message: "Launcher started, logging in automatically".to_owned(),
            error: None,
        })
    }

    async fn switch_without_session(&self, account: &Account) -> Result<SwitchResult> {
        self.bridge.force_fresh_login(&account.email).await?;
        self.bridge.start_launcher_process()?;
        self.events.launcher_started();

        self.schedule_watch(&account.id, &account.email).await;
        info!("Switched to {} ({}), waiting for login", account.name, account.email);
        Ok(SwitchResult {
            success: true,
            account_name: account.name.clone(),
            email: account.email.clone(),
            has_session: false,
            message: "Please log in, the session will be saved automatically".to_owned(),
            error: None,
        })
    }

    /// Removes the account. A watch already running for it is left
    /// alone and ends as [`WatchOutcome::Orphaned`] if the login
    /// completes.
    ///
    /// # Errors
    /// If `accounts.json` couldn't be updated.
    pub async fn delete_account(&self, id: &str) -> Result<()> {
        self.store.delete_account(id).await
    }

    /// Stores whatever session the launcher holds right now on the
    /// account with the matching e-mail.
    ///
    /// Returns that account's id, or `None` if nobody (known) is
    /// logged in.
    ///
    /// # Errors
    /// If the session couldn't be encrypted or stored.
    pub async fn save_current_session(&self) -> Result<Option<String>> {
        let Some(login) = self.bridge.read_login_state().await else {
            return Ok(None);
        };
        if login.login.is_empty() || !login.has_tokens() {
            return Ok(None);
        }
        let Some(account) = self.store.find_by_email(&login.login).await? else {
            return Ok(None);
        };

        let environment = self.bridge.read_environment_ui_type().await;
        let session = login.into_session(environment);
        if !self.store.update_session(&account.id, &session).await? {
            return Ok(None);
        }
        pt!("Saved current session of {}", account.email);
        Ok(Some(account.id))
    }

    /// Waits for the most recently scheduled watch to end.
    ///
    /// `None` if nothing was scheduled, or the watch was superseded
    /// before it even started.
    pub async fn wait_for_watch(&self) -> Option<WatchOutcome> {
        let pending = self.pending.lock().await.take()?;
        match pending.await {
            Ok(outcome) => outcome,
            Err(e) => {
                err!("Session watcher crashed: {e}");
                None
            }
        }
    }

    /// Starts watching for `email` after the launcher has had
    /// some time to start up.
    async fn schedule_watch(&self, account_id: &str, email: &str) {
        let watcher = Arc::clone(&self.watcher);
        let delay = self.watch_delay;
        let account_id = account_id.to_owned();
        let email = email.to_owned();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            watcher.start(&account_id, &email).await.await.ok()
        });
        if let Some(previous) = self.pending.lock().await.replace(handle) {
            // Not started yet means it would only start a stale watch
            previous.abort();
        }
    }
}
