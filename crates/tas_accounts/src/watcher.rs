//! Noticing when a fresh login has gone through.
//!
//! The launcher never tells anyone it has logged in, so the watcher
//! polls its settings file until the expected e-mail shows up with
//! both tokens, then stores that session.
//!
//! At most one watch runs at a time. Starting a new one cancels the
//! old one, and each watch carries a generation number that is
//! checked under the state lock right before writing, so a stale
//! watch can never store anything once it has been replaced.

use std::{sync::Arc, time::Duration};

use tas_core::{err, info, pt};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{AccountStore, LauncherBridge, SwitchEvents, Timings};

/// How a watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The session was stored and the UI notified.
    Captured,
    /// Nobody logged in before the timeout. Not an error.
    TimedOut,
    /// Stopped, or replaced by a newer watch.
    Cancelled,
    /// The login happened but the account had been deleted meanwhile.
    Orphaned,
}

struct ActiveWatch {
    account_id: String,
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct WatcherState {
    active: Option<ActiveWatch>,
    next_generation: u64,
}

impl WatcherState {
    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.generation == generation)
    }
}

pub struct SessionWatcher {
    state: Arc<Mutex<WatcherState>>,
    bridge: Arc<LauncherBridge>,
    store: Arc<AccountStore>,
    events: Arc<dyn SwitchEvents>,
    poll_interval: Duration,
    timeout: Duration,
}

impl SessionWatcher {
    pub fn new(
        bridge: Arc<LauncherBridge>,
        store: Arc<AccountStore>,
        events: Arc<dyn SwitchEvents>,
        timings: &Timings,
    ) -> Self {
        Self {
            state: Arc::default(),
            bridge,
            store,
            events,
            poll_interval: timings.poll_interval,
            timeout: timings.watch_timeout,
        }
    }

    /// Cancels whatever is being watched and starts watching for
    /// `email` to log in, on behalf of `account_id`.
    ///
    /// The returned handle resolves once this watch is over.
    pub async fn start(&self, account_id: &str, email: &str) -> JoinHandle<WatchOutcome> {
        let cancel = CancellationToken::new();
        let generation = {
            let mut state = self.state.lock().await;
            if let Some(previous) = state.active.take() {
                previous.cancel.cancel();
                pt!("Stopped watching account {}", previous.account_id);
            }
            let generation = state.next_generation;
            state.next_generation += 1;
            state.active = Some(ActiveWatch {
                account_id: account_id.to_owned(),
                generation,
                cancel: cancel.clone(),
            });
            generation
        };

        info!("Waiting for {email} to log in");
        let task = WatchTask {
            state: Arc::clone(&self.state),
            bridge: Arc::clone(&self.bridge),
            store: Arc::clone(&self.store),
            events: Arc::clone(&self.events),
            account_id: account_id.to_owned(),
            email: email.to_owned(),
            generation,
            cancel,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        };
        tokio::spawn(task.run())
    }

    /// Cancels the current watch, if any.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(active) = state.active.take() {
            active.cancel.cancel();
            pt!("Stopped watching account {}", active.account_id);
        }
    }

    pub async fn is_watching(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    /// The account currently being watched for.
    pub async fn watching_account(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.active.as_ref().map(|a| a.account_id.clone())
    }
}

struct WatchTask {
    state: Arc<Mutex<WatcherState>>,
    bridge: Arc<LauncherBridge>,
    store: Arc<AccountStore>,
    events: Arc<dyn SwitchEvents>,
    account_id: String,
    email: String,
    generation: u64,
    cancel: CancellationToken,
    poll_interval: Duration,
    timeout: Duration,
}

impl WatchTask {
    async fn run(self) -> WatchOutcome {
        let start = Instant::now();
        let deadline = tokio::time::sleep_until(start + self.timeout);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval_at(start + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return WatchOutcome::Cancelled,
                () = &mut deadline => {
                    self.release().await;
                    info!("Gave up waiting for {} to log in", self.email);
                    return WatchOutcome::TimedOut;
                }
                _ = ticker.tick() => {}
            }

            let Some(login) = self.bridge.read_login_state().await else {
                continue;
            };
            if !login.is_logged_in_as(&self.email) {
                continue;
            }
            let environment = self.bridge.read_environment_ui_type().await;
            let session = login.into_session(environment);

            // Held across the write so a newer start() waits for it
            let mut state = self.state.lock().await;
            if !state.is_current(self.generation) {
                return WatchOutcome::Cancelled;
            }
            match self.store.update_session(&self.account_id, &session).await {
                Ok(true) => {
                    state.active = None;
                    drop(state);
                    info!("Saved session for {}", self.email);
                    self.events.session_captured(&self.account_id);
                    return WatchOutcome::Captured;
                }
                Ok(false) => {
                    state.active = None;
                    err!(no_log, "Account {} was deleted before its login finished", self.account_id);
                    return WatchOutcome::Orphaned;
                }
                Err(e) => err!("Couldn't save session for {} (retrying): {e}", self.email),
            }
        }
    }

    async fn release(&self) {
        let mut state = self.state.lock().await;
        if state.is_current(self.generation) {
            state.active = None;
        }
    }
}
