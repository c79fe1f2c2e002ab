//! Seams to the world outside the core: the UI and the OS

use std::path::Path;

use tokio::sync::mpsc::UnboundedSender;

/// Notifications for the UI (optional, the core runs without one)
pub trait SwitchEvents: Send + Sync {
    /// A fresh login was captured and stored for this account.
    fn session_captured(&self, account_id: &str);

    /// The launcher was just started, the UI should get out of the way.
    fn launcher_started(&self);
}

/// Ignores every notification.
pub struct NoEvents;

impl SwitchEvents for NoEvents {
    fn session_captured(&self, _account_id: &str) {}
    fn launcher_started(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchEvent {
    SessionCaptured(String),
    LauncherStarted,
}

/// Forwards notifications into a channel, for UIs with an event loop.
pub struct ChannelEvents(pub UnboundedSender<SwitchEvent>);

impl SwitchEvents for ChannelEvents {
    fn session_captured(&self, account_id: &str) {
        // The receiver going away just means nobody is listening
        _ = self.0.send(SwitchEvent::SessionCaptured(account_id.to_owned()));
    }

    fn launcher_started(&self) {
        _ = self.0.send(SwitchEvent::LauncherStarted);
    }
}

/// Process primitives the launcher bridge needs from the OS.
///
/// See [`SystemProcess`](crate::SystemProcess) for the real thing.
pub trait ProcessControl: Send + Sync {
    /// Terminates every process with this image name.
    /// Nothing running is not an error.
    ///
    /// # Errors
    /// If the kill command itself couldn't be run.
    fn kill_by_name(&self, process_name: &str) -> std::io::Result<()>;

    /// Starts `exe` without waiting for it.
    ///
    /// # Errors
    /// If the OS refused to start it.
    fn spawn_detached(&self, exe: &Path) -> std::io::Result<()>;
}
