//! # Tarkov account switching
//!
//! The BSG launcher only knows one logged-in identity at a time.
//! This crate keeps several, captures each one's session once it has
//! logged in, and swaps the launcher between them:
//!
//! - [`CredentialVault`]: AES-256-GCM for session blobs at rest
//! - [`AccountStore`]: the ordered `accounts.json`
//! - [`LauncherBridge`]: the launcher's settings file, process and caches
//! - [`SessionWatcher`]: notices when a fresh login has completed
//! - [`SwitchOrchestrator`]: add, switch and delete, start to finish

mod errors;
mod launcher;
mod store;
mod switcher;
mod traits;
mod types;
mod vault;
mod watcher;

pub use errors::{AccountError, CryptoError, Result};
pub use launcher::{BestEffort, CacheReport, LauncherBridge, SystemProcess, LAUNCHER_PROCESS};
pub use store::AccountStore;
pub use switcher::{SwitchOrchestrator, SwitchResult};
pub use traits::{ChannelEvents, NoEvents, ProcessControl, SwitchEvent, SwitchEvents};
pub use types::*;
pub use vault::CredentialVault;
pub use watcher::{SessionWatcher, WatchOutcome};
