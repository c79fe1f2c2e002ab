//! Shared plumbing for the Tarkov account switcher.
//!
//! - [`print`]: the `info!`, `pt!` and `err!` logging macros
//! - [`error`]: file and JSON error types used by every crate
//! - [`paths`]: where our own files and the launcher's files live
//! - [`settings`]: the persisted app settings (`settings.json`)

pub mod error;
pub mod paths;
pub mod print;
pub mod settings;

pub use error::{
    IntoIoError, IntoJsonError, IntoStringError, IoError, JsonError, JsonFileError,
};
pub use paths::AppPaths;
pub use settings::{mask_email, AppSettings};

#[doc(hidden)]
pub use owo_colors;

pub const APP_NAME: &str = "TarkovAccountSwitcher";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
