//! Error types for account switching

use std::path::PathBuf;

use tas_core::{IoError, JsonFileError};

/// Failures of the [`CredentialVault`](crate::CredentialVault).
///
/// A session blob that fails to decrypt is unusable,
/// never a reason to crash.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key unavailable: {0}")]
    KeyFile(#[from] IoError),

    #[error("couldn't generate random bytes: {0}")]
    Random(String),

    #[error("malformed session blob: {0}")]
    Malformed(&'static str),

    #[error("malformed session blob: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("session blob failed authentication (wrong key, corrupted or tampered)")]
    Tampered,

    #[error("encryption failed")]
    Encrypt,
}

/// Errors surfaced by the store, the launcher bridge and the orchestrator
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("account storage error:\n{0}")]
    Storage(#[from] JsonFileError),

    #[error("credential error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("launcher not found at {0:?}. Check the launcher path in the settings")]
    LauncherNotFound(PathBuf),

    #[error("couldn't start the launcher: {0}")]
    Spawn(IoError),

    #[error("couldn't write the launcher settings:\n{0}")]
    LauncherSettings(JsonFileError),

    #[error("account not found: {0}")]
    AccountNotFound(String),
}

/// Convenient type alias for Results in account switching
pub type Result<T> = std::result::Result<T, AccountError>;
