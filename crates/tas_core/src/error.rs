use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("at path {path:?}: {error}")]
    Io { error: String, path: PathBuf },
    #[error("file not found: {path:?}")]
    NotFound { path: PathBuf },
    #[error("couldn't find the config directory (%APPDATA% or ~/.config)")]
    ConfigDirNotFound,
}

impl IoError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, IoError::NotFound { .. })
    }
}

pub trait IntoIoError<T> {
    #[allow(clippy::missing_errors_doc)]
    fn path(self, p: impl AsRef<Path>) -> Result<T, IoError>;
}

impl<T> IntoIoError<T> for std::io::Result<T> {
    fn path(self, p: impl AsRef<Path>) -> Result<T, IoError> {
        self.map_err(|err| {
            let path = p.as_ref().to_owned();
            if err.kind() == std::io::ErrorKind::NotFound {
                IoError::NotFound { path }
            } else {
                IoError::Io {
                    error: err.to_string(),
                    path,
                }
            }
        })
    }
}

const JSON_ERR_PREFIX: &str = "JSON error: ";

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("{JSON_ERR_PREFIX}while parsing:\n{error}\n\nInput: {json}")]
    From {
        error: serde_json::Error,
        json: String,
    },
    #[error("{JSON_ERR_PREFIX}while serializing:\n{error}")]
    To { error: serde_json::Error },
}

pub trait IntoJsonError<T> {
    #[allow(clippy::missing_errors_doc)]
    fn json(self, json: String) -> Result<T, JsonError>;
    #[allow(clippy::missing_errors_doc)]
    fn json_to(self) -> Result<T, JsonError>;
}

impl<T> IntoJsonError<T> for Result<T, serde_json::Error> {
    fn json(self, json: String) -> Result<T, JsonError> {
        // Input is echoed into the message, so keep it short.
        // The files we parse can hold auth tokens.
        self.map_err(|error| JsonError::From {
            error,
            json: truncate(json, 64),
        })
    }

    fn json_to(self) -> Result<T, JsonError> {
        self.map_err(|error| JsonError::To { error })
    }
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str("...");
    }
    s
}

#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error(transparent)]
    SerdeError(#[from] JsonError),
    #[error(transparent)]
    Io(#[from] IoError),
}

impl JsonFileError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, JsonFileError::Io(err) if err.is_not_found())
    }
}

/// Flattens any error into its message, for front ends
/// that only ever show errors as text.
pub trait IntoStringError<T> {
    #[allow(clippy::missing_errors_doc)]
    fn strerr(self) -> Result<T, String>;
}

impl<T, E: std::fmt::Display> IntoStringError<T> for Result<T, E> {
    fn strerr(self) -> Result<T, String> {
        self.map_err(|e| e.to_string())
    }
}
