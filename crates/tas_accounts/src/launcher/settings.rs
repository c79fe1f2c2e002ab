//! Reading and surgically editing the launcher's JSON settings.
//!
//! The launcher owns far more in this file than logins (installed
//! games, window layout, ...). Everything here edits a parsed copy
//! in place and only touches [`AUTH_FIELDS`] and `tempFolder`.

use std::path::Path;

use serde_json::{Map, Value};
use tas_core::{IntoIoError, IntoJsonError, JsonFileError};

use crate::types::{CapturedSession, AUTH_FIELDS, TEMP_FOLDER_FIELD};

/// Deleted on a fresh login so the launcher has to ask for credentials.
pub const TOKEN_FIELDS: [&str; 3] = ["at", "rt", "atet"];

/// Files next to the settings where a launcher version might
/// cache a session of its own.
pub const ALT_SESSION_FILES: [&str; 8] = [
    "user.json",
    "session",
    "token",
    ".session",
    "auth",
    "auth.json",
    "login",
    "login.json",
];

/// Parse errors name the file but never quote it: a half-written
/// launcher settings file starts with the tokens.
pub async fn read_object(path: &Path) -> Result<Map<String, Value>, JsonFileError> {
    let text = tokio::fs::read_to_string(path).await.path(path)?;
    Ok(serde_json::from_str(&text).json(format!("<contents of {path:?}>"))?)
}

pub async fn write_object(path: &Path, object: &Map<String, Value>) -> Result<(), JsonFileError> {
    let text = serde_json::to_string_pretty(object).json_to()?;
    tokio::fs::write(path, text).await.path(path)?;
    Ok(())
}

fn temp_folder_value(temp_folder: &Path) -> Value {
    Value::String(temp_folder.to_string_lossy().into_owned())
}

/// Points the launcher at `email` with no tokens,
/// so it opens on the login screen with the address filled in.
pub fn apply_fresh_login(settings: &mut Map<String, Value>, email: &str, temp_folder: &Path) {
    settings.insert("login".to_owned(), Value::String(email.to_owned()));
    settings.insert("saveLogin".to_owned(), Value::Bool(true));
    settings.insert("keepLoggedIn".to_owned(), Value::Bool(false));
    settings.insert(TEMP_FOLDER_FIELD.to_owned(), temp_folder_value(temp_folder));
    for key in TOKEN_FIELDS {
        settings.remove(key);
    }
}

/// Copies the session's auth fields over `settings`.
/// Keys the session doesn't carry keep their current value.
pub fn merge_session(
    settings: &mut Map<String, Value>,
    session: &CapturedSession,
    temp_folder: &Path,
) {
    let mut fields = session.auth_fields();
    for key in AUTH_FIELDS {
        if let Some(value) = fields.remove(key) {
            settings.insert(key.to_owned(), value);
        }
    }
    settings.insert(TEMP_FOLDER_FIELD.to_owned(), temp_folder_value(temp_folder));
}
