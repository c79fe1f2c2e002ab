//! Core types for account switching

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tas_core::{IntoJsonError, JsonFileError};

use crate::{AccountError, CredentialVault, Result};

/// The launcher settings keys that make up a login.
///
/// Nothing outside this list is ever captured from or restored into
/// the launcher's settings file.
pub const AUTH_FIELDS: [&str; 7] = [
    "login",
    "at",
    "rt",
    "atet",
    "keepLoggedIn",
    "saveLogin",
    "selectedGame",
];

/// Points the launcher's scratch files at our own temp directory.
pub const TEMP_FOLDER_FIELD: &str = "tempFolder";

/// The in-game background, kept in the game's own settings file.
pub const ENVIRONMENT_UI_TYPE_FIELD: &str = "EnvironmentUiType";

/// A registered game identity.
///
/// An account without a session is normal: it stays that way
/// from creation until its first login is captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    /// Display label, not unique
    pub name: String,
    /// Matched against the launcher's `login` field
    pub email: String,
    /// Encrypted [`CapturedSession`], see [`CredentialVault::encrypt`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_captured_at: Option<DateTime<Utc>>,
}

impl Account {
    pub(crate) fn new(name: &str, email: &str) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.to_owned(),
            email: email.to_owned(),
            session: None,
            session_captured_at: None,
        }
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// The fixed set of fields taken from the launcher (and game)
/// settings at the moment a login succeeds.
///
/// Apart from the tokens, the values are whatever JSON the launcher
/// wrote, so they round-trip untouched. A field that was absent when
/// captured stays absent and is left alone on restore.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atet: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_logged_in: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_login: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_game: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_ui_type: Option<String>,
}

impl CapturedSession {
    /// The [`AUTH_FIELDS`] this session carries, as launcher settings entries.
    #[must_use]
    pub fn auth_fields(&self) -> Map<String, Value> {
        let strings = [("login", &self.login), ("at", &self.at), ("rt", &self.rt)];
        let values = [
            ("atet", &self.atet),
            ("keepLoggedIn", &self.keep_logged_in),
            ("saveLogin", &self.save_login),
            ("selectedGame", &self.selected_game),
        ];

        let mut fields = Map::new();
        for (key, value) in strings {
            if let Some(value) = value {
                fields.insert(key.to_owned(), Value::String(value.clone()));
            }
        }
        for (key, value) in values {
            if let Some(value) = value {
                fields.insert(key.to_owned(), value.clone());
            }
        }
        fields
    }

    /// The cosmetic field, if there's anything worth restoring.
    #[must_use]
    pub fn environment_ui_type(&self) -> Option<&str> {
        self.environment_ui_type.as_deref().filter(|s| !s.is_empty())
    }

    /// Serializes and encrypts the session for [`Account::session`].
    ///
    /// # Errors
    /// If the vault can't encrypt.
    pub fn seal(&self, vault: &CredentialVault) -> Result<String> {
        let json = serde_json::to_vec(self)
            .json_to()
            .map_err(JsonFileError::from)?;
        Ok(vault.encrypt(&json)?)
    }

    /// Decrypts and parses a blob made by [`CapturedSession::seal`].
    ///
    /// # Errors
    /// If the blob is corrupted, tampered with or from another key.
    pub fn open(blob: &str, vault: &CredentialVault) -> Result<Self> {
        let json = vault.decrypt(blob)?;
        let text = String::from_utf8(json)
            .map_err(|_| AccountError::Crypto(crate::CryptoError::Malformed("not UTF-8")))?;
        // Never echo the decrypted text, it holds tokens
        Ok(serde_json::from_str(&text)
            .json("<decrypted session>".to_owned())
            .map_err(JsonFileError::from)?)
    }
}

/// What the launcher's settings file says about the current login.
///
/// Missing or non-string `login`/`at`/`rt` read as empty.
#[derive(Clone, Default, PartialEq)]
pub struct LoginState {
    pub login: String,
    pub at: String,
    pub rt: String,
    pub atet: Option<Value>,
    pub keep_logged_in: Option<Value>,
    pub save_login: Option<Value>,
    pub selected_game: Option<Value>,
}

impl LoginState {
    #[must_use]
    pub fn from_settings(settings: &Map<String, Value>) -> Self {
        let string = |key: &str| {
            settings
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        let value = |key: &str| settings.get(key).cloned();

        Self {
            login: string("login"),
            at: string("at"),
            rt: string("rt"),
            atet: value("atet"),
            keep_logged_in: value("keepLoggedIn"),
            save_login: value("saveLogin"),
            selected_game: value("selectedGame"),
        }
    }

    /// Both tokens are present, i.e. someone is actually logged in.
    #[must_use]
    pub fn has_tokens(&self) -> bool {
        !self.at.is_empty() && !self.rt.is_empty()
    }

    /// Logged in, with tokens, as `email`.
    #[must_use]
    pub fn is_logged_in_as(&self, email: &str) -> bool {
        !self.login.is_empty() && self.login == email && self.has_tokens()
    }

    #[must_use]
    pub fn into_session(self, environment_ui_type: Option<String>) -> CapturedSession {
        CapturedSession {
            login: Some(self.login),
            at: Some(self.at),
            rt: Some(self.rt),
            atet: self.atet,
            keep_logged_in: self.keep_logged_in,
            save_login: self.save_login,
            selected_game: self.selected_game,
            environment_ui_type,
        }
    }
}

fn redacted(token: Option<&str>) -> &'static str {
    match token {
        Some(t) if !t.is_empty() => "<redacted>",
        _ => "<empty>",
    }
}

impl std::fmt::Debug for CapturedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedSession")
            .field("login", &self.login)
            .field("at", &redacted(self.at.as_deref()))
            .field("rt", &redacted(self.rt.as_deref()))
            .field("atet", &self.atet)
            .field("keep_logged_in", &self.keep_logged_in)
            .field("save_login", &self.save_login)
            .field("selected_game", &self.selected_game)
            .field("environment_ui_type", &self.environment_ui_type)
            .finish()
    }
}

impl std::fmt::Debug for LoginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginState")
            .field("login", &self.login)
            .field("at", &redacted(Some(&self.at)))
            .field("rt", &redacted(Some(&self.rt)))
            .field("selected_game", &self.selected_game)
            .finish_non_exhaustive()
    }
}

/// Delays and intervals of the switching protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Wait after killing the launcher, it may still be flushing its settings
    pub settle_delay: Duration,
    /// Wait after starting the launcher before the watcher begins
    pub watch_delay: Duration,
    pub poll_interval: Duration,
    /// Give up on a login after this long
    pub watch_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
            watch_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(2),
            watch_timeout: Duration::from_secs(5 * 60),
        }
    }
}
