//! The persisted list of accounts (`accounts.json`).
//!
//! The file is a pretty-printed JSON array in display order.
//! It's read on every call and rewritten whole on every change,
//! there's no incremental format.

use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use tas_core::{info, IntoIoError, IntoJsonError, JsonFileError};
use tokio::sync::Mutex;

use crate::{Account, CapturedSession, CredentialVault, Result};

pub struct AccountStore {
    path: PathBuf,
    vault: Arc<CredentialVault>,
    /// Serializes read-modify-write cycles within this process
    /// (the watcher writes from a background task).
    write_lock: Mutex<()>,
}

impl AccountStore {
    pub fn new(path: impl Into<PathBuf>, vault: Arc<CredentialVault>) -> Self {
        Self {
            path: path.into(),
            vault,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// All accounts in display (insertion) order.
    /// No file yet means no accounts.
    ///
    /// # Errors
    /// If the file is unreadable or malformed.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.read().await?)
    }

    /// Appends a new account without a session and returns its id.
    ///
    /// # Errors
    /// If the file couldn't be read or written.
    pub async fn add_account(&self, name: &str, email: &str) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.read().await?;

        let account = Account::new(name, email);
        let id = account.id.clone();
        accounts.push(account);
        self.write(&accounts).await?;

        info!("Added account {name} ({email})");
        Ok(id)
    }

    /// Removes the account with this id. Unknown ids are ignored.
    ///
    /// # Errors
    /// If the file couldn't be read or written.
    pub async fn delete_account(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.read().await?;

        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        if accounts.len() != before {
            self.write(&accounts).await?;
            info!("Deleted account {id}");
        }
        Ok(())
    }

    /// # Errors
    /// If the file is unreadable or malformed.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.read().await?.into_iter().find(|a| a.id == id))
    }

    /// The first account registered with this e-mail.
    ///
    /// # Errors
    /// If the file is unreadable or malformed.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.read().await?.into_iter().find(|a| a.email == email))
    }

    /// Encrypts `session` and stores it on the account, stamped with
    /// the current time.
    ///
    /// Returns `false` (and writes nothing) if there's no such account,
    /// e.g. it was deleted while its login was being watched.
    ///
    /// # Errors
    /// If encryption failed or the file couldn't be read or written.
    pub async fn update_session(&self, id: &str, session: &CapturedSession) -> Result<bool> {
        let sealed = session.seal(&self.vault)?;

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.read().await?;
        let Some(account) = accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        account.session = Some(sealed);
        account.session_captured_at = Some(Utc::now());
        self.write(&accounts).await?;
        Ok(true)
    }

    /// Decrypts the account's stored session, if it has one.
    ///
    /// # Errors
    /// If the blob doesn't decrypt (corrupted, tampered or
    /// sealed with a different key).
    pub fn load_session(&self, account: &Account) -> Result<Option<CapturedSession>> {
        match account.session.as_deref() {
            Some(blob) if !blob.is_empty() => Ok(Some(CapturedSession::open(blob, &self.vault)?)),
            _ => Ok(None),
        }
    }

    async fn read(&self) -> std::result::Result<Vec<Account>, JsonFileError> {
        let text = match tokio::fs::read_to_string(&self.path).await.path(&self.path) {
            Ok(text) => text,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text).json(text)?)
    }

    async fn write(&self, accounts: &[Account]) -> std::result::Result<(), JsonFileError> {
        let text = serde_json::to_string_pretty(accounts).json_to()?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.path(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text).await.path(&tmp)?;
        tokio::fs::rename(&tmp, &self.path).await.path(&self.path)?;
        Ok(())
    }
}
