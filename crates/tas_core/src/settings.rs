use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{err, IntoIoError, IntoJsonError, JsonFileError};

pub const DEFAULT_LAUNCHER_PATH: &str = r"C:\Battlestate Games\BsgLauncher\BsgLauncher.exe";

/// App settings stored in `settings.json` in the data directory.
///
/// Unknown keys from newer or older versions are ignored,
/// missing keys fall back to their defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Where `BsgLauncher.exe` is installed.
    pub launcher_path: PathBuf,
    /// Hide e-mail addresses in the UI and in logs.
    pub streamer_mode: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            launcher_path: PathBuf::from(DEFAULT_LAUNCHER_PATH),
            streamer_mode: false,
        }
    }
}

impl AppSettings {
    /// Load the settings.
    ///
    /// # Errors
    /// - if the user doesn't have permission to access the data directory
    ///
    /// Doesn't fail on a missing or corrupted file:
    /// a corrupted one is backed up to `settings.json.bak`
    /// and replaced with defaults (with an error log message).
    pub async fn load(path: &Path) -> Result<Self, JsonFileError> {
        let text = match tokio::fs::read_to_string(path).await.path(path) {
            Ok(text) => text,
            Err(e) if e.is_not_found() => return Self::create(path).await,
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&text) {
            Ok(settings) => Ok(settings),
            Err(error) => {
                err!("Invalid settings file, resetting to defaults.\nError: {error}");
                let backup = path.with_extension("json.bak");
                _ = tokio::fs::copy(path, &backup).await;
                Self::create(path).await
            }
        }
    }

    /// # Errors
    /// If the file couldn't be written.
    pub async fn save(&self, path: &Path) -> Result<(), JsonFileError> {
        let json = serde_json::to_string_pretty(self).json_to()?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.path(parent)?;
        }
        tokio::fs::write(path, json).await.path(path)?;
        Ok(())
    }

    /// # Errors
    /// If the file couldn't be written.
    pub async fn set_launcher_path(
        &mut self,
        path: &Path,
        launcher_path: PathBuf,
    ) -> Result<(), JsonFileError> {
        self.launcher_path = launcher_path;
        self.save(path).await
    }

    /// # Errors
    /// If the file couldn't be written.
    pub async fn set_streamer_mode(&mut self, path: &Path, on: bool) -> Result<(), JsonFileError> {
        self.streamer_mode = on;
        crate::print::set_redact_emails(on);
        self.save(path).await
    }

    /// `email`, masked if streamer mode is on.
    #[must_use]
    pub fn display_email(&self, email: &str) -> String {
        if self.streamer_mode {
            mask_email(email)
        } else {
            email.to_owned()
        }
    }

    async fn create(path: &Path) -> Result<Self, JsonFileError> {
        let settings = Self::default();
        settings.save(path).await?;
        Ok(settings)
    }
}

/// `"test@email.com"` -> `"t***@e***.com"`
#[must_use]
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return "****".to_owned();
    };
    let Some(first) = local.chars().next() else {
        return "****".to_owned();
    };

    let masked_domain = match (domain.chars().next(), domain.find('.')) {
        (Some(d), Some(dot)) if dot > 0 => format!("{d}***{}", &domain[dot..]),
        _ => "***".to_owned(),
    };
    format!("{first}***@{masked_domain}")
}
