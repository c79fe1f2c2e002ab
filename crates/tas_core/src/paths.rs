use std::path::{Path, PathBuf};

use crate::{IntoIoError, IoError, APP_NAME};

/// Overrides the app data directory, mostly for portable installs.
pub const DATA_DIR_ENV: &str = "TAS_DATA_DIR";

/// Every file location the switcher reads or writes.
///
/// This is a plain value handed to whoever needs it,
/// so tests can point everything into a temporary directory
/// with [`AppPaths::in_root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Our own data directory (`%APPDATA%/TarkovAccountSwitcher`).
    pub data_dir: PathBuf,
    pub accounts_file: PathBuf,
    pub settings_file: PathBuf,
    pub key_file: PathBuf,
    /// Scratch directory the launcher is pointed at through its
    /// `tempFolder` setting.
    pub temp_folder: PathBuf,
    pub logs_dir: PathBuf,

    /// The launcher's own `settings` file (JSON, no extension).
    pub launcher_settings: PathBuf,
    /// The game's `Game.ini` (JSON content despite the name).
    pub game_settings: PathBuf,

    /// Display-asset caches that go stale across account switches.
    pub cache_dirs: Vec<PathBuf>,
    pub cache_files: Vec<PathBuf>,
}

impl AppPaths {
    /// Resolves the real locations on this machine.
    ///
    /// # Errors
    /// If the platform has no config directory.
    pub fn from_env() -> Result<Self, IoError> {
        let roaming = dirs::config_dir().ok_or(IoError::ConfigDirNotFound)?;
        let local = dirs::data_local_dir().unwrap_or_else(|| roaming.clone());
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => roaming.join(APP_NAME),
        };
        Ok(Self::build(data_dir, &roaming, &local, &std::env::temp_dir()))
    }

    /// Lays every path out beneath `root`: our data in `root/app`,
    /// the "roaming", "local" and "temp" trees in sibling folders.
    #[must_use]
    pub fn in_root(root: &Path) -> Self {
        Self::build(
            root.join("app"),
            &root.join("roaming"),
            &root.join("local"),
            &root.join("temp"),
        )
    }

    fn build(data_dir: PathBuf, roaming: &Path, local: &Path, temp: &Path) -> Self {
        let bsg_roaming = roaming.join("Battlestate Games");
        let cef_cache = local
            .join("Battlestate Games")
            .join("BsgLauncher")
            .join("CefCache");
        let bsg_temp = temp.join("Battlestate Games");

        Self {
            accounts_file: data_dir.join("accounts.json"),
            settings_file: data_dir.join("settings.json"),
            key_file: data_dir.join(".key"),
            temp_folder: data_dir.join("temp"),
            logs_dir: data_dir.join("logs"),
            data_dir,

            launcher_settings: bsg_roaming.join("BsgLauncher").join("settings"),
            game_settings: bsg_roaming
                .join("Escape from Tarkov")
                .join("Settings")
                .join("Game.ini"),

            cache_dirs: vec![
                bsg_temp.join("EscapeFromTarkov"),
                bsg_temp.join("EscapeFromTarkovArena"),
                cef_cache.join("Cache"),
                cef_cache.join("Code Cache"),
                cef_cache.join("GPUCache"),
                cef_cache.join("Session Storage"),
                cef_cache.join("Local Storage"),
            ],
            cache_files: vec![cef_cache.join("000003.log")],
        }
    }

    /// The directory holding the launcher's settings file.
    #[must_use]
    pub fn launcher_dir(&self) -> &Path {
        self.launcher_settings
            .parent()
            .unwrap_or(self.launcher_settings.as_path())
    }

    /// Creates our data and scratch directories.
    ///
    /// # Errors
    /// If the directories couldn't be created.
    pub async fn ensure_dirs(&self) -> Result<(), IoError> {
        for dir in [&self.data_dir, &self.temp_folder] {
            tokio::fs::create_dir_all(dir).await.path(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_paths_never_include_the_launcher_settings() {
        let paths = AppPaths::in_root(Path::new("/r"));
        assert!(paths
            .cache_dirs
            .iter()
            .all(|dir| !paths.launcher_settings.starts_with(dir)));
        assert!(!paths.cache_files.contains(&paths.launcher_settings));
    }

    #[test]
    fn launcher_dir_is_parent_of_settings() {
        let paths = AppPaths::in_root(Path::new("/r"));
        assert_eq!(
            paths.launcher_dir(),
            Path::new("/r/roaming/Battlestate Games/BsgLauncher")
        );
    }
}
