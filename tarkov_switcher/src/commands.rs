use std::sync::Arc;

use owo_colors::OwoColorize;
use tas_accounts::{
    Account, AccountStore, CredentialVault, LauncherBridge, SwitchEvents, SwitchOrchestrator,
    Timings, WatchOutcome,
};
use tas_core::{err, info, pt, AppPaths, AppSettings, IntoStringError};

use crate::cli::{Command, ConfigCommand};

/// Prints what the core reports while a command runs.
struct TerminalEvents;

impl SwitchEvents for TerminalEvents {
    fn session_captured(&self, account_id: &str) {
        info!("Session of account {account_id} saved, switching to it won't need a login anymore");
    }

    fn launcher_started(&self) {
        pt!("Launcher started");
    }
}

fn switcher(paths: &AppPaths, settings: &AppSettings) -> SwitchOrchestrator {
    let vault = Arc::new(CredentialVault::new(&paths.key_file));
    let store = Arc::new(AccountStore::new(&paths.accounts_file, vault));
    let bridge = Arc::new(LauncherBridge::new(paths.clone(), &settings.launcher_path));
    SwitchOrchestrator::new(store, bridge, Arc::new(TerminalEvents), Timings::default())
}

pub async fn run(command: Command, paths: AppPaths, mut settings: AppSettings) -> Result<(), String> {
    match command {
        Command::List => list(&switcher(&paths, &settings), &settings).await,
        Command::Add { name, email } => {
            let switcher = switcher(&paths, &settings);
            let id = switcher.add_account(&name, &email).await.strerr()?;
            info!("Added {name} ({id}). Log in with the launcher, the session is saved automatically");
            wait_for_login(&switcher).await;
            Ok(())
        }
        Command::Switch { account } => {
            let switcher = switcher(&paths, &settings);
            let account = resolve(switcher.store(), &account).await?;
            let result = switcher.switch_account(&account.id).await;
            if !result.success {
                return Err(result.error.unwrap_or_else(|| "Switching failed".to_owned()));
            }
            info!("{}: {}", result.account_name, result.message);
            if !result.has_session {
                wait_for_login(&switcher).await;
            }
            Ok(())
        }
        Command::Delete { account } => {
            let switcher = switcher(&paths, &settings);
            let account = resolve(switcher.store(), &account).await?;
            switcher.delete_account(&account.id).await.strerr()?;
            info!("Deleted {} ({})", account.name, account.email);
            Ok(())
        }
        Command::SaveSession => {
            let switcher = switcher(&paths, &settings);
            match switcher.save_current_session().await.strerr()? {
                Some(id) => info!("Saved the current session to account {id}"),
                None => info!("The launcher isn't logged into any known account"),
            }
            Ok(())
        }
        Command::Config { action } => config(action, &paths, &mut settings).await,
    }
}

async fn list(switcher: &SwitchOrchestrator, settings: &AppSettings) -> Result<(), String> {
    let accounts = switcher.store().list_accounts().await.strerr()?;
    if accounts.is_empty() {
        println!("No accounts yet, add one with `tarkov_switcher add <NAME> <EMAIL>`");
        return Ok(());
    }

    for (i, account) in accounts.iter().enumerate() {
        let status = match account.session_captured_at {
            Some(at) if account.has_session() => format!(
                "{} {}",
                "session saved".green(),
                at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
            ),
            _ => "no session".yellow().to_string(),
        };
        println!(
            "{:>3}. {} <{}> [{status}]",
            i + 1,
            account.name.bold(),
            settings.display_email(&account.email),
        );
        println!("     {}", account.id.dimmed());
    }
    Ok(())
}

/// Finds an account by its number in `list` or by its id.
async fn resolve(store: &AccountStore, account: &str) -> Result<Account, String> {
    let accounts = store.list_accounts().await.strerr()?;

    let by_number = account
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| accounts.get(i));
    if let Some(found) = by_number {
        return Ok(found.clone());
    }
    accounts
        .into_iter()
        .find(|a| a.id == account)
        .ok_or_else(|| format!("No account {account}, see `tarkov_switcher list`"))
}

async fn wait_for_login(switcher: &SwitchOrchestrator) {
    pt!("Waiting for the login (up to 5 minutes, Ctrl+C to stop)");
    match switcher.wait_for_watch().await {
        Some(WatchOutcome::Captured) => {}
        Some(WatchOutcome::TimedOut) => {
            err!("No login within 5 minutes, switch to this account again to retry");
        }
        Some(WatchOutcome::Orphaned) => err!("The account was deleted before its login finished"),
        Some(WatchOutcome::Cancelled) | None => pt!("Stopped waiting for the login"),
    }
}

async fn config(
    action: ConfigCommand,
    paths: &AppPaths,
    settings: &mut AppSettings,
) -> Result<(), String> {
    match action {
        ConfigCommand::Show => {
            let found = if settings.launcher_path.exists() {
                "found".green().to_string()
            } else {
                "not found".red().to_string()
            };
            println!("Launcher path: {:?} ({found})", settings.launcher_path);
            println!(
                "Streamer mode: {}",
                if settings.streamer_mode { "on" } else { "off" }
            );
            println!("Data folder:   {:?}", paths.data_dir);
        }
        ConfigCommand::LauncherPath { path } => {
            if !path.exists() {
                err!("{path:?} doesn't exist (yet), saving it anyway");
            }
            settings
                .set_launcher_path(&paths.settings_file, path)
                .await
                .strerr()?;
            info!("Launcher path saved");
        }
        ConfigCommand::StreamerMode { state } => {
            let on = bool::from(state);
            settings
                .set_streamer_mode(&paths.settings_file, on)
                .await
                .strerr()?;
            info!("Streamer mode {}", if on { "on" } else { "off" });
        }
    }
    Ok(())
}
