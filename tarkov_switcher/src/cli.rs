use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Switch between Escape from Tarkov accounts in the BSG launcher
#[derive(Parser)]
#[command(name = "tarkov_switcher")]
#[command(version, about)]
pub struct Cli {
    /// Don't print log messages to the terminal (they still go to the log file)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show all accounts and whether their session is saved
    List,
    /// Add an account and open the launcher to log into it
    ///
    /// Waits until the login goes through (or 5 minutes pass)
    /// and saves the session, so later switches need no login.
    Add { name: String, email: String },
    /// Switch the launcher to an account
    Switch {
        /// The account's number in `list`, or its id
        account: String,
    },
    /// Remove an account
    Delete {
        /// The account's number in `list`, or its id
        account: String,
    },
    /// Save the session the launcher is logged into right now
    SaveSession,
    /// Show or change the settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Show,
    /// Where BsgLauncher.exe is installed
    LauncherPath { path: PathBuf },
    /// Mask e-mail addresses in output and logs
    StreamerMode { state: Toggle },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        matches!(toggle, Toggle::On)
    }
}
