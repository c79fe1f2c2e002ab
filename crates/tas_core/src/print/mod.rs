//! Logging for the switcher.
//!
//! Use the [`info!`](crate::info), [`pt!`](crate::pt) and [`err!`](crate::err)
//! macros rather than these functions. Every line is kept in a small
//! in-memory ring and, once [`logger_init`] has run, appended to
//! `logs/<date>.log` in the data directory.

use std::{
    collections::VecDeque,
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        LazyLock, Mutex,
    },
};

use regex::Regex;

use crate::{mask_email, IntoIoError, IoError};

mod macros;

const MEMORY_LINES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    Info,
    Error,
    Point,
}

impl LogType {
    fn tag(self) -> &'static str {
        match self {
            LogType::Info => "[info]",
            LogType::Error => "[error]",
            LogType::Point => "-",
        }
    }
}

#[derive(Default)]
struct LoggingState {
    file: Option<File>,
    memory: VecDeque<String>,
}

static LOGGER: LazyLock<Mutex<LoggingState>> =
    LazyLock::new(|| Mutex::new(LoggingState::default()));

static PRINT: AtomicBool = AtomicBool::new(true);
static REDACT_EMAILS: AtomicBool = AtomicBool::new(false);

pub static IS_GIT_BASH: LazyLock<bool> = LazyLock::new(|| {
    cfg!(windows) && std::env::var("MSYSTEM").is_ok_and(|n| n.starts_with("MINGW"))
});

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+").ok());

#[must_use]
pub fn is_print() -> bool {
    PRINT.load(Ordering::Relaxed)
}

/// Turns terminal output on or off. Memory and file logging continue.
pub fn set_print(print: bool) {
    PRINT.store(print, Ordering::Relaxed);
}

/// Masks e-mail addresses in every following log line (streamer mode).
pub fn set_redact_emails(redact: bool) {
    REDACT_EMAILS.store(redact, Ordering::Relaxed);
}

#[must_use]
pub fn auto_redact(msg: &str) -> String {
    if !REDACT_EMAILS.load(Ordering::Relaxed) {
        return msg.to_owned();
    }
    match &*EMAIL_RE {
        Some(re) => re
            .replace_all(msg, |caps: &regex::Captures| mask_email(&caps[0]))
            .into_owned(),
        None => msg.to_owned(),
    }
}

fn format_line(msg: &str, t: LogType) -> String {
    format!(
        "{} {} {msg}",
        chrono::Local::now().format("%H:%M:%S"),
        t.tag()
    )
}

pub fn print_to_memory(msg: &str, t: LogType) {
    if let Ok(mut state) = LOGGER.lock() {
        state.remember(format_line(msg, t));
    }
}

pub fn print_to_file(msg: &str, t: LogType) {
    let line = format_line(msg, t);
    if let Ok(mut state) = LOGGER.lock() {
        if let Some(file) = &mut state.file {
            if writeln!(file, "{line}").is_err() {
                state.file = None;
            }
        }
        state.remember(line);
    }
}

impl LoggingState {
    fn remember(&mut self, line: String) {
        if self.memory.len() == MEMORY_LINES {
            self.memory.pop_front();
        }
        self.memory.push_back(line);
    }
}

/// Opens today's log file under `logs_dir` for appending.
///
/// # Errors
/// If the directory or file couldn't be created.
pub fn logger_init(logs_dir: &Path) -> Result<PathBuf, IoError> {
    std::fs::create_dir_all(logs_dir).path(logs_dir)?;
    let path = logs_dir.join(format!("{}.log", chrono::Local::now().format("%Y-%m-%d")));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .path(&path)?;
    if let Ok(mut state) = LOGGER.lock() {
        state.file = Some(file);
    }
    Ok(path)
}

/// The most recent log lines, oldest first.
#[must_use]
pub fn get_logs() -> Vec<String> {
    LOGGER
        .lock()
        .map(|state| state.memory.iter().cloned().collect())
        .unwrap_or_default()
}
