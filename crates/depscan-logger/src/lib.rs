//! User-facing console output and the per-run log file for depscan
//!
//! Every message is appended to `~/.config/depscan/depscan.log`. Console
//! output goes to stderr so that manifests printed on stdout stay parseable;
//! `info` and `debug` only reach the console with `-v`.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);
static NO_STDOUT: Mutex<bool> = Mutex::new(false);
static SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

const LOG_FILE_NAME: &str = "depscan.log";
const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Success,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Success => "SUCCESS",
        }
    }

    /// Lowest verbosity at which the console shows this level
    fn min_verbosity(self) -> u8 {
        match self {
            Level::Debug | Level::Info => 1,
            Level::Warn | Level::Error | Level::Success => 0,
        }
    }
}

pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().map(|v| *v).unwrap_or(0)
}

fn console_enabled() -> bool {
    !NO_STDOUT.lock().map(|v| *v).unwrap_or(false)
}

/// `tracing` filter directive for the current verbosity
/// 0 = warn only, 1 = debug for depscan crates (-v), 2 = trace (-vv)
pub fn verbosity_to_filter() -> String {
    match get_verbosity() {
        0 => "warn".to_string(),
        1 => "warn,depscan=debug,depscan_ast=debug,depscan_manifest=debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Set the verbosity and start a fresh log file
///
/// With `no_stdout` only errors reach the console.
pub fn init_with_verbosity(verbosity: u8, no_stdout: bool) -> Result<(), String> {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
    if let Ok(mut v) = NO_STDOUT.lock() {
        *v = no_stdout;
    }

    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir).map_err(|e| format!("Failed to create log directory: {}", e))?;

    let log_file = log_dir.join(LOG_FILE_NAME);
    if log_file.exists() {
        let _ = fs::remove_file(&log_file);
    }

    let mut guard = LOG_FILE
        .lock()
        .map_err(|_| "Log file lock poisoned".to_string())?;
    *guard = Some(log_file);
    Ok(())
}

fn log_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config");

    #[cfg(target_os = "windows")]
    let base = dirs::config_dir().ok_or("Could not determine config directory")?;

    Ok(base.join("depscan"))
}

fn write_to_log(level: Level, message: &str) {
    let Ok(guard) = LOG_FILE.lock() else {
        return;
    };
    let Some(ref path) = *guard else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let _ = writeln!(file, "[{}] {} {}", timestamp, level.tag(), message);
    }
}

fn emit(level: Level, message: &str) {
    write_to_log(level, message);

    let shown = match level {
        Level::Error => true,
        _ => console_enabled() && get_verbosity() >= level.min_verbosity(),
    };
    if !shown {
        return;
    }

    // Keep the spinner line intact while printing above it
    let print = || match level {
        Level::Debug => eprintln!("{} {}", "DEBUG:".blue().bold(), message),
        Level::Info => eprintln!("{}", message),
        Level::Warn => eprintln!("{} {}", "warning:".yellow().bold(), message),
        Level::Error => eprintln!("{} {}", "Error:".red().bold(), message),
        Level::Success => eprintln!("{} {}", "\u{2714}".green().bold(), message),
    };
    match SPINNER.lock().ok().and_then(|guard| guard.clone()) {
        Some(spinner) => spinner.suspend(print),
        None => print(),
    }
}

pub fn debug(message: &str) {
    emit(Level::Debug, message);
}

pub fn info(message: &str) {
    emit(Level::Info, message);
}

pub fn warn(message: &str) {
    emit(Level::Warn, message);
}

pub fn error(message: &str) {
    emit(Level::Error, message);
}

pub fn success(message: &str) {
    emit(Level::Success, message);
}

pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|guard| guard.clone())
}

/// Start a spinner; suppressed with `-v` so debug output is not interleaved
pub fn spinner_start(message: &str) {
    if get_verbosity() > 0 || !console_enabled() {
        return;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(SPINNER_TICKS)
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    if let Ok(mut guard) = SPINNER.lock() {
        *guard = Some(spinner);
    }
}

pub fn spinner_stop() {
    let spinner = SPINNER.lock().ok().and_then(|mut guard| guard.take());
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
}

pub fn spinner_error(message: &str) {
    spinner_stop();
    write_to_log(Level::Error, message);
    eprintln!("  {} {}", "✗".red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filter() {
        if let Ok(mut v) = VERBOSITY.lock() {
            *v = 0;
        }
        assert_eq!(verbosity_to_filter(), "warn");
        if let Ok(mut v) = VERBOSITY.lock() {
            *v = 1;
        }
        assert!(verbosity_to_filter().contains("depscan_ast=debug"));
        if let Ok(mut v) = VERBOSITY.lock() {
            *v = 0;
        }
    }

    #[test]
    fn test_console_levels() {
        assert_eq!(Level::Debug.min_verbosity(), 1);
        assert_eq!(Level::Info.min_verbosity(), 1);
        assert_eq!(Level::Warn.min_verbosity(), 0);
        assert_eq!(Level::Success.tag(), "SUCCESS");
    }
}
