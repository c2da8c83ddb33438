//! Logcat viewer for the activity's log output.

use std::process::{Command, Stdio};

use colored::*;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use zenilib_activity::LOG_TAG;

use crate::CliError;
use crate::log;

/// Threadtime format: "MM-DD HH:MM:SS.mmm  PID  TID LEVEL TAG: Message"
const THREADTIME_PATTERN: &str =
    r"(\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3})\s+(\d+)\s+(\d+)\s+([VDIWEF])\s+([^:]+):\s*(.*)";

/// Log level filter for logcat output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Verbose,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v" | "verbose" => Ok(LogLevel::Verbose),
            "d" | "debug" => Ok(LogLevel::Debug),
            "i" | "info" => Ok(LogLevel::Info),
            "w" | "warn" | "warning" => Ok(LogLevel::Warn),
            "e" | "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}. Use: verbose, debug, info, warn, error", s)),
        }
    }
}

impl LogLevel {
    fn rank(self) -> u8 {
        self as u8
    }

    /// Whether a logcat level letter passes this filter.
    pub fn includes(&self, letter: &str) -> bool {
        let other = match letter {
            "V" => LogLevel::Verbose,
            "D" => LogLevel::Debug,
            "W" => LogLevel::Warn,
            "E" | "F" => LogLevel::Error,
            _ => LogLevel::Info,
        };
        other.rank() >= self.rank()
    }
}

/// Detects if a log line indicates a Rust panic
fn is_rust_panic(tag: &str, message: &str) -> bool {
    tag.contains("RustStdoutStderr")
        || message.starts_with("PANIC:")
        || message.contains("panicked at")
        || message.contains("stack backtrace:")
}

/// Detects if a log line indicates a native crash
fn is_native_crash(tag: &str, message: &str) -> bool {
    (tag == "DEBUG" && (message.contains("signal") || message.contains("fault addr")))
        || (tag == "libc" && message.contains("Fatal signal"))
        || tag == "crash_dump"
        || message.contains("SIGABRT")
        || message.contains("SIGSEGV")
}

/// Lines about library loading or the activity itself, even from system tags.
fn is_activity_line(tag: &str, message: &str) -> bool {
    tag == LOG_TAG
        || tag.contains("NativeActivity")
        || tag == "AndroidRuntime"
        || message.contains("dlopen failed")
        || message.contains("UnsatisfiedLinkError")
}

/// Parsed log entry for structured processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub tag: String,
    pub message: String,
    pub is_crash: bool,
}

impl LogEntry {
    pub fn parse(line: &str, log_regex: &Regex) -> Option<Self> {
        let caps = log_regex.captures(line)?;
        let field = |i| caps.get(i).map(|m| m.as_str()).unwrap_or("").trim().to_string();
        let (tag, message) = (field(5), field(6));
        let is_crash = is_rust_panic(&tag, &message) || is_native_crash(&tag, &message);

        Some(LogEntry {
            timestamp: field(1),
            level: field(4),
            tag,
            message,
            is_crash,
        })
    }

    pub fn is_relevant(&self) -> bool {
        self.is_crash || is_activity_line(&self.tag, &self.message)
    }

    fn print_formatted(&self) {
        if self.is_crash {
            println!(
                "{} {} {}: {}",
                self.timestamp.bright_black(),
                "CRASH".bright_red().bold(),
                self.tag.bright_red().bold(),
                self.message.bright_white()
            );
            return;
        }

        let level_badge = match self.level.as_str() {
            "V" => " V ".on_bright_black().black(),
            "D" => " D ".on_blue().white(),
            "I" => " I ".on_green().white(),
            "W" => " W ".on_yellow().black(),
            "E" => " E ".on_red().white(),
            "F" => " F ".on_red().white().bold(),
            other => format!(" {} ", other).on_white().black(),
        };
        let tag = if self.tag == LOG_TAG {
            self.tag.bright_cyan().bold()
        } else {
            self.tag.bright_black()
        };
        let message = if self.message.contains("dlopen failed") || self.message.contains("Error") {
            self.message.bright_red()
        } else {
            self.message.white()
        };

        println!("{} {} {} {}", self.timestamp.bright_black(), level_badge, tag, message);
    }
}

/// Options for the `logs` subcommand.
pub struct LogsOptions {
    pub lines: usize,
    pub level: LogLevel,
    pub follow: bool,
    pub crashes_only: bool,
    pub search: Option<String>,
}

impl LogsOptions {
    fn accepts(&self, entry: &LogEntry) -> bool {
        if !self.level.includes(&entry.level) || !entry.is_relevant() {
            return false;
        }
        if self.crashes_only && !entry.is_crash {
            return false;
        }
        match &self.search {
            Some(search) => {
                let search = search.to_lowercase();
                entry.message.to_lowercase().contains(&search) || entry.tag.to_lowercase().contains(&search)
            }
            None => true,
        }
    }
}

fn logcat_args(device_id: Option<&str>, dump: bool) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(id) = device_id {
        args.extend(["-s".to_string(), id.to_string()]);
    }
    args.extend(["logcat".to_string(), "-v".to_string(), "threadtime".to_string()]);
    if dump {
        args.push("-d".to_string());
    }
    args
}

/// Shows the activity's log output and any crashes around it.
pub async fn handle_logs(options: LogsOptions) -> Result<(), CliError> {
    let adb = crate::sdk::find_adb().ok_or(CliError::AdbNotFound)?;
    let device = crate::sdk::get_preferred_device(&adb);
    let device_id = device.as_ref().map(|d| d.id.as_str());
    let log_regex = Regex::new(THREADTIME_PATTERN)?;

    log::header(&format!("zenilib logcat ({})", LOG_TAG));
    if let Some(d) = &device {
        log::info(&format!("Device: {} ({})", d.model, d.id));
    }

    if options.follow {
        return stream(&adb, device_id, &log_regex, &options).await;
    }

    let output = Command::new(&adb).args(logcat_args(device_id, true)).output()?;
    let logs = String::from_utf8_lossy(&output.stdout);
    let entries: Vec<LogEntry> = logs
        .lines()
        .filter_map(|line| LogEntry::parse(line, &log_regex))
        .filter(|entry| options.accepts(entry))
        .collect();

    if entries.is_empty() {
        log::warning("No matching log entries found.");
        return Ok(());
    }

    let crashes = entries.iter().filter(|e| e.is_crash).count();
    if crashes > 0 {
        log::error(&format!("{} crash line(s) detected", crashes));
    }

    let skip = entries.len().saturating_sub(options.lines);
    for entry in &entries[skip..] {
        entry.print_formatted();
    }
    Ok(())
}

async fn stream(
    adb: &str,
    device_id: Option<&str>,
    log_regex: &Regex,
    options: &LogsOptions,
) -> Result<(), CliError> {
    let mut child = tokio::process::Command::new(adb)
        .args(logcat_args(device_id, false))
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let stdout = child.stdout.take().ok_or(CliError::NoLogcatOutput)?;
    let mut lines = BufReader::new(stdout).lines();

    log::step("Streaming logcat, press Ctrl+C to stop");
    while let Some(line) = lines.next_line().await? {
        if let Some(entry) = LogEntry::parse(&line, log_regex) {
            if options.accepts(&entry) {
                entry.print_formatted();
            }
        }
    }
    Ok(())
}
