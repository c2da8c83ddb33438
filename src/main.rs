//! Command‑line interface for zenilib Android packages.
//!
//! The activity library loads the engine's native libraries in a fixed order
//! before handing the asset manager to native code. This tool shows that order,
//! checks that a packaged `jniLibs/<abi>` directory satisfies it, prints the
//! manifest entry for the activity, and follows the activity's logcat output.

mod logcat;
mod package;
mod sdk;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use thiserror::Error;
use zenilib_activity::{LIBRARIES, LoadPlan, NativeLibrary};

use crate::logcat::{LogLevel, LogsOptions};

/// zenidroid top‑level arguments.
#[derive(Parser)]
#[command(name = "zenidroid", version, about = "Developer tools for zenilib Android NativeActivity packages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands supported by the CLI.
#[derive(Subcommand)]
enum Commands {
    /// Print the native library load order.
    Libs {
        /// Use the full engine chain instead of the default plan.
        #[arg(long)]
        engine: bool,
        /// Include libraries that are never loaded.
        #[arg(long)]
        all: bool,
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Check that a jniLibs/<abi> directory contains every library in load order.
    Check {
        /// Directory holding the packaged `.so` files.
        dir: PathBuf,
        /// Check against the full engine chain.
        #[arg(long)]
        engine: bool,
    },
    /// Print the AndroidManifest.xml entry for the activity.
    Manifest {
        /// Application package name.
        #[arg(long, default_value = "com.zenilib.app")]
        package: String,
    },
    /// Show the activity's logs and crashes from a connected device.
    Logs {
        /// Number of lines to show.
        #[arg(long, default_value_t = 100)]
        lines: usize,
        /// Minimum log level to display (verbose, debug, info, warn, error).
        #[arg(long, default_value = "info")]
        level: LogLevel,
        /// Follow log output in real-time (like tail -f).
        #[arg(long, short = 'f')]
        follow: bool,
        /// Show only crash-related lines.
        #[arg(long)]
        crashes: bool,
        /// Search for specific text in log messages.
        #[arg(long, short = 's')]
        search: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("adb not found. Make sure Android SDK platform-tools is installed and accessible.")]
    AdbNotFound,
    #[error("failed to capture logcat output")]
    NoLogcatOutput,
    #[error("`{}` is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("missing {file} ({position} of {total} in load order); loading would abort here")]
    MissingLibrary {
        file: String,
        position: usize,
        total: usize,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Libs { engine, all, json } => handle_libs(engine, all, json),
        Commands::Check { dir, engine } => handle_check(dir, engine),
        Commands::Manifest { package } => {
            print!("{}", package::render_manifest(&package));
            Ok(())
        }
        Commands::Logs { lines, level, follow, crashes, search } => {
            logcat::handle_logs(LogsOptions {
                lines,
                level,
                follow,
                crashes_only: crashes,
                search,
            })
            .await
        }
    };

    if let Err(e) = result {
        log::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Colored logging helpers for consistent CLI output
mod log {
    use colored::*;

    pub fn info(msg: &str) {
        println!("{}", msg.bright_blue());
    }

    pub fn success(msg: &str) {
        println!("{}", msg.bright_green());
    }

    pub fn warning(msg: &str) {
        println!("{}", msg.bright_yellow());
    }

    pub fn error(msg: &str) {
        eprintln!("{}", msg.bright_red());
    }

    pub fn step(msg: &str) {
        println!("{} {}", "→".bright_cyan(), msg.bright_white());
    }

    pub fn header(msg: &str) {
        println!("{}", msg.bright_cyan().bold());
    }
}

/// Libraries to list: the enabled plan, or every known library with `all`.
fn listed_libraries(engine: bool, all: bool) -> Vec<NativeLibrary> {
    if all {
        LIBRARIES.to_vec()
    } else {
        LoadPlan::enabled(engine).libraries().to_vec()
    }
}

fn handle_libs(engine: bool, all: bool, json: bool) -> Result<(), CliError> {
    let libraries = listed_libraries(engine, all);

    if json {
        println!("{}", serde_json::to_string_pretty(&libraries)?);
        return Ok(());
    }

    log::header("Native library load order");
    for (index, library) in libraries.iter().enumerate() {
        let line = format!(
            "{:>2}. {:<16} {:<12} {:?}",
            index + 1,
            library.file_name(),
            format!("{:?}", library.stage),
            library.availability
        );
        if library.is_enabled(engine) {
            println!("{}", line.bright_white());
        } else {
            println!("{}", line.bright_black());
        }
    }
    Ok(())
}

fn handle_check(dir: PathBuf, engine: bool) -> Result<(), CliError> {
    let plan = LoadPlan::enabled(engine);
    log::step(&format!("Checking {} against {} libraries", dir.display(), plan.len()));

    let report = package::check_directory(&dir, &plan)?;
    for file in &report.present {
        log::info(&format!("  ✓ {}", file));
    }
    for file in &report.unexpected {
        log::warning(&format!("  ? {} is not part of the load plan", file));
    }

    match report.missing {
        Some(missing) => Err(CliError::MissingLibrary {
            file: missing.file,
            position: missing.position,
            total: missing.total,
        }),
        None => {
            log::success(&format!("All {} libraries present", plan.len()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listed_libraries() {
        assert_eq!(listed_libraries(false, false).len(), 1);
        assert_eq!(listed_libraries(true, false).len(), 12);
        assert_eq!(listed_libraries(false, true).len(), LIBRARIES.len());
    }

    #[test]
    fn test_libs_json_without_direct_serde() {
        let json = serde_json::to_value(listed_libraries(false, false)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "name": "application", "stage": "application", "availability": "always" }])
        );
    }

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from(["zenidroid", "check", "app/src/main/jniLibs/arm64-v8a", "--engine"]).unwrap();
        match cli.command {
            Commands::Check { dir, engine } => {
                assert_eq!(dir, PathBuf::from("app/src/main/jniLibs/arm64-v8a"));
                assert!(engine);
            }
            _ => panic!("expected check"),
        }
    }
}
