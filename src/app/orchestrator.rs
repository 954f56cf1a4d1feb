//! Main application orchestrator.
//!
//! Coordinates one rewrite of a coverage report:
//! 1. Checks that a report path was given.
//! 2. Initializes the verbose log if `--log-file` was passed.
//! 3. Validates the input path.
//! 4. Delegates load, resolution and write to `processing::convert_source`,
//!    with warnings going to stdout.
//! 5. Logs a summary and flushes the log.

use super::cli::Cli;
use super::error::AppError;
use super::file_handler::{self, WriteMode};
use super::logger;
use super::processing;
use super::{verbose_eprintln, verbose_println}; // Macros for conditional logging.
use std::io;

/// Runs the main application logic based on parsed command-line arguments.
///
/// # Errors
/// Returns `AppError::Usage` when no report was given, otherwise any
/// unrecoverable load, structure or write error from the rewrite.
pub fn run_app(cli: Cli) -> Result<(), AppError> {
    let Some(coverage_file_path) = cli.coverage_file else {
        return Err(AppError::Usage);
    };
    let quiet_mode = cli.log_file.is_none();

    if let Some(log_file_path) = &cli.log_file {
        if let Err(e) = logger::init_global_logger(log_file_path) {
            // The rewrite still runs, just without the log.
            eprintln!(
                "Warning: Failed to initialize verbose logger ({}): {}. Verbose file logging will be unavailable.",
                log_file_path.display(),
                e
            );
        } else {
            verbose_println!(
                quiet_mode,
                "Verbose logging initialized to {}",
                log_file_path.display()
            );
        }
    }

    verbose_println!(
        quiet_mode,
        "============================================================"
    );
    verbose_println!(
        quiet_mode,
        "Processing File: {}",
        coverage_file_path.display()
    );
    verbose_println!(
        quiet_mode,
        "============================================================"
    );

    let write_mode = if cli.atomic {
        WriteMode::Atomic
    } else {
        WriteMode::Truncate
    };

    let result = file_handler::validate_coverage_file(&coverage_file_path, quiet_mode).and_then(|()| {
        let stdout = io::stdout();
        let mut warnings = stdout.lock();
        processing::convert_source(&coverage_file_path, write_mode, quiet_mode, &mut warnings)
    });

    match &result {
        Ok(summary) => {
            verbose_println!(
                quiet_mode,
                "\n[INFO] {} package(s): {} class(es) resolved, {} removed.",
                summary.packages,
                summary.resolved,
                summary.removed
            );
        }
        Err(e) => {
            verbose_eprintln!(quiet_mode, "Rewrite of {} failed: {}", coverage_file_path.display(), e);
        }
    }

    if !quiet_mode {
        if let Err(e) = logger::flush_global_logger() {
            eprintln!("[WARNING] Failed to perform final flush of the verbose log: {}", e);
        }
    }

    result.map(|_| ())
}
