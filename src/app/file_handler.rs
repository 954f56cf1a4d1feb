//! Provides utility functions for the file system operations around a
//! coverage report: validating the input path and writing the rewritten
//! report back over it.
//!
//! It uses macros from the parent `app` module for verbose logging.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Error as IoError, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::error::AppError;
use super::verbose_eprintln;

/// How the rewritten report replaces the original file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate the file and write in place. A failure midway can leave the
    /// report empty or cut short.
    Truncate,
    /// Write a sibling temporary file, then rename it over the report.
    Atomic,
}

/// Validates that the given path exists and points to a regular file.
///
/// # Errors
/// Returns `AppError::InvalidPath` if the path is missing or not a file.
pub fn validate_coverage_file(coverage_file_path: &Path, quiet_mode: bool) -> Result<(), AppError> {
    if !coverage_file_path.exists() {
        let error_msg = format!("File not found: {}", coverage_file_path.display());
        verbose_eprintln!(quiet_mode, "Input Error: {}", error_msg);
        return Err(AppError::InvalidPath(error_msg));
    }
    if !coverage_file_path.is_file() {
        let error_msg = format!("Path is not a file: {}", coverage_file_path.display());
        verbose_eprintln!(quiet_mode, "Input Error: {}", error_msg);
        return Err(AppError::InvalidPath(error_msg));
    }
    Ok(())
}

/// Writes the serialized report to `file_path` using the given mode.
pub fn write_report(file_path: &Path, content: &str, mode: WriteMode) -> Result<(), AppError> {
    match mode {
        WriteMode::Truncate => write_content_to_file(file_path, content).map_err(AppError::Io),
        WriteMode::Atomic => write_content_atomically(file_path, content),
    }
}

/// Writes string content to a specified file, creating or overwriting it.
///
/// The file is truncated first, then the whole content is written through a
/// `BufWriter` and flushed before returning.
///
/// # Errors
/// Returns an `IoError` if any file operation (opening, writing, flushing) fails.
pub fn write_content_to_file(file_path: &Path, content: &str) -> Result<(), IoError> {
    let file = OpenOptions::new()
        .create(true) // Create if it doesn't exist.
        .write(true) // Open for writing.
        .truncate(true) // Truncate to 0 bytes if it exists.
        .open(file_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Writes content to a temporary file in the target's directory and renames
/// it over the target. The target keeps its permissions.
///
/// # Errors
/// Returns `AppError::Io` for create/write failures and `AppError::Persist`
/// when the final rename fails. The original file is untouched in both cases.
pub fn write_content_atomically(file_path: &Path, content: &str) -> Result<(), AppError> {
    let directory = match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(directory)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file_mut());
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
    }
    if let Ok(metadata) = fs::metadata(file_path) {
        temp_file.as_file().set_permissions(metadata.permissions())?;
    }
    temp_file.as_file().sync_all()?;
    temp_file.persist(file_path)?;
    Ok(())
}
