//! Handles the core logic of rewriting a coverage report.
//!
//! Every `class` element's `filename` is joined onto each `source` root in
//! turn; the last root under which a regular file exists wins and replaces
//! the attribute. Classes that resolve nowhere are reported on the warning
//! sink and dropped from their `classes` parent.

use super::error::AppError;
use super::file_handler::{self, WriteMode};
use super::{verbose_eprintln, verbose_println}; // Macros for conditional logging.
use crate::report::{self, Document, Element};
use crate::report_loader;
use std::io::Write;
use std::path::Path;

const SOURCES: &str = "sources";
const PACKAGES: &str = "packages";
const CLASSES: &str = "classes";
const FILENAME: &str = "filename";

/// Counters gathered while resolving one report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSummary {
    pub packages: usize,
    pub resolved: usize,
    pub removed: usize,
}

/// Rewrites the coverage report at `coverage_file_path` in place.
///
/// Loads the report, resolves every class filename against the source
/// roots, serializes the result pretty-printed and writes it back. One
/// warning line per dropped class goes to `warnings`.
///
/// # Errors
/// Any read, parse, structure or write failure is returned as is; nothing
/// is retried. With `WriteMode::Truncate` a failed write can leave the file
/// truncated.
pub fn convert_source(
    coverage_file_path: &Path,
    write_mode: WriteMode,
    quiet_mode: bool,
    warnings: &mut dyn Write,
) -> Result<ResolutionSummary, AppError> {
    let mut document = load_report(coverage_file_path, quiet_mode)?;

    verbose_println!(quiet_mode, "\n[STEP 2] Resolving class filenames...");
    let summary = resolve_classes(&mut document, quiet_mode, warnings)?;

    verbose_println!(quiet_mode, "\n[STEP 3] Writing report...");
    let content = report::to_pretty_string(&document);
    file_handler::write_report(coverage_file_path, &content, write_mode)?;
    verbose_println!(
        quiet_mode,
        "   => Wrote {} bytes to {}",
        content.len(),
        coverage_file_path.display()
    );

    Ok(summary)
}

/// Loads the report from disk.
pub fn load_report(coverage_file_path: &Path, quiet_mode: bool) -> Result<Document, AppError> {
    verbose_println!(quiet_mode, "\n[STEP 1] Loading coverage report...");
    let document = report_loader::load_report_from_file(coverage_file_path).map_err(|e| {
        verbose_eprintln!(quiet_mode, "   [ERROR] {}", e);
        AppError::from(e)
    })?;
    verbose_println!(quiet_mode, "   => Root element <{}>", document.root.name);
    Ok(document)
}

/// Returns the text of every `source` element, in document order.
///
/// # Errors
/// `AppError::Structure` when `sources` is missing or a `source` has no text.
pub fn collect_source_roots(document: &Document) -> Result<Vec<String>, AppError> {
    let sources = required_child(&document.root, SOURCES)?;
    sources
        .child_elements()
        .map(|source| {
            source.text().map(str::to_string).ok_or_else(|| {
                AppError::Structure(format!("<{}> element has no directory text", source.name))
            })
        })
        .collect()
}

/// Checks the whole layout before anything is probed or written: `sources`
/// and `packages` under the root, `classes` under every package, a
/// `filename` on every class and text in every source.
pub fn validate_structure(document: &Document) -> Result<(), AppError> {
    collect_source_roots(document)?;
    let packages = required_child(&document.root, PACKAGES)?;
    for package in packages.child_elements() {
        let classes = required_child(package, CLASSES)?;
        for class in classes.child_elements() {
            if class.attribute(FILENAME).is_none() {
                return Err(AppError::Structure(format!(
                    "<{}> element without a '{}' attribute in <{}>",
                    class.name, FILENAME, package.name
                )));
            }
        }
    }
    Ok(())
}

/// Resolves a relative filename against the roots.
///
/// Every root is probed; the last one under which `root + "/" + filename`
/// is a regular file wins. Returns `None` if no root matches.
pub fn resolve_class_filename(roots: &[String], filename: &str) -> Option<String> {
    let mut resolved = None;
    for root in roots {
        let candidate = format!("{}/{}", root, filename);
        if Path::new(&candidate).is_file() {
            resolved = Some(candidate);
        }
    }
    resolved
}

/// Rewrites or removes every class of every package, in document order.
///
/// # Errors
/// `AppError::Structure` if the layout is incomplete (checked before any
/// change is made), `AppError::Io` if a warning cannot be written.
pub fn resolve_classes(
    document: &mut Document,
    quiet_mode: bool,
    warnings: &mut dyn Write,
) -> Result<ResolutionSummary, AppError> {
    validate_structure(document).map_err(|e| {
        verbose_eprintln!(quiet_mode, "   [ERROR] {}", e);
        e
    })?;
    let roots = collect_source_roots(document)?;
    verbose_println!(quiet_mode, "   => {} source root(s)", roots.len());

    let mut summary = ResolutionSummary::default();
    let mut write_error = None;

    let packages = required_child_mut(&mut document.root, PACKAGES)?;
    for package in packages.child_elements_mut() {
        summary.packages += 1;
        let classes = required_child_mut(package, CLASSES)?;
        classes.retain_child_elements(|class| {
            let Some(original) = class.attribute(FILENAME).map(str::to_string) else {
                return true;
            };
            match resolve_class_filename(&roots, &original) {
                Some(resolved) => {
                    verbose_println!(quiet_mode, "   {} -> {}", original, resolved);
                    class.set_attribute(FILENAME, resolved);
                    summary.resolved += 1;
                    true
                }
                None => {
                    if write_error.is_none() {
                        if let Err(e) = writeln!(
                            warnings,
                            "Warning: File {} not found in all sources; removing from sources.",
                            original
                        ) {
                            write_error = Some(e);
                        }
                    }
                    verbose_println!(quiet_mode, "   {} -> removed", original);
                    summary.removed += 1;
                    false
                }
            }
        });
    }

    if let Some(e) = write_error {
        return Err(AppError::Io(e));
    }
    Ok(summary)
}

fn required_child<'a>(parent: &'a Element, name: &str) -> Result<&'a Element, AppError> {
    parent.find(name).ok_or_else(|| missing_child(&parent.name, name))
}

fn required_child_mut<'a>(parent: &'a mut Element, name: &str) -> Result<&'a mut Element, AppError> {
    let parent_name = parent.name.clone();
    parent.find_mut(name).ok_or_else(|| missing_child(&parent_name, name))
}

fn missing_child(parent: &str, name: &str) -> AppError {
    AppError::Structure(format!("<{}> has no <{}> child element", parent, name))
}
