use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Printed when no coverage file is given on the command line.
pub const USAGE: &str = "Usage: source2filename.py FILENAME";

#[derive(Parser, Debug)]
#[clap(author, version, about = "Resolves class filenames in a coverage XML report against its source roots, in place.", long_about = None)]
pub struct Cli {
    /// Coverage XML file to rewrite in place
    pub coverage_file: Option<PathBuf>,

    /// Extra positional arguments are accepted and ignored.
    #[clap(hide = true)]
    pub ignored: Vec<OsString>,

    /// Write a verbose progress log to this file (truncated on every run).
    #[clap(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Write through a temporary file and rename it over the report, so a
    /// failed write never truncates the original.
    #[clap(long)]
    pub atomic: bool,
}
