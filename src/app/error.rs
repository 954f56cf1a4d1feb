use thiserror::Error;

// Custom Application Error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{}", super::cli::USAGE)]
    Usage,
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report loading error: {0}")]
    ReportLoad(#[from] crate::report_loader::ReportLoaderError),
    #[error("Malformed coverage report: {0}")]
    Structure(String),
    #[error("Failed to replace report: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Invalid file path: {0}")]
    InvalidPath(String),
}
