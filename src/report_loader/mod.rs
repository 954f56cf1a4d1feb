// error module
pub mod error;
// loader module
mod loader;

pub use error::ReportLoaderError;
pub use loader::load_report_from_file;
#[cfg(test)]
pub use loader::parse_report;
