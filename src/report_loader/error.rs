use thiserror::Error;

//─────────────────────────────────────────────────────────────────────────────

/// Error type for coverage report loading.
/// Covers everything that can go wrong between the path on disk and a
/// complete in-memory `report::Document`.
#[derive(Error, Debug)]
pub enum ReportLoaderError {
    /// Error when reading the report file.
    #[error("Failed to read file '{0}': {1}")]
    ReadFile(String, std::io::Error),

    /// Error when the bytes are not valid in the report's encoding.
    #[error("Failed to decode '{0}' as {1}")]
    Decode(String, &'static str),

    /// Error when the file content is not well-formed XML.
    #[error("Failed to parse coverage XML from '{0}': {1}")]
    ParseXml(String, roxmltree::Error),
}
