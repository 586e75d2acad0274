//! Error types for the slidemark pipeline.
//!
//! Parsing and text surgery never fail: they log and degrade. These errors
//! cover file I/O, configuration loading, and export.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading configuration or exporting a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read, or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A JSON document (brand configuration, state file) could not be read or written.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// ZIP archive error (PPTX and bundle output).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML serialization error (PPTX output).
    #[error("XML error: {0}")]
    XmlError(String),

    /// An asset referenced by the deck could not be loaded.
    #[error("Asset error: {0}")]
    AssetError(String),

    /// Export of the presentation failed.
    #[error("Export error: {0}")]
    ExportError(String),
}
