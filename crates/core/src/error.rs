//! Error types for slide extraction and script generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a presentation into a script.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file does not exist.
    #[error("The file '{}' does not exist.", .0.display())]
    NotFound(PathBuf),

    /// The document loader failed to process the file.
    #[error("Failed to load file. Error: {0}")]
    Extraction(String),

    /// Extraction finished but no page-tagged text was found.
    #[error("No content extracted.")]
    EmptyResult,

    /// Malformed intermediate data handed to a pipeline step.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Every slide entry was rejected while building the context.
    #[error("No valid content for context.")]
    NoValidContent,

    /// The remote model call failed for any reason.
    #[error("Script generation failed. Error: {0}")]
    Generation(String),

    /// An environment or command-line setting has an unusable value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to open or read a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),
}
