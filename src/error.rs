//! Error types for samio

use thiserror::Error;

/// Result type alias for samio operations
pub type Result<T> = std::result::Result<T, SamBamError>;

/// Error types that can occur while parsing or querying SAM/BAM data
#[derive(Debug, Error)]
pub enum SamBamError {
    /// I/O error (missing or unreadable file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally invalid SAM content
    #[error("Invalid SAM format: {msg}")]
    InvalidSamFormat {
        /// Error message
        msg: String,
    },

    /// Structurally invalid BAM stream
    #[error("Invalid BAM format: {0}")]
    InvalidBamFormat(String),

    /// BGZF/gzip decompression error
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Malformed CIGAR string
    #[error("Invalid CIGAR: {0}")]
    InvalidCigar(String),

    /// Reference sequence access outside the provided bounds
    #[error("Reference access out of bounds: {0}")]
    ReferenceOutOfBounds(String),

    /// File extension not recognized by `parse_file`
    #[error("Unsupported file extension: {0}")]
    UnsupportedFormat(String),
}
