//! Error types for the configuration module

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A generic error with a message
    #[error("Error: {0}")]
    Generic(String),

    /// An error that occurred during parsing
    #[error("Parse error: {0}")]
    ParseError(String),

    /// An error that occurred while reading or writing a configuration file
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}
