// src/error.rs

//! Error types for stockpot
//!
//! Every stage of a cook maps its failures onto one of four categories
//! (configuration, preparation, build, packaging). The remaining variants
//! are low-level failures that stages either wrap or surface verbatim.

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Unsupported option, platform or compiler combination. Raised before
    /// any source is fetched.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A mandatory patch target was missing, or the source could not be
    /// fetched or unpacked.
    #[error("Preparation error: {0}")]
    PreparationError(String),

    /// The generator or build tool failed.
    #[error("Build error: {0}")]
    BuildError(String),

    /// An expected artifact was not produced by the build.
    #[error("Packaging error: {0}")]
    PackagingError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Short name of the failure category, used in CLI output
    pub fn category(&self) -> &'static str {
        match self {
            Error::ConfigurationError(_) => "configuration",
            Error::PreparationError(_)
            | Error::DownloadError(_)
            | Error::ChecksumMismatch { .. } => "preparation",
            Error::BuildError(_) => "build",
            Error::PackagingError(_) => "packaging",
            Error::IoError(_) | Error::ParseError(_) | Error::NotFound(_) => "internal",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category() {
        assert_eq!(Error::ConfigurationError("x".into()).category(), "configuration");
        assert_eq!(Error::DownloadError("x".into()).category(), "preparation");
        assert_eq!(Error::BuildError("x".into()).category(), "build");
        assert_eq!(Error::PackagingError("x".into()).category(), "packaging");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::IoError(ref m) if m.contains("gone")));
    }
}
