use std::error::Error as StdError;

use thiserror::Error;

/// The crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// A split was requested at a point that is not strictly inside the segment.
    #[error("split point {at:.3}s must lie strictly inside [{start:.3}s, {end:.3}s]")]
    InvalidSplitPoint { at: f64, start: f64, end: f64 },

    #[error("segment not found")]
    SegmentNotFound,

    #[error("no segment is selected")]
    NoSelection,

    #[error("no audio is loaded")]
    NoMedia,

    #[error("document has no save path")]
    NoSavePath,

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Whether this error came from user input rather than I/O or decoding.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSplitPoint { .. }
                | Self::SegmentNotFound
                | Self::NoSelection
                | Self::NoMedia
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Other(Box::new(err.error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_error_reports_bounds() {
        let err = Error::InvalidSplitPoint {
            at: 5.0,
            start: 1.0,
            end: 2.5,
        };
        assert_eq!(
            err.to_string(),
            "split point 5.000s must lie strictly inside [1.000s, 2.500s]"
        );
        assert!(err.is_user_error());
    }

    #[test]
    fn io_errors_are_not_user_errors() {
        let err: Error = std::io::Error::other("disk full").into();
        assert!(!err.is_user_error());
        assert_eq!(err.to_string(), "disk full");
    }
}
