// shared/src/lib.rs

use std::fmt::Display;

/// Boxed error returned by caller-supplied compute functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Key absent or expired in the backend.
    #[error("not found")]
    NotFound,
    /// Stored bytes do not parse as the requested type.
    #[error("decoding: {0}")]
    Decoding(#[source] serde_json::Error),
    /// Value could not be serialized; nothing was written.
    #[error("encoding: {0}")]
    Encoding(#[source] serde_json::Error),
    /// Transport, protocol or connection failure reported by a backend.
    #[error("backend: {0}")]
    Backend(String),
    /// Error returned by a compute function, kept as the source.
    #[error("compute: {0}")]
    Compute(#[source] BoxError),
}

impl Error {
    pub fn backend(err: impl Display) -> Self {
        Error::Backend(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, Error::Backend(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, thiserror::Error)]
    #[error("db down")]
    struct DbDown;

    #[test]
    fn test_compute_error_keeps_source() {
        let err = Error::Compute(Box::new(DbDown));
        assert_eq!(err.to_string(), "compute: db down");

        let source = err.source().expect("compute error has a source");
        assert!(source.downcast_ref::<DbDown>().is_some());
    }

    #[test]
    fn test_kind_predicates() {
        assert!(Error::NotFound.is_not_found());
        assert!(!Error::NotFound.is_backend());

        let err = Error::backend("connection refused");
        assert!(err.is_backend());
        assert_eq!(err.to_string(), "backend: connection refused");
    }

    #[test]
    fn test_codec_errors_are_distinct() {
        let bad = serde_json::from_slice::<u32>(b"{").unwrap_err();
        let err = Error::Decoding(bad);
        assert!(matches!(err, Error::Decoding(_)));
        assert!(!err.is_not_found());
    }
}
