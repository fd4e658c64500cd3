//! Error types for blocksum.

use std::io;

use thiserror::Error;

/// Errors that can occur while digesting a stream.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The input source failed mid-stream (distinct from end-of-stream).
    #[error("read error: {0}")]
    Read(#[source] io::Error),

    /// The output sink failed.
    #[error("write error: {0}")]
    Write(#[source] io::Error),

    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// A pipeline thread could not be started.
    #[error("failed to spawn {stage} thread: {source}")]
    Spawn {
        /// Name of the stage being started.
        stage: &'static str,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A pipeline thread panicked.
    #[error("{stage} thread panicked")]
    WorkerPanicked {
        /// Name of the stage whose thread panicked.
        stage: &'static str,
    },

    /// A result arrived for a sequence number that was already released or
    /// is already pending.
    #[error("duplicate result for block {sequence}")]
    DuplicateBlock {
        /// The offending sequence number.
        sequence: u64,
    },

    /// The result stream ended while a lower sequence number was still
    /// outstanding.
    #[error("result stream ended without block {sequence}")]
    MissingBlock {
        /// The first sequence number that never arrived.
        sequence: u64,
    },
}

impl DigestError {
    /// Returns true for failures of the input source.
    pub fn is_read(&self) -> bool {
        matches!(self, DigestError::Read(_))
    }

    /// Returns true for failures of the output sink.
    pub fn is_write(&self) -> bool {
        matches!(self, DigestError::Write(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_read_error_keeps_source() {
        let err = DigestError::Read(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(err.is_read());
        assert!(!err.is_write());
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("read error"));
    }

    #[test]
    fn test_display() {
        let err = DigestError::MissingBlock { sequence: 7 };
        assert_eq!(err.to_string(), "result stream ended without block 7");

        let err = DigestError::WorkerPanicked { stage: "digest" };
        assert!(err.to_string().contains("panicked"));
    }
}
