//! Configuration for the digest pipeline.
//!
//! [`PipelineConfig`] is passed by value into [`crate::Pipeline`]; there is
//! no process-wide state.
//!
//! # Example
//!
//! ```
//! use blocksum::PipelineConfig;
//!
//! let config = PipelineConfig::default()
//!     .with_block_size(64 * 1024)
//!     .with_concurrency(4);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.window(), 4);
//! # Ok::<(), blocksum::DigestError>(())
//! ```

use std::num::NonZeroUsize;
use std::thread;

use crate::error::DigestError;

/// Default block size (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;

/// Largest accepted block size (1 GiB).
pub const MAX_BLOCK_SIZE: usize = 1 << 30;

/// Concurrency used when the host parallelism cannot be queried.
pub const FALLBACK_CONCURRENCY: usize = 1;

/// Largest accepted number of digest workers.
pub const MAX_CONCURRENCY: usize = 1024;

/// Largest accepted reorder window. Queues are allocated at window capacity
/// up front.
pub const MAX_WINDOW: usize = 64 * 1024;

/// Returns the number of workers to use by default: the host's available
/// parallelism, capped at [`MAX_CONCURRENCY`].
pub fn default_concurrency() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_CONCURRENCY)
        .min(MAX_CONCURRENCY)
}

/// Configuration for a digest run.
///
/// - `block_size`: bytes per block; the last block may be shorter.
/// - `concurrency`: number of digest workers.
/// - `window`: maximum number of blocks dispatched but not yet written.
///   Bounds every queue and the reorder buffer. Defaults to `concurrency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineConfig {
    block_size: usize,
    concurrency: usize,
    window: Option<usize>,
}

impl PipelineConfig {
    /// Creates a validated configuration.
    pub fn new(block_size: usize, concurrency: usize) -> Result<Self, DigestError> {
        let config = Self {
            block_size,
            concurrency,
            window: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the block size.
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the number of digest workers.
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    /// Sets the reorder window.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    /// Returns the block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of digest workers.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the reorder window.
    pub fn window(&self) -> usize {
        self.window.unwrap_or(self.concurrency)
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), DigestError> {
        if self.block_size == 0 {
            return Err(DigestError::InvalidConfig {
                message: "block size must be non-zero",
            });
        }

        if self.block_size > MAX_BLOCK_SIZE {
            return Err(DigestError::InvalidConfig {
                message: "block size exceeds MAX_BLOCK_SIZE",
            });
        }

        if self.concurrency == 0 {
            return Err(DigestError::InvalidConfig {
                message: "concurrency must be non-zero",
            });
        }

        if self.concurrency > MAX_CONCURRENCY {
            return Err(DigestError::InvalidConfig {
                message: "concurrency exceeds MAX_CONCURRENCY",
            });
        }

        if self.window == Some(0) {
            return Err(DigestError::InvalidConfig {
                message: "window must be non-zero",
            });
        }

        if self.window() > MAX_WINDOW {
            return Err(DigestError::InvalidConfig {
                message: "window exceeds MAX_WINDOW",
            });
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            concurrency: default_concurrency(),
            window: None,
        }
    }
}
