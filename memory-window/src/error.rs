//! Errors from window construction and lookup.

use thiserror::Error;

/// Raised when a [`crate::sliding_window::SlidingWindow`] is configured
/// with an invalid `(window_size, processing_delay)` pair.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WindowConfigError {
    /// `window_size` must be at least 2.
    #[error("window_size must be >= 2, got {0}")]
    WindowTooSmall(u64),
    /// `window_size` must exceed `processing_delay`.
    #[error("window_size ({window_size}) must exceed processing_delay ({processing_delay})")]
    DelayNotLessThanWindow {
        /// Configured window size.
        window_size: u64,
        /// Configured processing delay.
        processing_delay: u64,
    },
}
