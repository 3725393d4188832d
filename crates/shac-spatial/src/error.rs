//! Error types for the spatial rendering crate.

use thiserror::Error;

/// Errors that can occur while rotating or rendering an ambisonic field.
///
/// A render error only affects the call that produced it; scene rendering
/// collects them per layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The channel count is not `(order + 1)²` for any order.
    #[error("channel count {0} is not (order + 1)² for any ambisonic order")]
    ChannelCountMismatch(usize),

    /// Every channel is empty.
    #[error("ambisonic field has no samples")]
    EmptyAudio,

    /// Channels differ in length.
    #[error("channel {channel} has {got} samples, expected {expected}")]
    RaggedChannels {
        /// Index of the first channel whose length differs from channel 0.
        channel: usize,
        /// Length of channel 0.
        expected: usize,
        /// Length of the offending channel.
        got: usize,
    },
}

/// Convenience Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
