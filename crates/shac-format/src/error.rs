//! Error types for the SHAC format crate.

use thiserror::Error;

/// Errors that can occur when parsing, decoding or writing SHAC buffers.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Invalid magic bytes: expected SHAC (0x53484143)")]
    BadMagic,

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("Truncated buffer: {what} needs bytes {offset}..{end}, buffer has {len}")]
    Truncated {
        what: &'static str,
        offset: u64,
        end: u64,
        len: u64,
    },

    #[error("Unsupported bit depth: {0} (must be 16 or 32)")]
    UnsupportedBitDepth(u32),

    #[error("Channel count {channels} does not match ambisonic order {order} (expected {expected})")]
    ChannelCount {
        order: u16,
        channels: u16,
        expected: u64,
    },

    #[error("Invalid UTF-8 in layer identifier: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Invalid layer '{id}': {reason}")]
    LayerShape { id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormatError {
    /// Build a [`FormatError::Truncated`] for a byte range that does not fit.
    pub(crate) fn truncated(what: &'static str, offset: u64, end: u64, len: usize) -> Self {
        Self::Truncated {
            what,
            offset,
            end,
            len: len as u64,
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
