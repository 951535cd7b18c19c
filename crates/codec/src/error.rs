use std::fmt;
use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Sticky state of a data stream; once it leaves `Ok` every later operation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Ok,
    /// The stream ended in the middle of a value
    ReadPastEnd,
    /// A value was read but makes no sense (bad UTF-8, negative count, oversized length)
    ReadCorruptData,
    /// The underlying writer refused bytes
    WriteFailed,
}

impl StreamStatus {
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::ReadPastEnd => "read past end",
            Self::ReadCorruptData => "corrupt data",
            Self::WriteFailed => "write failed",
        };
        f.write_str(text)
    }
}

/// Errors that can occur while encoding or decoding a transcript
#[derive(Error, Debug)]
pub enum CodecError {
    /// The data stream reported a bad state
    #[error("Stream error: {0}")]
    Stream(StreamStatus),

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// Role label not produced by any known format version
    #[error("Unknown role label: {0:?}")]
    UnknownRole(String),

    #[error("{what} exceeds limit: {actual} > {limit}")]
    LimitExceeded {
        what: &'static str,
        limit: usize,
        actual: usize,
    },

    /// Entry would trip an encoder precondition
    #[error("Entry {index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
