use crate::error::{CodecError, Result};
use std::fmt;

/// First version that stores citations, as formatted reference lines plus bodies
pub const LEGACY_SOURCES_VERSION: u32 = 3;

/// First version that stores citations as structured records
pub const STRUCTURED_SOURCES_VERSION: u32 = 8;

/// First version that stores prompt attachments and drops the duplicated prompt string
pub const ATTACHMENTS_VERSION: u32 = 10;

/// Newest layout this codec knows how to write
pub const LATEST_FORMAT_VERSION: u32 = ATTACHMENTS_VERSION;

/// How a format version stores citation records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    None,
    Legacy,
    Structured,
}

/// A caller-supplied transcript format version (always >= 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion(u32);

impl FormatVersion {
    pub const LATEST: Self = Self(LATEST_FORMAT_VERSION);

    pub fn new(version: u32) -> Result<Self> {
        if version == 0 {
            return Err(CodecError::UnsupportedVersion(version));
        }
        Ok(Self(version))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn source_encoding(self) -> SourceEncoding {
        if self.0 >= STRUCTURED_SOURCES_VERSION {
            SourceEncoding::Structured
        } else if self.0 >= LEGACY_SOURCES_VERSION {
            SourceEncoding::Legacy
        } else {
            SourceEncoding::None
        }
    }

    #[must_use]
    pub const fn has_attachments(self) -> bool {
        self.0 >= ATTACHMENTS_VERSION
    }

    /// Older layouts carry a second copy of the prompt text, unused today
    #[must_use]
    pub const fn has_deprecated_prompt(self) -> bool {
        self.0 < ATTACHMENTS_VERSION
    }
}

impl TryFrom<u32> for FormatVersion {
    type Error = CodecError;

    fn try_from(version: u32) -> Result<Self> {
        Self::new(version)
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> FormatVersion {
        FormatVersion::new(n).unwrap()
    }

    #[test]
    fn zero_is_rejected() {
        assert!(matches!(
            FormatVersion::new(0),
            Err(CodecError::UnsupportedVersion(0))
        ));
    }

    #[test]
    fn thresholds_select_layout() {
        assert_eq!(v(1).source_encoding(), SourceEncoding::None);
        assert_eq!(v(2).source_encoding(), SourceEncoding::None);
        assert_eq!(v(3).source_encoding(), SourceEncoding::Legacy);
        assert_eq!(v(7).source_encoding(), SourceEncoding::Legacy);
        assert_eq!(v(8).source_encoding(), SourceEncoding::Structured);
        assert_eq!(v(12).source_encoding(), SourceEncoding::Structured);

        assert!(v(9).has_deprecated_prompt());
        assert!(!v(9).has_attachments());
        assert!(!v(10).has_deprecated_prompt());
        assert!(v(10).has_attachments());
    }
}
