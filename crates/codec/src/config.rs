use serde::{Deserialize, Serialize};

/// Bounds applied while decoding, so a corrupt length prefix fails instead of allocating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum number of entries in one transcript
    pub max_entries: usize,

    /// Maximum citation records (or legacy reference bodies) per entry
    pub max_sources_per_entry: usize,

    /// Maximum attachments per entry
    pub max_attachments_per_entry: usize,

    /// Maximum encoded size of a single string, in bytes
    pub max_string_bytes: usize,

    /// Maximum size of a single attachment body, in bytes
    pub max_blob_bytes: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            max_sources_per_entry: 10_000,
            max_attachments_per_entry: 1_000,
            max_string_bytes: 64 * 1024 * 1024,
            max_blob_bytes: 512 * 1024 * 1024,
        }
    }
}

impl CodecConfig {
    /// No limits beyond what the wire format can express
    pub fn unbounded() -> Self {
        Self {
            max_entries: usize::MAX,
            max_sources_per_entry: usize::MAX,
            max_attachments_per_entry: usize::MAX,
            max_string_bytes: usize::MAX,
            max_blob_bytes: usize::MAX,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let limits = [
            ("max_entries", self.max_entries),
            ("max_sources_per_entry", self.max_sources_per_entry),
            ("max_attachments_per_entry", self.max_attachments_per_entry),
            ("max_string_bytes", self.max_string_bytes),
            ("max_blob_bytes", self.max_blob_bytes),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(format!("{name} must be > 0"));
            }
        }
        Ok(())
    }
}
