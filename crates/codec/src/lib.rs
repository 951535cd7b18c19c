//! # Chat Codec
//!
//! Versioned binary persistence for chat transcripts. A transcript written by any format
//! version from 1 upward can be read back; writing always targets one caller-supplied version.
//!
//! ## Layout by version
//!
//! ```text
//! count
//! per entry:
//!     legacy id (0) │ role label │ value │ [deprecated prompt, < v10]
//!     streaming text │ current │ stopped │ thumbs up │ thumbs down
//!     citations:
//!         v8+   count + 10 fields per record
//!         v3-7  numbered reference lines + aligned passage bodies
//!         v1-2  none
//!     attachments (v10+): count + (locator, content)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chat_codec::{persist, restore, DataReader, DataWriter, FormatVersion};
//! use chat_transcript::{CitationRecord, TranscriptStore};
//!
//! let store = TranscriptStore::new();
//! store.append_prompt("Where is the config?", vec![]);
//! store.append_response();
//! store.update_sources(vec![CitationRecord::new("README.md", "See settings.toml")]);
//!
//! let mut writer = DataWriter::new(Vec::new());
//! persist(&store, &mut writer, FormatVersion::LATEST).unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let restored = TranscriptStore::new();
//! let mut reader = DataReader::new(bytes.as_slice());
//! restore(&restored, &mut reader, FormatVersion::LATEST).unwrap();
//! assert_eq!(restored.get(1), store.get(1));
//! ```

mod codec;
mod config;
mod error;
mod legacy;
mod stream;
mod version;

pub use codec::{
    decode, encode, persist, restore, try_decode, try_restore, validate_for_encode,
};
pub use config::CodecConfig;
pub use error::{CodecError, Result, StreamStatus};
pub use stream::{DataReader, DataWriter};
pub use version::{
    FormatVersion, SourceEncoding, ATTACHMENTS_VERSION, LATEST_FORMAT_VERSION,
    LEGACY_SOURCES_VERSION, STRUCTURED_SOURCES_VERSION,
};
