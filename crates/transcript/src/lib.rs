//! # Chat Transcript
//!
//! The authoritative, mutable record of one conversation: an ordered sequence of system,
//! prompt and response turns, guarded by a single lock and observable through change
//! notifications.
//!
//! ## Architecture
//!
//! ```text
//! append / update / clear
//!     │
//!     ├──> TranscriptStore (lock → mutate → unlock)
//!     │      ├─> ChatEntry[] (Prompt | Response)
//!     │      └─> SourceList = sources + consolidate(sources)
//!     │
//!     └──> ChangeNotifier (after unlock)
//!            ├─> on_inserted / on_fields_changed
//!            └─> on_reset / on_count_changed
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chat_transcript::{CitationRecord, TranscriptStore};
//!
//! let store = TranscriptStore::new();
//! store.append_prompt("What does the report say?", vec![]);
//! let response = store.append_response();
//! store.update_streaming_text(response, "It says");
//! store.update_sources(vec![CitationRecord::new("report.pdf", "Revenue grew.").page(4)]);
//!
//! let snapshot = store.snapshot();
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(snapshot[1].consolidated_sources()[0].file, "report.pdf");
//! ```

mod consolidate;
mod entry;
mod error;
mod notify;
mod store;
mod types;

pub use consolidate::{consolidate, PASSAGE_DELIMITER};
pub use entry::{ChatEntry, PromptEntry, ResponseEntry, Role, SourceList};
pub use error::{ContractViolation, Result, TranscriptError};
pub use notify::{ChangeNotifier, Field, Notification, RecordingNotifier};
pub use store::{FieldUpdate, Snapshot, TranscriptStore};
pub use types::{Attachment, CitationRecord, SpreadsheetConverter, ABSENT};
