use crate::entry::{ChatEntry, Role, SourceList};
use crate::error::{ContractViolation, Result, TranscriptError};
use crate::notify::{ChangeNotifier, Field, Notification};
use crate::types::{Attachment, CitationRecord};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A single-field change applied through [`TranscriptStore::update_field`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Value(String),
    StreamingText(String),
    CurrentResponse(bool),
    Stopped(bool),
    ThumbsUp(bool),
    ThumbsDown(bool),
}

impl FieldUpdate {
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Value(_) => Field::Value,
            Self::StreamingText(_) => Field::StreamingText,
            Self::CurrentResponse(_) => Field::CurrentResponse,
            Self::Stopped(_) => Field::Stopped,
            Self::ThumbsUp(_) => Field::ThumbsUp,
            Self::ThumbsDown(_) => Field::ThumbsDown,
        }
    }

    /// Returns whether the entry changed. Response-only fields never touch other roles.
    fn apply(self, entry: &mut ChatEntry) -> bool {
        match (self, entry) {
            (Self::Value(value), ChatEntry::Prompt(prompt)) => replace(&mut prompt.value, value),
            (Self::Value(value), ChatEntry::Response(response)) => {
                replace(&mut response.value, value)
            }
            (Self::StreamingText(text), ChatEntry::Response(response)) => {
                replace(&mut response.streaming_text, text)
            }
            (Self::CurrentResponse(flag), ChatEntry::Response(response)) => {
                replace(&mut response.current_response, flag)
            }
            (Self::Stopped(flag), ChatEntry::Response(response)) => {
                replace(&mut response.stopped, flag)
            }
            (Self::ThumbsUp(flag), ChatEntry::Response(response)) => {
                replace(&mut response.thumbs_up, flag)
            }
            (Self::ThumbsDown(flag), ChatEntry::Response(response)) => {
                replace(&mut response.thumbs_down, flag)
            }
            (update, entry) => {
                log::debug!(
                    "Ignoring {} update on {} entry",
                    update.field().role_name(),
                    entry.role()
                );
                false
            }
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Read-only view of every entry, holding the store lock until dropped
pub struct Snapshot<'a> {
    guard: MutexGuard<'a, Vec<ChatEntry>>,
}

impl Deref for Snapshot<'_> {
    type Target = [ChatEntry];

    fn deref(&self) -> &[ChatEntry] {
        &self.guard
    }
}

impl<'s> IntoIterator for &'s Snapshot<'_> {
    type Item = &'s ChatEntry;
    type IntoIter = std::slice::Iter<'s, ChatEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.guard.iter()
    }
}

/// The authoritative, ordered transcript of one conversation.
///
/// Every mutation holds the lock for its whole read-modify-write span, including the index it
/// reports; observers are notified only after the lock is released. Writers are expected to be
/// serialized by the caller.
#[derive(Default)]
pub struct TranscriptStore {
    entries: Mutex<Vec<ChatEntry>>,
    observers: Vec<Arc<dyn ChangeNotifier>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register an observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ChangeNotifier>) -> Self {
        self.observers.push(observer);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChatEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, events: &[Notification]) {
        for observer in &self.observers {
            for event in events {
                event.dispatch(observer.as_ref());
            }
        }
    }

    fn append(&self, entry: ChatEntry) -> usize {
        let index = {
            let mut entries = self.lock();
            entries.push(entry);
            entries.len() - 1
        };
        self.emit(&[
            Notification::Inserted {
                first: index,
                last: index,
            },
            Notification::CountChanged,
        ]);
        index
    }

    /// Append a prompt; returns its index
    pub fn append_prompt(&self, value: impl Into<String>, attachments: Vec<Attachment>) -> usize {
        self.append(ChatEntry::prompt(value, attachments))
    }

    /// Append a response marked as the current one; returns its index
    pub fn append_response(&self) -> usize {
        self.append(ChatEntry::response())
    }

    /// Append a batch of entries in one critical section.
    ///
    /// Returns the inclusive index range inserted, `None` for an empty batch.
    pub fn append_entries(&self, batch: Vec<ChatEntry>) -> Option<(usize, usize)> {
        if batch.is_empty() {
            return None;
        }
        let range = {
            let mut entries = self.lock();
            let first = entries.len();
            entries.extend(batch);
            (first, entries.len() - 1)
        };
        log::debug!("Appended entries {}..={}", range.0, range.1);
        self.emit(&[
            Notification::Inserted {
                first: range.0,
                last: range.1,
            },
            Notification::CountChanged,
        ]);
        Some(range)
    }

    /// Remove every entry. No-op (and no notification) when already empty.
    pub fn clear(&self) {
        {
            let mut entries = self.lock();
            if entries.is_empty() {
                return;
            }
            log::debug!("Clearing {} entries", entries.len());
            entries.clear();
        }
        self.emit(&[Notification::Reset, Notification::CountChanged]);
    }

    /// Copy of the entry at `index`; out of range yields `ChatEntry::default()`
    pub fn get(&self, index: usize) -> ChatEntry {
        self.try_get(index).unwrap_or_default()
    }

    pub fn try_get(&self, index: usize) -> Option<ChatEntry> {
        self.lock().get(index).cloned()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stable multi-read view; the store is locked until the snapshot is dropped
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot { guard: self.lock() }
    }

    /// Apply one field update; returns whether the value changed.
    ///
    /// Out-of-range indices and fields the entry's role does not carry leave the store untouched.
    pub fn update_field(&self, index: usize, update: FieldUpdate) -> bool {
        let field = update.field();
        let changed_value = {
            let mut entries = self.lock();
            let Some(entry) = entries.get_mut(index) else {
                return false;
            };
            if !update.apply(entry) {
                return false;
            }
            (field == Field::Value).then(|| entry.value().to_string())
        };

        let mut events = vec![Notification::field(index, field)];
        if let Some(value) = changed_value {
            events.push(Notification::ValueChanged { index, value });
        }
        self.emit(&events);
        true
    }

    pub fn update_value(&self, index: usize, value: impl Into<String>) -> bool {
        self.update_field(index, FieldUpdate::Value(value.into()))
    }

    pub fn update_streaming_text(&self, index: usize, text: impl Into<String>) -> bool {
        self.update_field(index, FieldUpdate::StreamingText(text.into()))
    }

    pub fn update_current_response(&self, index: usize, current: bool) -> bool {
        self.update_field(index, FieldUpdate::CurrentResponse(current))
    }

    pub fn update_stopped(&self, index: usize, stopped: bool) -> bool {
        self.update_field(index, FieldUpdate::Stopped(stopped))
    }

    pub fn update_thumbs_up(&self, index: usize, thumbs_up: bool) -> bool {
        self.update_field(index, FieldUpdate::ThumbsUp(thumbs_up))
    }

    pub fn update_thumbs_down(&self, index: usize, thumbs_down: bool) -> bool {
        self.update_field(index, FieldUpdate::ThumbsDown(thumbs_down))
    }

    /// Attach citations to the trailing prompt/response pair.
    ///
    /// # Panics
    ///
    /// When the store does not end with a prompt followed by a response. Use
    /// [`Self::try_update_sources`] to get the violation back as an error.
    pub fn update_sources(&self, records: Vec<CitationRecord>) {
        if let Err(err) = self.try_update_sources(records) {
            panic!("update_sources: {err}");
        }
    }

    pub fn try_update_sources(&self, records: Vec<CitationRecord>) -> Result<()> {
        let sources = SourceList::new(records);
        let last = {
            let mut entries = self.lock();
            check_source_tail(&entries)?;
            let last = entries.len() - 1;
            entries[last - 1].set_sources(sources.clone());
            entries[last].set_sources(sources);
            last
        };
        self.emit(&[
            Notification::field(last, Field::Sources),
            Notification::field(last, Field::ConsolidatedSources),
        ]);
        Ok(())
    }

    /// Checked accessor for callers that need range failures reported
    pub fn entry(&self, index: usize) -> Result<ChatEntry> {
        let entries = self.lock();
        entries
            .get(index)
            .cloned()
            .ok_or(TranscriptError::OutOfRange {
                index,
                count: entries.len(),
            })
    }
}

fn check_source_tail(entries: &[ChatEntry]) -> std::result::Result<(), ContractViolation> {
    let count = entries.len();
    if count < 2 {
        return Err(ContractViolation::TooFewEntries { count });
    }
    for (index, expected) in [(count - 1, Role::Response), (count - 2, Role::Prompt)] {
        let found = entries[index].role();
        if found != expected {
            return Err(ContractViolation::WrongRole {
                index,
                expected: expected.as_str(),
                found: found.as_str(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use pretty_assertions::assert_eq;

    fn observed() -> (TranscriptStore, Arc<RecordingNotifier>) {
        let recorder = Arc::new(RecordingNotifier::new());
        let store = TranscriptStore::new().with_observer(recorder.clone());
        (store, recorder)
    }

    #[test]
    fn append_reports_new_index() {
        let (store, recorder) = observed();
        assert_eq!(store.append_prompt("hi", vec![]), 0);
        assert_eq!(store.append_response(), 1);
        assert_eq!(
            recorder.take(),
            vec![
                Notification::Inserted { first: 0, last: 0 },
                Notification::CountChanged,
                Notification::Inserted { first: 1, last: 1 },
                Notification::CountChanged,
            ]
        );
    }

    #[test]
    fn clear_on_empty_store_is_silent() {
        let (store, recorder) = observed();
        store.clear();
        assert!(recorder.take().is_empty());

        store.append_prompt("hi", vec![]);
        recorder.take();
        store.clear();
        assert_eq!(store.count(), 0);
        assert_eq!(
            recorder.take(),
            vec![Notification::Reset, Notification::CountChanged]
        );
    }

    #[test]
    fn get_out_of_range_is_default() {
        let store = TranscriptStore::new();
        assert_eq!(store.get(7), ChatEntry::default());
        assert!(store.try_get(7).is_none());
        assert_eq!(
            store.entry(7),
            Err(TranscriptError::OutOfRange { index: 7, count: 0 })
        );
    }

    #[test]
    fn update_notifies_only_on_change() {
        let (store, recorder) = observed();
        let index = store.append_response();
        recorder.take();

        assert!(!store.update_current_response(index, true));
        assert!(store.update_stopped(index, true));
        assert!(!store.update_stopped(index, true));
        assert_eq!(
            recorder.take(),
            vec![Notification::field(index, Field::Stopped)]
        );
    }

    #[test]
    fn value_update_also_reports_new_text() {
        let (store, recorder) = observed();
        let index = store.append_prompt("draft", vec![]);
        recorder.take();

        assert!(store.update_value(index, "final"));
        assert_eq!(
            recorder.take(),
            vec![
                Notification::field(index, Field::Value),
                Notification::ValueChanged {
                    index,
                    value: "final".into()
                },
            ]
        );
        assert_eq!(store.get(index).value(), "final");
    }

    #[test]
    fn response_fields_do_not_apply_to_prompts() {
        let (store, recorder) = observed();
        let index = store.append_prompt("q", vec![]);
        recorder.take();

        assert!(!store.update_thumbs_up(index, true));
        assert!(!store.update_streaming_text(index, "partial"));
        assert!(!store.update_value(index + 1, "nowhere"));
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn sources_land_on_prompt_and_response() {
        let (store, recorder) = observed();
        store.append_prompt("q", vec![]);
        store.append_response();
        recorder.take();

        let records = vec![
            CitationRecord::new("b.txt", "B1"),
            CitationRecord::new("a.txt", "A1"),
            CitationRecord::new("b.txt", "B2"),
        ];
        store.update_sources(records.clone());

        let snapshot = store.snapshot();
        for entry in &snapshot {
            assert_eq!(entry.sources(), records.as_slice());
            assert_eq!(entry.consolidated_sources().len(), 2);
            assert_eq!(entry.consolidated_sources()[1].text, "B1\n---\nB2");
        }
        drop(snapshot);

        assert_eq!(
            recorder.take(),
            vec![
                Notification::field(1, Field::Sources),
                Notification::field(1, Field::ConsolidatedSources),
            ]
        );
    }

    #[test]
    fn try_update_sources_reports_bad_tail() {
        let store = TranscriptStore::new();
        store.append_prompt("q", vec![]);
        assert_eq!(
            store.try_update_sources(vec![]),
            Err(TranscriptError::Contract(ContractViolation::TooFewEntries {
                count: 1
            }))
        );

        store.append_prompt("again", vec![]);
        assert_eq!(
            store.try_update_sources(vec![]),
            Err(TranscriptError::Contract(ContractViolation::WrongRole {
                index: 1,
                expected: "response",
                found: "prompt",
            }))
        );
    }

    #[test]
    #[should_panic(expected = "at least 2 entries")]
    fn update_sources_on_single_prompt_panics() {
        let store = TranscriptStore::new();
        store.append_prompt("q", vec![]);
        store.update_sources(vec![CitationRecord::new("a.txt", "A")]);
    }
}
