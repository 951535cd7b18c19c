use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Entry fields a view layer can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Value,
    StreamingText,
    CurrentResponse,
    Stopped,
    ThumbsUp,
    ThumbsDown,
    Sources,
    ConsolidatedSources,
    Attachments,
}

impl Field {
    pub const ALL: [Self; 10] = [
        Self::Name,
        Self::Value,
        Self::StreamingText,
        Self::CurrentResponse,
        Self::Stopped,
        Self::ThumbsUp,
        Self::ThumbsDown,
        Self::Sources,
        Self::ConsolidatedSources,
        Self::Attachments,
    ];

    /// Identifier exposed to views
    #[must_use]
    pub const fn role_name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Value => "value",
            Self::StreamingText => "streamingText",
            Self::CurrentResponse => "currentResponse",
            Self::Stopped => "stopped",
            Self::ThumbsUp => "thumbsUp",
            Self::ThumbsDown => "thumbsDown",
            Self::Sources => "sources",
            Self::ConsolidatedSources => "consolidatedSources",
            Self::Attachments => "attachments",
        }
    }
}

/// Observer protocol driven by [`crate::TranscriptStore`].
///
/// Callbacks run after the store lock is released, so an implementation may read the store.
/// Index ranges are inclusive.
pub trait ChangeNotifier: Send + Sync {
    fn on_inserted(&self, first: usize, last: usize);

    fn on_fields_changed(&self, first: usize, last: usize, fields: &[Field]);

    fn on_reset(&self);

    fn on_count_changed(&self);

    /// Fired alongside the `Value` field update
    fn on_value_changed(&self, _index: usize, _value: &str) {}
}

/// A change the store reports once its lock is released
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Inserted { first: usize, last: usize },
    FieldsChanged { first: usize, last: usize, fields: Vec<Field> },
    Reset,
    CountChanged,
    ValueChanged { index: usize, value: String },
}

impl Notification {
    pub(crate) fn field(index: usize, field: Field) -> Self {
        Self::FieldsChanged {
            first: index,
            last: index,
            fields: vec![field],
        }
    }

    pub fn dispatch(&self, observer: &dyn ChangeNotifier) {
        match self {
            Self::Inserted { first, last } => observer.on_inserted(*first, *last),
            Self::FieldsChanged {
                first,
                last,
                fields,
            } => observer.on_fields_changed(*first, *last, fields),
            Self::Reset => observer.on_reset(),
            Self::CountChanged => observer.on_count_changed(),
            Self::ValueChanged { index, value } => observer.on_value_changed(*index, value),
        }
    }
}

/// Observer that keeps every notification it receives, in order
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Notification) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Drain recorded notifications
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn on_inserted(&self, first: usize, last: usize) {
        self.push(Notification::Inserted { first, last });
    }

    fn on_fields_changed(&self, first: usize, last: usize, fields: &[Field]) {
        self.push(Notification::FieldsChanged {
            first,
            last,
            fields: fields.to_vec(),
        });
    }

    fn on_reset(&self) {
        self.push(Notification::Reset);
    }

    fn on_count_changed(&self) {
        self.push(Notification::CountChanged);
    }

    fn on_value_changed(&self, index: usize, value: &str) {
        self.push(Notification::ValueChanged {
            index,
            value: value.to_string(),
        });
    }
}
