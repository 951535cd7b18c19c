use crate::consolidate::consolidate;
use crate::types::{Attachment, CitationRecord, SpreadsheetConverter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Prompt,
    Response,
}

impl Role {
    /// Historical label stored in encoded transcripts
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::System => "System: ",
            Self::Prompt => "Prompt: ",
            Self::Response => "Response: ",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "System: " => Some(Self::System),
            "Prompt: " => Some(Self::Prompt),
            "Response: " => Some(Self::Response),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Prompt => "prompt",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Citation records paired with their consolidated form.
///
/// The consolidated list is always derived from `sources`; there is no way to set it on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSources")]
pub struct SourceList {
    sources: Vec<CitationRecord>,
    consolidated: Vec<CitationRecord>,
}

#[derive(Deserialize)]
struct RawSources {
    #[serde(default)]
    sources: Vec<CitationRecord>,
}

impl From<RawSources> for SourceList {
    fn from(raw: RawSources) -> Self {
        Self::new(raw.sources)
    }
}

impl SourceList {
    pub fn new(sources: Vec<CitationRecord>) -> Self {
        let consolidated = consolidate(&sources);
        Self {
            sources,
            consolidated,
        }
    }

    #[must_use]
    pub fn sources(&self) -> &[CitationRecord] {
        &self.sources
    }

    #[must_use]
    pub fn consolidated(&self) -> &[CitationRecord] {
        &self.consolidated
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl From<Vec<CitationRecord>> for SourceList {
    fn from(sources: Vec<CitationRecord>) -> Self {
        Self::new(sources)
    }
}

/// A user prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub value: String,
    pub attachments: Vec<Attachment>,
    pub sources: SourceList,
}

impl PromptEntry {
    /// Rendered attachments followed by the prompt text, separated by blank lines
    pub fn prompt_plus_attachments(&self, converter: &dyn SpreadsheetConverter) -> String {
        if self.attachments.is_empty() {
            return self.value.clone();
        }
        let mut parts: Vec<String> = self
            .attachments
            .iter()
            .map(|attachment| attachment.rendered(converter))
            .collect();
        parts.push(self.value.clone());
        parts.join("\n\n")
    }
}

/// A model response, mutated while it streams in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub value: String,
    pub streaming_text: String,
    pub current_response: bool,
    pub stopped: bool,
    pub thumbs_up: bool,
    pub thumbs_down: bool,
    pub sources: SourceList,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatEntry {
    /// Never stored by the transcript store nor persisted
    System { value: String },
    Prompt(PromptEntry),
    Response(ResponseEntry),
}

impl Default for ChatEntry {
    fn default() -> Self {
        Self::System {
            value: String::new(),
        }
    }
}

impl ChatEntry {
    pub fn system(value: impl Into<String>) -> Self {
        Self::System {
            value: value.into(),
        }
    }

    pub fn prompt(value: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::Prompt(PromptEntry {
            value: value.into(),
            attachments,
            sources: SourceList::default(),
        })
    }

    /// A fresh response that is still being produced
    #[must_use]
    pub fn response() -> Self {
        Self::Response(ResponseEntry {
            current_response: true,
            ..Default::default()
        })
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::Prompt(_) => Role::Prompt,
            Self::Response(_) => Role::Response,
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::System { value } => value,
            Self::Prompt(prompt) => &prompt.value,
            Self::Response(response) => &response.value,
        }
    }

    #[must_use]
    pub fn source_list(&self) -> Option<&SourceList> {
        match self {
            Self::System { .. } => None,
            Self::Prompt(prompt) => Some(&prompt.sources),
            Self::Response(response) => Some(&response.sources),
        }
    }

    #[must_use]
    pub fn sources(&self) -> &[CitationRecord] {
        match self.source_list() {
            Some(list) => list.sources(),
            None => &[],
        }
    }

    #[must_use]
    pub fn consolidated_sources(&self) -> &[CitationRecord] {
        match self.source_list() {
            Some(list) => list.consolidated(),
            None => &[],
        }
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        match self {
            Self::Prompt(prompt) => &prompt.attachments,
            _ => &[],
        }
    }

    #[must_use]
    pub fn as_response(&self) -> Option<&ResponseEntry> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }

    pub(crate) fn set_sources(&mut self, sources: SourceList) {
        match self {
            Self::Prompt(prompt) => prompt.sources = sources,
            Self::Response(response) => response.sources = sources,
            Self::System { .. } => {}
        }
    }
}
