use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sentinel for an absent page or line number
pub const ABSENT: i32 = -1;

/// A reference to a source passage backing a response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationRecord {
    /// Name of the collection the source was retrieved from
    pub collection: String,

    /// Directory path of the source document
    pub path: String,

    /// File identifier; consolidation groups by this
    pub file: String,

    pub title: String,
    pub author: String,
    pub date: String,

    /// Passage body
    pub text: String,

    /// Page number, `ABSENT` when unknown
    pub page: i32,

    /// First line of the passage, `ABSENT` when unknown
    pub from: i32,

    /// Last line of the passage, `ABSENT` when unknown
    pub to: i32,
}

impl Default for CitationRecord {
    fn default() -> Self {
        Self {
            collection: String::new(),
            path: String::new(),
            file: String::new(),
            title: String::new(),
            author: String::new(),
            date: String::new(),
            text: String::new(),
            page: ABSENT,
            from: ABSENT,
            to: ABSENT,
        }
    }
}

impl CitationRecord {
    /// Create a record for `file` with the given passage body
    pub fn new(file: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Builder: set title
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder: set author
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Builder: set date
    #[must_use]
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Builder: set collection and path
    #[must_use]
    pub fn located(mut self, collection: impl Into<String>, path: impl Into<String>) -> Self {
        self.collection = collection.into();
        self.path = path.into();
        self
    }

    /// Builder: set page
    #[must_use]
    pub const fn page(mut self, page: i32) -> Self {
        self.page = page;
        self
    }

    /// Builder: set line range (`to` may be `ABSENT`)
    #[must_use]
    pub const fn lines(mut self, from: i32, to: i32) -> Self {
        self.from = from;
        self.to = to;
        self
    }
}

/// Converts spreadsheet attachments into readable text. Implemented outside this crate.
pub trait SpreadsheetConverter {
    fn to_markdown(&self, content: &[u8]) -> String;
}

/// A file attached to a prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// URI of the attached file
    pub locator: String,

    /// Raw file content
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(locator: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            locator: locator.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn is_local_file(&self) -> bool {
        self.locator
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("file:"))
    }

    /// Display name of a local-file attachment; empty for any other locator
    #[must_use]
    pub fn file_name(&self) -> String {
        if !self.is_local_file() {
            return String::new();
        }
        let raw = &self.locator[5..];
        let decoded = percent_decode_utf8(raw).unwrap_or_else(|| raw.to_string());
        Path::new(decoded.trim_start_matches('/'))
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Header plus content, as fed to the model. Spreadsheets go through `converter`.
    pub fn rendered(&self, converter: &dyn SpreadsheetConverter) -> String {
        let name = self.file_name();
        let is_spreadsheet = Path::new(&name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        let body = if is_spreadsheet {
            converter.to_markdown(&self.content)
        } else {
            String::from_utf8_lossy(&self.content).into_owned()
        };
        format!("## Attached: {name}\n\n{body}")
    }
}

/// `None` on a truncated or non-hex escape, or when the result is not UTF-8
fn percent_decode_utf8(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = (*bytes.get(i + 1)? as char).to_digit(16)?;
            let lo = (*bytes.get(i + 2)? as char).to_digit(16)?;
            out.push(((hi << 4) | lo) as u8);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
