//! Citation layout of format versions 3 through 7.
//!
//! Each citation with a file becomes one numbered reference line:
//!
//! ```text
//! 1. "Title". By Author. Date: 2021. In report.pdf. Page 4. Lines 10-12. [Context](context://1)
//! ```
//!
//! Title, author, date, page and lines are only present when set. Lines are joined with `\n`
//! and the passage bodies travel as a separate list aligned with the lines. The layout is
//! frozen; decoding only needs to undo exactly this rendering.

use chat_transcript::{CitationRecord, ABSENT};

const TITLE_MARKER: &str = "\"";
const AUTHOR_MARKER: &str = "By ";
const DATE_MARKER: &str = "Date: ";
const FILE_MARKER: &str = "In ";
const PAGE_MARKER: &str = "Page ";
const LINES_MARKER: &str = "Lines ";

const TITLE_END: &[&str] = &["\". "];
const AUTHOR_END: &[&str] = &[". Date: ", ". In ", ". Page ", ". Lines ", ". [Context]"];
const DATE_END: &[&str] = &[". In ", ". Page ", ". Lines ", ". [Context]"];
const FILE_END: &[&str] = &[". Page ", ". Lines ", ". [Context]"];
const NUMBER_END: &[&str] = &[". "];

/// Reference lines joined by `\n`, plus the aligned passage bodies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LegacySources {
    pub references: String,
    pub contexts: Vec<String>,
}

/// Render citations; records without a file are skipped and not numbered
pub(crate) fn render(sources: &[CitationRecord]) -> LegacySources {
    let mut lines = Vec::new();
    let mut contexts = Vec::new();
    for record in sources.iter().filter(|record| !record.file.is_empty()) {
        lines.push(render_reference(lines.len() + 1, record));
        contexts.push(record.text.clone());
    }
    LegacySources {
        references: lines.join("\n"),
        contexts,
    }
}

fn render_reference(number: usize, record: &CitationRecord) -> String {
    let mut parts = vec![format!("{number}. ")];
    if !record.title.is_empty() {
        parts.push(format!("\"{}\". ", record.title));
    }
    if !record.author.is_empty() {
        parts.push(format!("By {}. ", record.author));
    }
    if !record.date.is_empty() {
        parts.push(format!("Date: {}. ", record.date));
    }
    parts.push(format!("In {}. ", record.file));
    if record.page != ABSENT {
        parts.push(format!("Page {}. ", record.page));
    }
    if record.from != ABSENT {
        parts.push(format!("Lines {}", record.from));
        if record.to != ABSENT {
            parts.push(format!("-{}", record.to));
        }
        parts.push(". ".to_string());
    }
    parts.push(format!("[Context](context://{number})"));
    parts.concat()
}

/// Reference lines and passage bodies that do not pair up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Misaligned {
    pub lines: usize,
    pub bodies: usize,
}

/// Recover citation records from the joined reference string and its bodies.
///
/// Blank lines and lines starting with `---` are ignored.
///
/// # Panics
///
/// When the remaining lines and `contexts` differ in length. [`try_parse`] reports this
/// instead.
pub(crate) fn parse(references: &str, contexts: Vec<String>) -> Vec<CitationRecord> {
    match try_parse(references, contexts) {
        Ok(records) => records,
        Err(Misaligned { lines, bodies }) => panic!(
            "legacy reference lines and passage bodies must align ({lines} lines, {bodies} bodies)"
        ),
    }
}

pub(crate) fn try_parse(
    references: &str,
    contexts: Vec<String>,
) -> Result<Vec<CitationRecord>, Misaligned> {
    if references.is_empty() {
        return Ok(Vec::new());
    }
    let lines: Vec<&str> = references
        .split('\n')
        .filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with("---")
        })
        .collect();
    if lines.len() != contexts.len() {
        return Err(Misaligned {
            lines: lines.len(),
            bodies: contexts.len(),
        });
    }
    Ok(lines
        .into_iter()
        .zip(contexts)
        .map(|(line, text)| CitationRecord {
            text,
            ..parse_reference(line)
        })
        .collect())
}

/// Undo [`render_reference`]. Missing markers leave the field at its default.
///
/// The title is kept verbatim between its quotes; the other text fields are trimmed.
fn parse_reference(line: &str) -> CitationRecord {
    let mut scan = Scanner { line, pos: 0 };
    let mut record = CitationRecord::default();

    if let Some(title) = scan.field(TITLE_MARKER, TITLE_END) {
        record.title = title.to_string();
    }
    if let Some(author) = scan.field(AUTHOR_MARKER, AUTHOR_END) {
        record.author = author.trim().to_string();
    }
    if let Some(date) = scan.field(DATE_MARKER, DATE_END) {
        record.date = date.trim().to_string();
    }
    match scan.field(FILE_MARKER, FILE_END) {
        Some(file) => record.file = file.trim().to_string(),
        None => log::warn!("Legacy reference without a file: {line:?}"),
    }
    if let Some(page) = scan.field(PAGE_MARKER, NUMBER_END) {
        record.page = parse_number(page);
    }
    if let Some(lines) = scan.field(LINES_MARKER, NUMBER_END) {
        match lines.split_once('-') {
            Some((from, to)) => {
                record.from = parse_number(from);
                record.to = parse_number(to);
            }
            None => record.from = parse_number(lines),
        }
    }
    record
}

fn parse_number(text: &str) -> i32 {
    text.trim().parse().unwrap_or(ABSENT)
}

/// Forward-only marker search over one reference line.
///
/// Segments follow a `". "` separator (or open the line), so a marker only counts in that
/// position; this keeps text such as `In ` inside a title from being taken as the file.
struct Scanner<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn field(&mut self, marker: &str, ends: &[&str]) -> Option<&'a str> {
        let rest = &self.line[self.pos..];
        let start = if rest.starts_with(marker) {
            marker.len()
        } else {
            rest.find(&format!(". {marker}"))? + 2 + marker.len()
        };
        let tail = &rest[start..];
        let len = ends
            .iter()
            .filter_map(|end| tail.find(end))
            .min()
            .unwrap_or(tail.len());
        self.pos += start + len;
        Some(&tail[..len])
    }
}
