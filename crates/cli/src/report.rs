use chat_codec::FormatVersion;
use chat_transcript::{ChatEntry, Role};
use serde::Serialize;

const PREVIEW_CHARS: usize = 72;

#[derive(Debug, Serialize)]
pub struct TranscriptReport {
    pub format_version: u32,
    pub count: usize,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Serialize)]
pub struct EntrySummary {
    pub index: usize,
    pub role: Role,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseFlags>,
    pub sources: usize,
    /// Consolidated file identifiers, ascending
    pub files: Vec<String>,
    /// Attachment display names (locator when not a local file)
    pub attachments: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResponseFlags {
    pub current: bool,
    pub stopped: bool,
    pub thumbs_up: bool,
    pub thumbs_down: bool,
}

impl TranscriptReport {
    pub fn new(version: FormatVersion, entries: &[ChatEntry]) -> Self {
        Self {
            format_version: version.get(),
            count: entries.len(),
            entries: entries
                .iter()
                .enumerate()
                .map(|(index, entry)| summarize(index, entry))
                .collect(),
        }
    }
}

fn summarize(index: usize, entry: &ChatEntry) -> EntrySummary {
    EntrySummary {
        index,
        role: entry.role(),
        value: entry.value().to_string(),
        response: entry.as_response().map(|r| ResponseFlags {
            current: r.current_response,
            stopped: r.stopped,
            thumbs_up: r.thumbs_up,
            thumbs_down: r.thumbs_down,
        }),
        sources: entry.sources().len(),
        files: entry
            .consolidated_sources()
            .iter()
            .map(|record| record.file.clone())
            .collect(),
        attachments: entry
            .attachments()
            .iter()
            .map(|attachment| {
                let name = attachment.file_name();
                if name.is_empty() {
                    attachment.locator.clone()
                } else {
                    name
                }
            })
            .collect(),
    }
}

pub fn render_text(report: &TranscriptReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Transcript (format v{}, {} entries)\n",
        report.format_version, report.count
    ));
    for entry in &report.entries {
        out.push_str(&format!(
            "#{:<3} {:<8} {}\n",
            entry.index,
            entry.role.as_str(),
            truncate_one_line(&entry.value, PREVIEW_CHARS)
        ));
        if let Some(flags) = &entry.response {
            let mut marks = Vec::new();
            if flags.current {
                marks.push("current");
            }
            if flags.stopped {
                marks.push("stopped");
            }
            if flags.thumbs_up {
                marks.push("thumbs-up");
            }
            if flags.thumbs_down {
                marks.push("thumbs-down");
            }
            if !marks.is_empty() {
                out.push_str(&format!("      [{}]\n", marks.join(", ")));
            }
        }
        if entry.sources > 0 {
            out.push_str(&format!(
                "      sources: {} ({})\n",
                entry.sources,
                entry.files.join(", ")
            ));
        }
        if !entry.attachments.is_empty() {
            out.push_str(&format!(
                "      attachments: {}\n",
                entry.attachments.join(", ")
            ));
        }
    }
    out
}

fn truncate_one_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    let mut out: String = line.chars().take(max_chars).collect();
    if line.chars().count() > max_chars || text.lines().nth(1).is_some() {
        out.push('…');
    }
    out
}
