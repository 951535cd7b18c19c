use crate::error::{CodecError, Result};
use crate::legacy;
use crate::stream::{DataReader, DataWriter};
use crate::version::{FormatVersion, SourceEncoding};
use chat_transcript::{
    Attachment, ChatEntry, CitationRecord, PromptEntry, ResponseEntry, Role, SourceList,
    TranscriptStore,
};
use std::io::{Read, Write};

/// Written where older layouts kept a per-entry id; never read back
const LEGACY_ID: i32 = 0;

/// Preallocation cap for counts read off the wire
const PREALLOC_LIMIT: usize = 1024;

/// What decoding does when legacy reference lines and passage bodies differ in count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Misalignment {
    Panic,
    Report,
}

/// Encode `entries` in the layout of `version`.
///
/// # Panics
///
/// On a citation without a file (structured layouts) or an attachment without a locator
/// (layouts with attachments). Run [`validate_for_encode`] first to get these as errors.
pub fn encode<W: Write>(
    writer: &mut DataWriter<W>,
    entries: &[ChatEntry],
    version: FormatVersion,
) -> Result<()> {
    let count = i32::try_from(entries.len()).map_err(|_| CodecError::LimitExceeded {
        what: "entry count",
        limit: i32::MAX as usize,
        actual: entries.len(),
    })?;
    log::debug!("Encoding {count} entries at {version}");

    writer.write_i32(count);
    for entry in entries {
        encode_entry(writer, entry, version);
    }
    writer.check()
}

fn encode_entry<W: Write>(writer: &mut DataWriter<W>, entry: &ChatEntry, version: FormatVersion) {
    let response = entry.as_response();

    writer.write_i32(LEGACY_ID);
    writer.write_str(entry.role().label());
    writer.write_str(entry.value());
    if version.has_deprecated_prompt() {
        writer.write_str("");
    }
    writer.write_str(response.map_or("", |r| r.streaming_text.as_str()));
    writer.write_bool(response.is_some_and(|r| r.current_response));
    writer.write_bool(response.is_some_and(|r| r.stopped));
    writer.write_bool(response.is_some_and(|r| r.thumbs_up));
    writer.write_bool(response.is_some_and(|r| r.thumbs_down));

    match version.source_encoding() {
        SourceEncoding::Structured => encode_records(writer, entry.sources()),
        SourceEncoding::Legacy => {
            let rendered = legacy::render(entry.sources());
            writer.write_str(&rendered.references);
            writer.write_str_list(&rendered.contexts);
        }
        SourceEncoding::None => {}
    }

    if version.has_attachments() {
        let attachments = entry.attachments();
        writer.write_i64(attachments.len() as i64);
        for attachment in attachments {
            assert!(
                !attachment.locator.is_empty(),
                "attachment without a locator cannot be encoded"
            );
            writer.write_str(&attachment.locator);
            writer.write_bytes(&attachment.content);
        }
    }
}

fn encode_records<W: Write>(writer: &mut DataWriter<W>, records: &[CitationRecord]) {
    writer.write_i64(records.len() as i64);
    for record in records {
        assert!(
            !record.file.is_empty(),
            "citation without a file cannot be encoded"
        );
        writer.write_str(&record.collection);
        writer.write_str(&record.path);
        writer.write_str(&record.file);
        writer.write_str(&record.title);
        writer.write_str(&record.author);
        writer.write_str(&record.date);
        writer.write_str(&record.text);
        writer.write_i32(record.page);
        writer.write_i32(record.from);
        writer.write_i32(record.to);
    }
}

/// Report the first entry that [`encode`] would reject at `version`
pub fn validate_for_encode(entries: &[ChatEntry], version: FormatVersion) -> Result<()> {
    for (index, entry) in entries.iter().enumerate() {
        if version.source_encoding() == SourceEncoding::Structured
            && entry.sources().iter().any(|record| record.file.is_empty())
        {
            return Err(CodecError::InvalidEntry {
                index,
                reason: "citation without a file".to_string(),
            });
        }
        if version.has_attachments()
            && entry
                .attachments()
                .iter()
                .any(|attachment| attachment.locator.is_empty())
        {
            return Err(CodecError::InvalidEntry {
                index,
                reason: "attachment without a locator".to_string(),
            });
        }
    }
    Ok(())
}

/// Decode a transcript written in the layout of `version`.
///
/// Any stream failure fails the whole call; no partially decoded entries are returned.
///
/// # Panics
///
/// When a legacy entry's reference lines and passage bodies differ in count. Use
/// [`try_decode`] to get that back as [`CodecError::InvalidEntry`].
pub fn decode<R: Read>(reader: &mut DataReader<R>, version: FormatVersion) -> Result<Vec<ChatEntry>> {
    decode_with(reader, version, Misalignment::Panic)
}

/// [`decode`] that reports misaligned legacy citations as an error instead of panicking
pub fn try_decode<R: Read>(
    reader: &mut DataReader<R>,
    version: FormatVersion,
) -> Result<Vec<ChatEntry>> {
    decode_with(reader, version, Misalignment::Report)
}

fn decode_with<R: Read>(
    reader: &mut DataReader<R>,
    version: FormatVersion,
    misalignment: Misalignment,
) -> Result<Vec<ChatEntry>> {
    let raw = i64::from(reader.read_i32()?);
    let count = read_count(reader, "entry count", raw, |config| config.max_entries)?;
    log::debug!("Decoding {count} entries at {version}");

    let mut entries = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for index in 0..count {
        entries.push(decode_entry(reader, version, index, misalignment)?);
    }
    Ok(entries)
}

fn read_count<R: Read>(
    reader: &mut DataReader<R>,
    what: &'static str,
    raw: i64,
    limit: impl FnOnce(&crate::CodecConfig) -> usize,
) -> Result<usize> {
    let Ok(count) = usize::try_from(raw) else {
        return Err(reader.corrupt());
    };
    let limit = limit(reader.config());
    reader.ensure_within(what, count, limit)?;
    Ok(count)
}

fn decode_entry<R: Read>(
    reader: &mut DataReader<R>,
    version: FormatVersion,
    index: usize,
    misalignment: Misalignment,
) -> Result<ChatEntry> {
    let _legacy_id = reader.read_i32()?;
    let label = reader.read_string()?;
    let role = Role::from_label(&label).ok_or(CodecError::UnknownRole(label))?;
    let value = reader.read_string()?;
    if version.has_deprecated_prompt() {
        reader.read_string()?;
    }
    let streaming_text = reader.read_string()?;
    let current_response = reader.read_bool()?;
    let stopped = reader.read_bool()?;
    let thumbs_up = reader.read_bool()?;
    let thumbs_down = reader.read_bool()?;

    let sources = match version.source_encoding() {
        SourceEncoding::Structured => decode_records(reader)?,
        SourceEncoding::Legacy => {
            let references = reader.read_string()?;
            let contexts = reader.read_string_list()?;
            match misalignment {
                Misalignment::Panic => legacy::parse(&references, contexts),
                Misalignment::Report => legacy::try_parse(&references, contexts).map_err(
                    |legacy::Misaligned { lines, bodies }| CodecError::InvalidEntry {
                        index,
                        reason: format!("{lines} legacy reference lines but {bodies} passage bodies"),
                    },
                )?,
            }
        }
        SourceEncoding::None => Vec::new(),
    };

    let attachments = if version.has_attachments() {
        decode_attachments(reader)?
    } else {
        Vec::new()
    };

    let entry = match role {
        Role::System => ChatEntry::system(value),
        Role::Prompt => {
            if !streaming_text.is_empty() || current_response || stopped || thumbs_up || thumbs_down
            {
                log::warn!("Dropping response-only fields stored on a prompt entry");
            }
            ChatEntry::Prompt(PromptEntry {
                value,
                attachments,
                sources: SourceList::new(sources),
            })
        }
        Role::Response => {
            if !attachments.is_empty() {
                log::warn!(
                    "Dropping {} attachments stored on a response entry",
                    attachments.len()
                );
            }
            ChatEntry::Response(ResponseEntry {
                value,
                streaming_text,
                current_response,
                stopped,
                thumbs_up,
                thumbs_down,
                sources: SourceList::new(sources),
            })
        }
    };
    Ok(entry)
}

fn decode_records<R: Read>(reader: &mut DataReader<R>) -> Result<Vec<CitationRecord>> {
    let raw = reader.read_i64()?;
    let count = read_count(reader, "citation count", raw, |config| {
        config.max_sources_per_entry
    })?;
    let mut records = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for _ in 0..count {
        records.push(CitationRecord {
            collection: reader.read_string()?,
            path: reader.read_string()?,
            file: reader.read_string()?,
            title: reader.read_string()?,
            author: reader.read_string()?,
            date: reader.read_string()?,
            text: reader.read_string()?,
            page: reader.read_i32()?,
            from: reader.read_i32()?,
            to: reader.read_i32()?,
        });
    }
    Ok(records)
}

fn decode_attachments<R: Read>(reader: &mut DataReader<R>) -> Result<Vec<Attachment>> {
    let raw = reader.read_i64()?;
    let count = read_count(reader, "attachment count", raw, |config| {
        config.max_attachments_per_entry
    })?;
    let mut attachments = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for _ in 0..count {
        let locator = reader.read_string()?;
        let content = reader.read_bytes()?;
        attachments.push(Attachment { locator, content });
    }
    Ok(attachments)
}

/// Encode the current contents of `store`, holding its lock for the duration
pub fn persist<W: Write>(
    store: &TranscriptStore,
    writer: &mut DataWriter<W>,
    version: FormatVersion,
) -> Result<()> {
    let snapshot = store.snapshot();
    encode(writer, &snapshot, version)
}

/// Decode a transcript and append it to `store`; returns how many entries were added.
///
/// On failure the store is left untouched.
///
/// # Panics
///
/// As [`decode`]. [`try_restore`] reports misaligned legacy citations instead.
pub fn restore<R: Read>(
    store: &TranscriptStore,
    reader: &mut DataReader<R>,
    version: FormatVersion,
) -> Result<usize> {
    let entries = decode(reader, version)?;
    append_decoded(store, entries)
}

/// [`restore`] built on [`try_decode`]
pub fn try_restore<R: Read>(
    store: &TranscriptStore,
    reader: &mut DataReader<R>,
    version: FormatVersion,
) -> Result<usize> {
    let entries = try_decode(reader, version)?;
    append_decoded(store, entries)
}

fn append_decoded(store: &TranscriptStore, entries: Vec<ChatEntry>) -> Result<usize> {
    let added = entries.len();
    store.append_entries(entries);
    log::debug!("Restored {added} entries");
    Ok(added)
}
