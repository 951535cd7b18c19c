//! Big-endian primitive stream used by the transcript format.
//!
//! Layout: `int` = i32, `size` = i64, `bool` = one byte (non-zero is true), `string` = u32 byte
//! length + UTF-8, `bytes` = u32 length + raw, `string list` = u32 count + strings. A length of
//! `NULL_LENGTH` marks a null string or byte array and decodes as empty.

use crate::config::CodecConfig;
use crate::error::{CodecError, Result, StreamStatus};
use std::io::{ErrorKind, Read, Write};

const NULL_LENGTH: u32 = u32::MAX;

/// Blobs are read in steps of this size so a corrupt length cannot force one huge allocation
const BLOB_CHUNK: usize = 64 * 1024;

const LIST_PREALLOC: usize = 1024;

/// Writes primitives, remembering the first failure
pub struct DataWriter<W: Write> {
    inner: W,
    status: StreamStatus,
}

impl<W: Write> DataWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            status: StreamStatus::Ok,
        }
    }

    pub const fn status(&self) -> StreamStatus {
        self.status
    }

    /// `Ok` while the status is clean, the status as an error otherwise
    pub fn check(&self) -> Result<()> {
        if self.status.is_ok() {
            Ok(())
        } else {
            Err(CodecError::Stream(self.status))
        }
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        if self.status.is_ok() && self.inner.flush().is_err() {
            self.status = StreamStatus::WriteFailed;
        }
        self.check()?;
        Ok(self.inner)
    }

    fn put(&mut self, bytes: &[u8]) {
        if !self.status.is_ok() {
            return;
        }
        if let Err(err) = self.inner.write_all(bytes) {
            log::debug!("Transcript stream write failed: {err}");
            self.status = StreamStatus::WriteFailed;
        }
    }

    fn put_len(&mut self, len: usize) {
        match u32::try_from(len) {
            Ok(len) if len != NULL_LENGTH => self.write_u32(len),
            _ => self.status = StreamStatus::WriteFailed,
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.put(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.put(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.put(&value.to_be_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.put(&[u8::from(value)]);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.put_len(value.len());
        self.put(value);
    }

    pub fn write_str_list<S: AsRef<str>>(&mut self, values: &[S]) {
        self.put_len(values.len());
        for value in values {
            self.write_str(value.as_ref());
        }
    }
}

/// Reads primitives under the decode limits of a [`CodecConfig`]
pub struct DataReader<R: Read> {
    inner: R,
    status: StreamStatus,
    config: CodecConfig,
}

impl<R: Read> DataReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            status: StreamStatus::Ok,
            config: CodecConfig::default(),
        }
    }

    pub fn with_config(inner: R, config: CodecConfig) -> Result<Self> {
        config.validate().map_err(CodecError::InvalidConfig)?;
        Ok(Self {
            inner,
            status: StreamStatus::Ok,
            config,
        })
    }

    pub const fn status(&self) -> StreamStatus {
        self.status
    }

    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Mark the stream corrupt and return the matching error
    pub fn corrupt(&mut self) -> CodecError {
        self.status = StreamStatus::ReadCorruptData;
        CodecError::Stream(self.status)
    }

    /// Reject `actual` above `limit`, marking the stream corrupt
    pub fn ensure_within(&mut self, what: &'static str, actual: usize, limit: usize) -> Result<()> {
        if actual > limit {
            self.status = StreamStatus::ReadCorruptData;
            return Err(CodecError::LimitExceeded {
                what,
                limit,
                actual,
            });
        }
        Ok(())
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        if !self.status.is_ok() {
            return Err(CodecError::Stream(self.status));
        }
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                self.status = StreamStatus::ReadPastEnd;
                Err(CodecError::Stream(self.status))
            }
            Err(err) => {
                self.status = StreamStatus::ReadCorruptData;
                Err(CodecError::IoError(err))
            }
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let [byte] = self.array::<1>()?;
        Ok(byte != 0)
    }

    /// Length prefix of a string or byte array; `None` for the null marker
    fn read_len(&mut self, what: &'static str, limit: usize) -> Result<Option<usize>> {
        let raw = self.read_u32()?;
        if raw == NULL_LENGTH {
            return Ok(None);
        }
        let len = usize::try_from(raw).map_err(|_| self.corrupt())?;
        self.ensure_within(what, len, limit)?;
        Ok(Some(len))
    }

    fn read_blob(&mut self, what: &'static str, limit: usize) -> Result<Vec<u8>> {
        let Some(len) = self.read_len(what, limit)? else {
            return Ok(Vec::new());
        };
        let mut buf = Vec::with_capacity(len.min(BLOB_CHUNK));
        while buf.len() < len {
            let start = buf.len();
            buf.resize(start + (len - start).min(BLOB_CHUNK), 0);
            self.fill(&mut buf[start..])?;
        }
        Ok(buf)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let limit = self.config.max_string_bytes;
        let bytes = self.read_blob("string length", limit)?;
        String::from_utf8(bytes).map_err(|_| self.corrupt())
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let limit = self.config.max_blob_bytes;
        self.read_blob("byte array length", limit)
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let limit = self.config.max_sources_per_entry;
        let count = self.read_len("string list length", limit)?.unwrap_or(0);
        let mut values = Vec::with_capacity(count.min(LIST_PREALLOC));
        for _ in 0..count {
            values.push(self.read_string()?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn primitives_are_big_endian() {
        let mut writer = DataWriter::new(Vec::new());
        writer.write_i32(1);
        writer.write_bool(true);
        writer.write_str("ok");
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 1, 1, 0, 0, 0, 2, b'o', b'k']);
    }

    #[test]
    fn values_read_back_in_order() {
        let mut writer = DataWriter::new(Vec::new());
        writer.write_i64(-5);
        writer.write_bytes(&[9, 8, 7]);
        writer.write_str_list(&["a", "bc"]);
        let bytes = writer.finish().unwrap();

        let mut reader = DataReader::new(bytes.as_slice());
        assert_eq!(reader.read_i64().unwrap(), -5);
        assert_eq!(reader.read_bytes().unwrap(), vec![9, 8, 7]);
        assert_eq!(reader.read_string_list().unwrap(), vec!["a", "bc"]);
        assert_eq!(reader.status(), StreamStatus::Ok);
    }

    #[test]
    fn null_string_reads_as_empty() {
        let bytes = NULL_LENGTH.to_be_bytes();
        let mut reader = DataReader::new(&bytes[..]);
        assert_eq!(reader.read_string().unwrap(), "");
    }

    #[test]
    fn truncated_input_sets_read_past_end() {
        let mut reader = DataReader::new(&[0u8, 0][..]);
        assert!(matches!(
            reader.read_i32(),
            Err(CodecError::Stream(StreamStatus::ReadPastEnd))
        ));
        assert_eq!(reader.status(), StreamStatus::ReadPastEnd);
        // sticky
        assert!(reader.read_bool().is_err());
    }

    #[test]
    fn invalid_utf8_is_corrupt() {
        let mut writer = DataWriter::new(Vec::new());
        writer.write_bytes(&[0xff, 0xfe]);
        let bytes = writer.finish().unwrap();
        let mut reader = DataReader::new(bytes.as_slice());
        assert!(reader.read_string().is_err());
        assert_eq!(reader.status(), StreamStatus::ReadCorruptData);
    }

    #[test]
    fn oversized_length_is_rejected_before_allocating() {
        let config = CodecConfig {
            max_string_bytes: 4,
            ..CodecConfig::default()
        };
        let mut writer = DataWriter::new(Vec::new());
        writer.write_str("too long");
        let bytes = writer.finish().unwrap();

        let mut reader = DataReader::with_config(bytes.as_slice(), config).unwrap();
        assert!(matches!(
            reader.read_string(),
            Err(CodecError::LimitExceeded { limit: 4, actual: 8, .. })
        ));
    }

    #[test]
    fn unbounded_reader_fails_on_lying_length() {
        let mut bytes = (NULL_LENGTH - 1).to_be_bytes().to_vec();
        bytes.extend_from_slice(b"abc");

        let mut reader = DataReader::with_config(bytes.as_slice(), CodecConfig::unbounded()).unwrap();
        assert!(matches!(
            reader.read_bytes(),
            Err(CodecError::Stream(StreamStatus::ReadPastEnd))
        ));
    }

    #[test]
    fn unbounded_reader_fails_on_lying_list_count() {
        let mut bytes = (NULL_LENGTH - 1).to_be_bytes().to_vec();
        bytes.extend_from_slice(&0u32.to_be_bytes());

        let mut reader = DataReader::with_config(bytes.as_slice(), CodecConfig::unbounded()).unwrap();
        assert!(matches!(
            reader.read_string_list(),
            Err(CodecError::Stream(StreamStatus::ReadPastEnd))
        ));
    }

    #[test]
    fn blobs_larger_than_one_chunk_read_back() {
        let blob: Vec<u8> = (0..BLOB_CHUNK * 2 + 17).map(|i| (i % 251) as u8).collect();
        let mut writer = DataWriter::new(Vec::new());
        writer.write_bytes(&blob);
        let bytes = writer.finish().unwrap();

        let mut reader = DataReader::new(bytes.as_slice());
        assert_eq!(reader.read_bytes().unwrap(), blob);
    }

    #[test]
    fn failed_writer_reports_write_failed() {
        let mut writer = DataWriter::new(Broken);
        writer.write_i32(7);
        assert_eq!(writer.status(), StreamStatus::WriteFailed);
        assert!(matches!(
            writer.finish(),
            Err(CodecError::Stream(StreamStatus::WriteFailed))
        ));
    }
}
