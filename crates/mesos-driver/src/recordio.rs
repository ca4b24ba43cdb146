//! Incremental decoder for Mesos RecordIO framing: `<decimal length>\n<payload>`.
use thiserror::Error;

pub const DEFAULT_MAX_RECORD_BYTES: usize = 16 * 1024 * 1024;
// u64::MAX has 20 digits; anything longer cannot be a valid header.
const MAX_HEADER_BYTES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordIoError {
    #[error("invalid record length header {header:?}")]
    InvalidHeader { header: String },
    #[error("record of {len} bytes exceeds the {max} byte limit")]
    RecordTooLarge { len: usize, max: usize },
    #[error("stream ended inside a record with {buffered} bytes buffered")]
    Truncated { buffered: usize },
}

/// Frames a payload as one RecordIO record.
pub fn encode_record(payload: &[u8]) -> Vec<u8> {
    let header = payload.len().to_string();
    let mut record = Vec::with_capacity(header.len() + 1 + payload.len());
    record.extend_from_slice(header.as_bytes());
    record.push(b'\n');
    record.extend_from_slice(payload);
    record
}

#[derive(Debug)]
pub struct RecordIoDecoder {
    buffer: Vec<u8>,
    pending_len: Option<usize>,
    max_record_bytes: usize,
}

impl Default for RecordIoDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORD_BYTES)
    }
}

impl RecordIoDecoder {
    pub fn new(max_record_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            pending_len: None,
            max_record_bytes: max_record_bytes.max(1),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pops the next complete record, or `None` until more bytes arrive.
    ///
    /// An error means record boundaries are lost; the decoder must not be
    /// fed again.
    pub fn next_record(&mut self) -> Result<Option<Vec<u8>>, RecordIoError> {
        let len = match self.pending_len {
            Some(len) => len,
            None => match self.take_header()? {
                Some(len) => len,
                None => return Ok(None),
            },
        };

        if self.buffer.len() < len {
            self.pending_len = Some(len);
            return Ok(None);
        }

        self.pending_len = None;
        let rest = self.buffer.split_off(len);
        Ok(Some(std::mem::replace(&mut self.buffer, rest)))
    }

    /// Drains every record currently available.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, RecordIoError> {
        self.push(chunk);
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Checks that the stream did not stop in the middle of a record.
    pub fn finish(&self) -> Result<(), RecordIoError> {
        let dangling = self.pending_len.is_some()
            || self.buffer.iter().any(|byte| !byte.is_ascii_whitespace());
        if dangling {
            return Err(RecordIoError::Truncated {
                buffered: self.buffer.len(),
            });
        }
        Ok(())
    }

    fn take_header(&mut self) -> Result<Option<usize>, RecordIoError> {
        let leading = self
            .buffer
            .iter()
            .take_while(|byte| byte.is_ascii_whitespace())
            .count();
        if leading > 0 {
            self.buffer.drain(..leading);
        }

        let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') else {
            if self.buffer.len() > MAX_HEADER_BYTES {
                return Err(invalid_header(&self.buffer));
            }
            return Ok(None);
        };

        let header = self.buffer[..newline].trim_ascii();
        if header.is_empty() || header.len() > MAX_HEADER_BYTES {
            return Err(invalid_header(header));
        }
        if !header.iter().all(u8::is_ascii_digit) {
            return Err(invalid_header(header));
        }
        let len = std::str::from_utf8(header)
            .ok()
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| invalid_header(header))?;
        if len > self.max_record_bytes {
            return Err(RecordIoError::RecordTooLarge {
                len,
                max: self.max_record_bytes,
            });
        }

        self.buffer.drain(..=newline);
        Ok(Some(len))
    }
}

fn invalid_header(raw: &[u8]) -> RecordIoError {
    let preview = &raw[..raw.len().min(MAX_HEADER_BYTES + 4)];
    RecordIoError::InvalidHeader {
        header: String::from_utf8_lossy(preview).into_owned(),
    }
}
