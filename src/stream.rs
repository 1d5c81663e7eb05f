//! Record stream: framing, sources and a writer.
//!
//! A stream is a sequence of framed records. Each frame is a 16-byte little-endian header
//! followed by the payload:
//!
//! | Offset | Field       | Type  |
//! |--------|-------------|-------|
//! | 0      | sync marker | `u32` (`0xD41F8A37`) |
//! | 4      | type code   | `u32` |
//! | 8      | identifier  | `i32` |
//! | 12     | length      | `u32` |
//!
//! End of input is clean only at a frame boundary; a partial header or payload is a
//! framing error.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use tracing::debug;

use crate::decode::encode_payload;
use crate::error::{AppResult, HessioError};
use crate::records::RecordKind;

/// Marker opening every frame.
pub const SYNC_MARKER: u32 = 0xD41F_8A37;

/// Frame header size in bytes.
pub const HEADER_LEN: usize = 16;

/// Largest payload a frame may declare.
pub const MAX_PAYLOAD_LEN: usize = 100_000_000;

/// One undecoded record as delivered by a [`RecordSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub type_code: u32,
    /// Identifier hint; for per-telescope blocks this names the telescope.
    pub ident: i32,
    pub payload: Bytes,
}

impl RawRecord {
    pub fn new(type_code: u32, ident: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            type_code,
            ident,
            payload: payload.into(),
        }
    }

    /// Builds a record by encoding `value` as the payload of `kind`.
    pub fn encode<T: Serialize>(kind: RecordKind, ident: i32, value: &T) -> AppResult<Self> {
        let payload = encode_payload(value).map_err(|source| HessioError::Decode { kind, source })?;
        Ok(Self::new(kind.code(), ident, payload))
    }
}

/// Anything that can deliver records one at a time.
pub trait RecordSource {
    /// Next record, or `Ok(None)` at the end of the stream.
    fn next_record(&mut self) -> AppResult<Option<RawRecord>>;

    /// Releases the underlying input. Called at most once by the pipeline, but
    /// implementations must tolerate repeated calls.
    fn close(&mut self) -> AppResult<()> {
        Ok(())
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn next_record(&mut self) -> AppResult<Option<RawRecord>> {
        (**self).next_record()
    }

    fn close(&mut self) -> AppResult<()> {
        (**self).close()
    }
}

/// Reads framed records from any byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and production code a buffered file.
pub struct FramedReader<R: Read> {
    reader: Option<R>,
    records_read: u64,
}

impl<R: Read> FramedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            records_read: 0,
        }
    }

    /// Number of records delivered so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    fn read_header(reader: &mut R) -> AppResult<Option<[u8; HEADER_LEN]>> {
        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            match reader.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(HessioError::Framing(format!(
                        "truncated header: got {filled} of {HEADER_LEN} bytes"
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Some(header))
    }
}

impl FramedReader<Box<dyn Read>> {
    /// Opens a file for reading; `-` reads standard input.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let reader: Box<dyn Read> = if path.as_os_str() == "-" {
            Box::new(BufReader::new(std::io::stdin()))
        } else {
            Box::new(BufReader::new(File::open(path)?))
        };
        debug!(path = %path.display(), "Opened record stream");
        Ok(Self::new(reader))
    }
}

impl<R: Read> RecordSource for FramedReader<R> {
    fn next_record(&mut self) -> AppResult<Option<RawRecord>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let Some(header) = Self::read_header(reader)? else {
            return Ok(None);
        };

        let mut buf = &header[..];
        let sync = buf.get_u32_le();
        if sync != SYNC_MARKER {
            return Err(HessioError::Framing(format!(
                "bad sync marker {sync:#010x} after {} records",
                self.records_read
            )));
        }
        let type_code = buf.get_u32_le();
        let ident = buf.get_i32_le();
        let length = buf.get_u32_le() as usize;
        if length > MAX_PAYLOAD_LEN {
            return Err(HessioError::Framing(format!(
                "payload of {length} bytes exceeds limit of {MAX_PAYLOAD_LEN}"
            )));
        }

        let mut payload = vec![0u8; length];
        reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                HessioError::Framing(format!(
                    "truncated payload of type {type_code}: expected {length} bytes"
                ))
            } else {
                HessioError::Io(e)
            }
        })?;

        self.records_read += 1;
        Ok(Some(RawRecord::new(type_code, ident, payload)))
    }

    fn close(&mut self) -> AppResult<()> {
        if self.reader.take().is_some() {
            debug!(records = self.records_read, "Closed record stream");
        }
        Ok(())
    }
}

/// Writes framed records.
pub struct FramedWriter<W: Write> {
    writer: W,
    records_written: u64,
}

impl<W: Write> FramedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    /// Writes a record whose payload is already encoded.
    pub fn write_raw(&mut self, record: &RawRecord) -> AppResult<()> {
        if record.payload.len() > MAX_PAYLOAD_LEN {
            return Err(HessioError::Framing(format!(
                "payload of {} bytes exceeds limit of {MAX_PAYLOAD_LEN}",
                record.payload.len()
            )));
        }
        let mut header = BytesMut::with_capacity(HEADER_LEN);
        header.put_u32_le(SYNC_MARKER);
        header.put_u32_le(record.type_code);
        header.put_i32_le(record.ident);
        header.put_u32_le(record.payload.len() as u32);
        self.writer.write_all(&header)?;
        self.writer.write_all(&record.payload)?;
        self.records_written += 1;
        Ok(())
    }

    /// Encodes `value` and writes it as a record of `kind`.
    pub fn write<T: Serialize>(&mut self, kind: RecordKind, ident: i32, value: &T) -> AppResult<()> {
        let record = RawRecord::encode(kind, ident, value)?;
        self.write_raw(&record)
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn flush(&mut self) -> AppResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Source over records already held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: std::collections::VecDeque<RawRecord>,
    closed: bool,
}

impl MemorySource {
    pub fn new(records: impl IntoIterator<Item = RawRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
            closed: false,
        }
    }

    pub fn push(&mut self, record: RawRecord) {
        self.records.push_back(record);
    }

    /// Records not yet delivered.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RecordSource for MemorySource {
    fn next_record(&mut self) -> AppResult<Option<RawRecord>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.records.pop_front())
    }

    fn close(&mut self) -> AppResult<()> {
        self.closed = true;
        Ok(())
    }
}
