//! Streaming tar reader.
//!
//! Headers are parsed by [`::tar::Archive`]: each call to
//! [`ReadSession::next_header`] runs a short-lived archive over the
//! decompressed stream, which leaves the stream at the start of the entry's
//! data. Data is then delivered in blocks of the open block size.

use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use tracing::debug;
use tracing::trace;

use super::header;
use super::header::BLOCK;
use crate::codec::CodecError;
use crate::codec::CodecResult;
use crate::codec::DataBlock;
use crate::codec::EntryHeader;
use crate::codec::ReadSession;
use crate::codec::Session;
use crate::codec::filter::Filter;
use crate::codec::filter::MAGIC_LEN;

/// Position within the current entry's data.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    remaining: u64,
    offset: u64,
    padding: u64,
}

/// Read session over a possibly compressed tar container.
///
/// Opening the container detects the filter, then checks the first header
/// block, so inputs that are not archives fail at open.
pub struct TarReadSession {
    filters_enabled: bool,
    formats_enabled: bool,
    input: Option<Box<dyn Read>>,
    cursor: Option<Cursor>,
    buf: Vec<u8>,
    filter: Option<Filter>,
    at_end: bool,
    last_error: Option<String>,
}

impl std::fmt::Debug for TarReadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarReadSession")
            .field("open", &self.input.is_some())
            .field("filter", &self.filter)
            .field("at_end", &self.at_end)
            .finish_non_exhaustive()
    }
}

impl Default for TarReadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TarReadSession {
    /// Creates a session with no filters or formats enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filters_enabled: false,
            formats_enabled: false,
            input: None,
            cursor: None,
            buf: Vec::new(),
            filter: None,
            at_end: false,
            last_error: None,
        }
    }

    /// Filter detected when the container was opened.
    #[must_use]
    pub const fn filter(&self) -> Option<Filter> {
        self.filter
    }

    fn open(&mut self, path: &Path, block_size: usize) -> CodecResult {
        if self.input.is_some() {
            return Err(CodecError::State("archive already open"));
        }
        if !self.formats_enabled {
            return Err(CodecError::UnrecognizedFormat);
        }

        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(block_size.max(BLOCK), file);
        let magic = reader.fill_buf()?;
        let filter = Filter::detect(&magic[..magic.len().min(MAGIC_LEN)]);
        if filter != Filter::None && !self.filters_enabled {
            return Err(CodecError::FilterDisabled(filter.name()));
        }

        let mut input = filter.decoder(reader)?;
        let mut first = vec![0u8; BLOCK];
        if read_full(&mut input, &mut first)? < BLOCK || !is_tar_block(&first) {
            return Err(CodecError::UnrecognizedFormat);
        }

        debug!(path = %path.display(), filter = filter.name(), block_size, "opened archive");
        self.input = Some(Box::new(io::Cursor::new(first).chain(input)));
        self.buf = vec![0; block_size.max(1)];
        self.filter = Some(filter);
        self.at_end = false;
        Ok(())
    }

    /// Discards whatever is left of the current entry.
    fn skip_entry(&mut self) -> CodecResult {
        let Some(cursor) = self.cursor.take() else {
            return Ok(());
        };
        let input = self
            .input
            .as_mut()
            .ok_or(CodecError::State("archive not open"))?;
        let skip = cursor.remaining + cursor.padding;
        if io::copy(&mut input.take(skip), &mut io::sink())? != skip {
            return Err(CodecError::Truncated);
        }
        Ok(())
    }

    fn advance(&mut self) -> CodecResult<Option<EntryHeader>> {
        if self.input.is_none() {
            return Err(CodecError::State("archive not open"));
        }
        if self.at_end {
            return Ok(None);
        }
        self.skip_entry()?;

        let input = self
            .input
            .as_mut()
            .ok_or(CodecError::State("archive not open"))?;
        let mut archive = ::tar::Archive::new(input);
        for entry in archive.entries().map_err(malformed)? {
            let mut entry = entry.map_err(malformed)?;
            if entry.header().entry_type() == ::tar::EntryType::XGlobalHeader {
                trace!("ignoring pax global header");
                continue;
            }
            let decoded = header::decode(&mut entry)?;
            self.cursor = Some(Cursor {
                remaining: decoded.size,
                offset: 0,
                padding: header::padding(decoded.size),
            });
            trace!(path = %decoded.pathname, size = decoded.size, "read header");
            return Ok(Some(decoded));
        }

        // End-of-archive marker, or a container that simply stops.
        self.at_end = true;
        Ok(None)
    }

    fn read_block(&mut self) -> CodecResult<Option<DataBlock<'_>>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        if cursor.remaining == 0 {
            return Ok(None);
        }
        let Some(input) = self.input.as_mut() else {
            let err = CodecError::State("archive not open");
            self.last_error = Some(err.to_string());
            return Err(err);
        };

        let want = usize::try_from(cursor.remaining)
            .unwrap_or(usize::MAX)
            .min(self.buf.len());
        let filled = match read_full(input, &mut self.buf[..want]) {
            Ok(filled) if filled == want => filled,
            Ok(_) => {
                self.last_error = Some(CodecError::Truncated.to_string());
                return Err(CodecError::Truncated);
            }
            Err(e) => {
                let err = CodecError::from(e);
                self.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        let offset = cursor.offset;
        cursor.offset += filled as u64;
        cursor.remaining -= filled as u64;
        Ok(Some(DataBlock {
            data: &self.buf[..filled],
            offset,
        }))
    }

    fn record<T>(&mut self, result: CodecResult<T>) -> CodecResult<T> {
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }
}

/// Whether `block` can start a tar stream: an end-of-archive block, or a
/// header whose checksum verifies.
fn is_tar_block(block: &[u8]) -> bool {
    if block.iter().all(|&b| b == 0) {
        return true;
    }
    let mut archive = ::tar::Archive::new(block);
    archive
        .entries()
        .is_ok_and(|entries| matches!(entries.raw(true).next(), Some(Ok(_))))
}

fn malformed(e: io::Error) -> CodecError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CodecError::Truncated
    } else {
        CodecError::CorruptHeader(e.to_string())
    }
}

/// Fills `buf` as far as the input allows, returning the bytes read.
fn read_full(input: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl Session for TarReadSession {
    fn close(&mut self) -> CodecResult {
        self.input = None;
        self.cursor = None;
        Ok(())
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl ReadSession for TarReadSession {
    fn support_filter_all(&mut self) -> CodecResult {
        self.filters_enabled = true;
        Ok(())
    }

    fn support_format_all(&mut self) -> CodecResult {
        self.formats_enabled = true;
        Ok(())
    }

    fn open_filename(&mut self, path: &Path, block_size: usize) -> CodecResult {
        let result = self.open(path, block_size);
        self.record(result)
    }

    fn next_header(&mut self) -> CodecResult<Option<EntryHeader>> {
        let result = self.advance();
        self.record(result)
    }

    fn read_data_block(&mut self) -> CodecResult<Option<DataBlock<'_>>> {
        self.read_block()
    }
}
