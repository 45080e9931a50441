//! Streaming tar writer.
//!
//! The container is a [`::tar::Builder`] over the compressor. Pax extended
//! headers and the end-of-archive trailer come from the builder; entry
//! headers and data are streamed through it as they arrive.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use tracing::debug;
use tracing::warn;

use super::header;
use super::header::BLOCK;
use crate::codec::CodecError;
use crate::codec::CodecResult;
use crate::codec::EntryHeader;
use crate::codec::Format;
use crate::codec::Session;
use crate::codec::WriteSession;
use crate::codec::filter::Filter;
use crate::codec::filter::FilterWriter;
use crate::io::CountingWriter;

type Output = ::tar::Builder<FilterWriter<CountingWriter<BufWriter<File>>>>;

const ZEROS: [u8; BLOCK] = [0; BLOCK];

#[derive(Debug)]
struct PendingEntry {
    pathname: String,
    declared: u64,
    written: u64,
}

/// Write session producing a compressed tar container.
///
/// Entry data is streamed straight through the compressor; nothing is
/// buffered beyond the compressor's own window.
pub struct TarWriteSession {
    filter: Filter,
    level: Option<u8>,
    format: Format,
    out: Option<Output>,
    entry: Option<PendingEntry>,
    compressed_bytes: u64,
    last_error: Option<String>,
}

impl std::fmt::Debug for TarWriteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarWriteSession")
            .field("filter", &self.filter)
            .field("format", &self.format)
            .field("open", &self.out.is_some())
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl Default for TarWriteSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TarWriteSession {
    /// Creates an unopened session. Until a filter is added the container
    /// is written uncompressed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filter: Filter::None,
            level: None,
            format: Format::PaxRestricted,
            out: None,
            entry: None,
            compressed_bytes: 0,
            last_error: None,
        }
    }

    /// Container bytes written once the session is closed.
    #[must_use]
    pub const fn compressed_bytes(&self) -> u64 {
        self.compressed_bytes
    }

    fn output(&mut self) -> CodecResult<&mut Output> {
        self.out
            .as_mut()
            .ok_or(CodecError::State("archive not open"))
    }

    fn open(&mut self, path: &Path) -> CodecResult {
        if self.out.is_some() {
            return Err(CodecError::State("archive already open"));
        }
        let file = File::create(path)?;
        let counting = CountingWriter::new(BufWriter::new(file));
        self.out = Some(::tar::Builder::new(
            self.filter.encoder(counting, self.level)?,
        ));
        debug!(
            path = %path.display(),
            filter = self.filter.name(),
            format = self.format.name(),
            "created archive"
        );
        Ok(())
    }

    fn start_entry(&mut self, entry: &EntryHeader) -> CodecResult {
        self.end_entry()?;
        let encoded = header::encode(entry, self.format)?;
        let builder = self.output()?;
        builder.append_pax_extensions(encoded.pax_records())?;
        builder.get_mut().write_all(encoded.header.as_bytes())?;
        self.entry = Some(PendingEntry {
            pathname: entry.pathname.clone(),
            declared: entry.size,
            written: 0,
        });
        Ok(())
    }

    fn append(&mut self, buf: &[u8]) -> CodecResult<usize> {
        let entry = self
            .entry
            .as_mut()
            .ok_or(CodecError::State("no entry in progress"))?;
        let room = entry.declared - entry.written;
        let accepted = usize::try_from(room).map_or(buf.len(), |room| room.min(buf.len()));
        if accepted < buf.len() {
            warn!(
                path = %entry.pathname,
                declared = entry.declared,
                "entry data exceeds its declared size, truncating"
            );
        }
        entry.written += accepted as u64;
        self.output()?.get_mut().write_all(&buf[..accepted])?;
        Ok(accepted)
    }

    /// Zero-fills a short entry and pads it to a block boundary.
    fn end_entry(&mut self) -> CodecResult {
        let Some(entry) = self.entry.take() else {
            return Ok(());
        };
        if entry.written < entry.declared {
            warn!(
                path = %entry.pathname,
                declared = entry.declared,
                written = entry.written,
                "entry data shorter than its declared size, zero-filling"
            );
        }
        let mut fill = entry.declared - entry.written + header::padding(entry.declared);
        let out = self.output()?.get_mut();
        while fill > 0 {
            let n = usize::try_from(fill).map_or(BLOCK, |fill| fill.min(BLOCK));
            out.write_all(&ZEROS[..n])?;
            fill -= n as u64;
        }
        Ok(())
    }

    fn finish(&mut self) -> CodecResult {
        if self.out.is_none() {
            return Ok(());
        }
        let ended = self.end_entry();
        // The output is released even when the last entry cannot be ended.
        let Some(builder) = self.out.take() else {
            return ended;
        };
        ended?;
        let mut counting = builder.into_inner()?.finish()?;
        counting.flush()?;
        self.compressed_bytes = counting.total_bytes();
        debug!(compressed_bytes = self.compressed_bytes, "closed archive");
        Ok(())
    }

    fn record<T>(&mut self, result: CodecResult<T>) -> CodecResult<T> {
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }
}

impl Session for TarWriteSession {
    fn close(&mut self) -> CodecResult {
        let result = self.finish();
        self.record(result)
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl WriteSession for TarWriteSession {
    fn add_filter(&mut self, filter: Filter, level: Option<u8>) -> CodecResult {
        if self.out.is_some() {
            return self.record(Err(CodecError::State(
                "filter must be selected before the archive is opened",
            )));
        }
        self.filter = filter;
        self.level = level;
        Ok(())
    }

    fn set_format(&mut self, format: Format) -> CodecResult {
        if self.out.is_some() {
            return self.record(Err(CodecError::State(
                "format must be selected before the archive is opened",
            )));
        }
        self.format = format;
        Ok(())
    }

    fn open_filename(&mut self, path: &Path) -> CodecResult {
        let result = self.open(path);
        self.record(result)
    }

    fn write_header(&mut self, header: &EntryHeader) -> CodecResult {
        let result = self.start_entry(header);
        self.record(result)
    }

    fn write_data(&mut self, buf: &[u8]) -> CodecResult<usize> {
        let result = self.append(buf);
        self.record(result)
    }

    fn finish_entry(&mut self) -> CodecResult {
        let result = self.end_entry();
        self.record(result)
    }

    fn bytes_written(&self) -> u64 {
        self.compressed_bytes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::ReadSession;
    use crate::codec::tar::read::TarReadSession;
    use tempfile::TempDir;

    fn read_back(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut reader = TarReadSession::new();
        reader.support_filter_all().unwrap();
        reader.support_format_all().unwrap();
        reader.open_filename(path, 16384).unwrap();
        let mut entries = Vec::new();
        while let Some(header) = reader.next_header().unwrap() {
            let mut data = Vec::new();
            while let Some(block) = reader.read_data_block().unwrap() {
                data.extend_from_slice(block.data);
            }
            entries.push((header.pathname, data));
        }
        entries
    }

    #[test]
    fn test_writes_readable_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.tar.xz");

        let mut session = TarWriteSession::new();
        session.add_filter(Filter::Xz, Some(6)).unwrap();
        session.set_format(Format::PaxRestricted).unwrap();
        session.open_filename(&path).unwrap();
        session
            .write_header(&EntryHeader::regular("d/a.txt", 5, 0o644))
            .unwrap();
        assert_eq!(session.write_data(b"hel").unwrap(), 3);
        assert_eq!(session.write_data(b"lo").unwrap(), 2);
        session.finish_entry().unwrap();
        session
            .write_header(&EntryHeader::regular("d/empty", 0, 0o644))
            .unwrap();
        session.close().unwrap();

        assert!(session.compressed_bytes() > 0);
        assert_eq!(
            session.compressed_bytes(),
            std::fs::metadata(&path).unwrap().len()
        );
        assert_eq!(
            read_back(&path),
            vec![
                ("d/a.txt".to_string(), b"hello".to_vec()),
                ("d/empty".to_string(), Vec::new()),
            ]
        );
    }

    #[test]
    fn test_long_names_get_a_pax_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("long.tar");
        let name = format!("{}/file.txt", "d".repeat(250));

        let mut session = TarWriteSession::new();
        session.open_filename(&path).unwrap();
        session
            .write_header(&EntryHeader::regular(name.clone(), 2, 0o644))
            .unwrap();
        session.write_data(b"ok").unwrap();
        session.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let pax = ::tar::Header::from_byte_slice(&bytes[..BLOCK]);
        assert_eq!(pax.entry_type(), ::tar::EntryType::XHeader);
        assert_eq!(read_back(&path), vec![(name, b"ok".to_vec())]);
    }

    #[test]
    fn test_excess_data_is_truncated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.tar");

        let mut session = TarWriteSession::new();
        session.open_filename(&path).unwrap();
        session
            .write_header(&EntryHeader::regular("a", 2, 0o644))
            .unwrap();
        assert_eq!(session.write_data(b"abcd").unwrap(), 2);
        assert_eq!(session.write_data(b"e").unwrap(), 0);
        session.close().unwrap();

        assert_eq!(read_back(&path), vec![("a".to_string(), b"ab".to_vec())]);
    }

    #[test]
    fn test_short_data_is_zero_filled() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.tar.gz");

        let mut session = TarWriteSession::new();
        session.add_filter(Filter::Gzip, None).unwrap();
        session.open_filename(&path).unwrap();
        session
            .write_header(&EntryHeader::regular("a", 4, 0o644))
            .unwrap();
        session.write_data(b"x").unwrap();
        session.close().unwrap();

        assert_eq!(read_back(&path), vec![("a".to_string(), b"x\0\0\0".to_vec())]);
    }

    #[test]
    fn test_filter_locked_after_open() {
        let temp = TempDir::new().unwrap();
        let mut session = TarWriteSession::new();
        session.open_filename(&temp.path().join("x.tar")).unwrap();
        assert!(session.add_filter(Filter::Gzip, None).is_err());
        assert!(session.set_format(Format::Ustar).is_err());
        assert!(session.last_error().unwrap().contains("before the archive"));
    }

    #[test]
    fn test_data_before_header_fails() {
        let mut session = TarWriteSession::new();
        assert!(matches!(
            session.write_data(b"x"),
            Err(CodecError::State(_))
        ));
    }

    #[test]
    fn test_close_twice_is_noop() {
        let temp = TempDir::new().unwrap();
        let mut session = TarWriteSession::new();
        session.open_filename(&temp.path().join("x.tar")).unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(session.compressed_bytes(), (BLOCK * 2) as u64);
    }
}
