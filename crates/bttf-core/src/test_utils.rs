//! Scripted codec and progress recorder for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;

use crate::ProgressCallback;
use crate::codec::ArchiveCodec;
use crate::codec::CodecError;
use crate::codec::CodecResult;
use crate::codec::DataBlock;
use crate::codec::DiskOptions;
use crate::codec::DiskWriteSession;
use crate::codec::EntryHeader;
use crate::codec::Filter;
use crate::codec::Format;
use crate::codec::ReadSession;
use crate::codec::Session;
use crate::codec::WriteSession;

/// Calls made on a mock write session, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    AddFilter(Filter, Option<u8>),
    SetFormat(Format),
    Open(PathBuf),
    Header(String),
    Data(usize),
    FinishEntry,
}

/// Entry replayed by a mock read session.
#[derive(Debug, Clone)]
pub struct ScriptedEntry {
    pathname: String,
    blocks: Vec<Vec<u8>>,
    failing_read: Option<usize>,
}

impl ScriptedEntry {
    /// Regular file whose content is `blocks`, in order.
    pub fn file(pathname: &str, blocks: &[&[u8]]) -> Self {
        Self {
            pathname: pathname.to_string(),
            blocks: blocks.iter().map(|b| b.to_vec()).collect(),
            failing_read: None,
        }
    }

    /// Makes the `index`th data block read fail.
    pub fn failing_read_at(mut self, index: usize) -> Self {
        self.failing_read = Some(index);
        self
    }

    fn header(&self) -> EntryHeader {
        let size = self.blocks.iter().map(|b| b.len() as u64).sum();
        EntryHeader::regular(self.pathname.clone(), size, 0o644)
    }
}

/// Session lifecycle counters.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub read_closes: usize,
    pub read_drops: usize,
    pub write_closes: usize,
    pub write_drops: usize,
    pub disk_allocations: usize,
    pub disk_closes: usize,
    pub disk_drops: usize,
    pub disk_finishes: usize,
    pub block_reads: usize,
    pub standard_lookup: bool,
}

#[derive(Debug, Default)]
struct Script {
    no_read: bool,
    no_write: bool,
    no_disk: bool,
    fail_read_open: bool,
    fail_write_open: bool,
    fail_write_header_at: Option<usize>,
    fail_write_data: bool,
    fail_next_header_at: Option<usize>,
    fail_disk_header_at: Option<usize>,
    fail_disk_write: bool,
    fail_disk_finish_at: Option<usize>,
    entries: Vec<ScriptedEntry>,
}

#[derive(Debug, Default)]
struct Log {
    write_calls: Vec<WriteCall>,
    written_headers: Vec<EntryHeader>,
    opened_containers: Vec<(PathBuf, usize)>,
    disk_options: Option<DiskOptions>,
    disk_headers: Vec<String>,
    disk_blocks: Vec<(String, Vec<u8>, u64)>,
    counters: Counters,
    write_header_calls: usize,
    next_header_calls: usize,
    disk_header_calls: usize,
    disk_finish_calls: usize,
}

#[derive(Debug, Default)]
struct Shared {
    script: Script,
    log: Log,
}

type Handle = Rc<RefCell<Shared>>;

fn scripted_failure() -> CodecError {
    CodecError::State("scripted failure")
}

/// Codec whose sessions follow a script and record every call.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MockCodec {
    shared: Handle,
}

impl MockCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, f: impl FnOnce(&mut Script)) -> Self {
        f(&mut self.shared.borrow_mut().script);
        self
    }

    pub fn without_read_session(self) -> Self {
        self.script(|s| s.no_read = true)
    }

    pub fn without_write_session(self) -> Self {
        self.script(|s| s.no_write = true)
    }

    pub fn without_disk_session(self) -> Self {
        self.script(|s| s.no_disk = true)
    }

    pub fn fail_read_open(self) -> Self {
        self.script(|s| s.fail_read_open = true)
    }

    pub fn fail_write_open(self) -> Self {
        self.script(|s| s.fail_write_open = true)
    }

    /// Fails the `index`th write-session header, counting from zero.
    pub fn fail_write_header_at(self, index: usize) -> Self {
        self.script(|s| s.fail_write_header_at = Some(index))
    }

    pub fn fail_write_data(self) -> Self {
        self.script(|s| s.fail_write_data = true)
    }

    pub fn with_entries(self, entries: Vec<ScriptedEntry>) -> Self {
        self.script(|s| s.entries = entries)
    }

    pub fn fail_next_header_at(self, index: usize) -> Self {
        self.script(|s| s.fail_next_header_at = Some(index))
    }

    pub fn fail_disk_header_at(self, index: usize) -> Self {
        self.script(|s| s.fail_disk_header_at = Some(index))
    }

    pub fn fail_disk_write(self) -> Self {
        self.script(|s| s.fail_disk_write = true)
    }

    pub fn fail_disk_finish_at(self, index: usize) -> Self {
        self.script(|s| s.fail_disk_finish_at = Some(index))
    }

    pub fn write_calls(&self) -> Vec<WriteCall> {
        self.shared.borrow().log.write_calls.clone()
    }

    pub fn written_headers(&self) -> Vec<EntryHeader> {
        self.shared.borrow().log.written_headers.clone()
    }

    pub fn data_chunk_sizes(&self) -> Vec<usize> {
        self.shared
            .borrow()
            .log
            .write_calls
            .iter()
            .filter_map(|call| match call {
                WriteCall::Data(len) => Some(*len),
                _ => None,
            })
            .collect()
    }

    pub fn counters(&self) -> Counters {
        self.shared.borrow().log.counters.clone()
    }

    pub fn opened_containers(&self) -> Vec<(PathBuf, usize)> {
        self.shared.borrow().log.opened_containers.clone()
    }

    pub fn disk_options(&self) -> Option<DiskOptions> {
        self.shared.borrow().log.disk_options
    }

    pub fn disk_headers(&self) -> Vec<String> {
        self.shared.borrow().log.disk_headers.clone()
    }

    pub fn disk_blocks(&self) -> Vec<(String, Vec<u8>, u64)> {
        self.shared.borrow().log.disk_blocks.clone()
    }
}

impl ArchiveCodec for MockCodec {
    type Reader = MockReader;
    type Writer = MockWriter;
    type Disk = MockDisk;

    fn read_session(&self) -> Option<MockReader> {
        if self.shared.borrow().script.no_read {
            return None;
        }
        Some(MockReader {
            shared: Rc::clone(&self.shared),
            pending: VecDeque::new(),
            current: None,
            buf: Vec::new(),
        })
    }

    fn write_session(&self) -> Option<MockWriter> {
        if self.shared.borrow().script.no_write {
            return None;
        }
        Some(MockWriter {
            shared: Rc::clone(&self.shared),
        })
    }

    fn disk_session(&self) -> Option<MockDisk> {
        let mut shared = self.shared.borrow_mut();
        if shared.script.no_disk {
            return None;
        }
        shared.log.counters.disk_allocations += 1;
        Some(MockDisk {
            shared: Rc::clone(&self.shared),
            current: String::new(),
        })
    }
}

#[derive(Debug)]
struct Cursor {
    entry: ScriptedEntry,
    next_block: usize,
    offset: u64,
}

/// Read session replaying [`ScriptedEntry`] values.
#[derive(Debug)]
pub struct MockReader {
    shared: Handle,
    pending: VecDeque<ScriptedEntry>,
    current: Option<Cursor>,
    buf: Vec<u8>,
}

impl Session for MockReader {
    fn close(&mut self) -> CodecResult {
        self.shared.borrow_mut().log.counters.read_closes += 1;
        Ok(())
    }

    fn last_error(&self) -> Option<&str> {
        None
    }
}

impl ReadSession for MockReader {
    fn support_filter_all(&mut self) -> CodecResult {
        Ok(())
    }

    fn support_format_all(&mut self) -> CodecResult {
        Ok(())
    }

    fn open_filename(&mut self, path: &Path, block_size: usize) -> CodecResult {
        let mut shared = self.shared.borrow_mut();
        shared
            .log
            .opened_containers
            .push((path.to_path_buf(), block_size));
        if shared.script.fail_read_open {
            return Err(CodecError::UnrecognizedFormat);
        }
        self.pending = shared.script.entries.iter().cloned().collect();
        Ok(())
    }

    fn next_header(&mut self) -> CodecResult<Option<EntryHeader>> {
        {
            let mut shared = self.shared.borrow_mut();
            let index = shared.log.next_header_calls;
            shared.log.next_header_calls += 1;
            if shared.script.fail_next_header_at == Some(index) {
                return Err(CodecError::Truncated);
            }
        }
        let Some(entry) = self.pending.pop_front() else {
            self.current = None;
            return Ok(None);
        };
        let header = entry.header();
        self.current = Some(Cursor {
            entry,
            next_block: 0,
            offset: 0,
        });
        Ok(Some(header))
    }

    fn read_data_block(&mut self) -> CodecResult<Option<DataBlock<'_>>> {
        self.shared.borrow_mut().log.counters.block_reads += 1;
        let Some(cursor) = self.current.as_mut() else {
            return Err(CodecError::State("no current entry"));
        };
        let index = cursor.next_block;
        cursor.next_block += 1;
        if cursor.entry.failing_read == Some(index) {
            return Err(CodecError::Truncated);
        }
        let Some(block) = cursor.entry.blocks.get(index) else {
            return Ok(None);
        };
        let offset = cursor.offset;
        cursor.offset += block.len() as u64;
        self.buf.clone_from(block);
        Ok(Some(DataBlock {
            data: &self.buf,
            offset,
        }))
    }
}

impl Drop for MockReader {
    fn drop(&mut self) {
        self.shared.borrow_mut().log.counters.read_drops += 1;
    }
}

/// Write session recording every call.
#[derive(Debug)]
pub struct MockWriter {
    shared: Handle,
}

impl MockWriter {
    fn record(&self, call: WriteCall) {
        self.shared.borrow_mut().log.write_calls.push(call);
    }
}

impl Session for MockWriter {
    fn close(&mut self) -> CodecResult {
        self.shared.borrow_mut().log.counters.write_closes += 1;
        Ok(())
    }

    fn last_error(&self) -> Option<&str> {
        None
    }
}

impl WriteSession for MockWriter {
    fn add_filter(&mut self, filter: Filter, level: Option<u8>) -> CodecResult {
        self.record(WriteCall::AddFilter(filter, level));
        Ok(())
    }

    fn set_format(&mut self, format: Format) -> CodecResult {
        self.record(WriteCall::SetFormat(format));
        Ok(())
    }

    fn open_filename(&mut self, path: &Path) -> CodecResult {
        self.record(WriteCall::Open(path.to_path_buf()));
        if self.shared.borrow().script.fail_write_open {
            return Err(CodecError::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )));
        }
        Ok(())
    }

    fn write_header(&mut self, header: &EntryHeader) -> CodecResult {
        let mut shared = self.shared.borrow_mut();
        let index = shared.log.write_header_calls;
        shared.log.write_header_calls += 1;
        if shared.script.fail_write_header_at == Some(index) {
            return Err(scripted_failure());
        }
        shared
            .log
            .write_calls
            .push(WriteCall::Header(header.pathname.clone()));
        shared.log.written_headers.push(header.clone());
        Ok(())
    }

    fn write_data(&mut self, buf: &[u8]) -> CodecResult<usize> {
        if self.shared.borrow().script.fail_write_data {
            return Err(scripted_failure());
        }
        self.record(WriteCall::Data(buf.len()));
        Ok(buf.len())
    }

    fn finish_entry(&mut self) -> CodecResult {
        self.record(WriteCall::FinishEntry);
        Ok(())
    }
}

impl Drop for MockWriter {
    fn drop(&mut self) {
        self.shared.borrow_mut().log.counters.write_drops += 1;
    }
}

/// Disk session recording every call instead of touching the filesystem.
#[derive(Debug)]
pub struct MockDisk {
    shared: Handle,
    current: String,
}

impl Session for MockDisk {
    fn close(&mut self) -> CodecResult {
        self.shared.borrow_mut().log.counters.disk_closes += 1;
        Ok(())
    }

    fn last_error(&self) -> Option<&str> {
        None
    }
}

impl DiskWriteSession for MockDisk {
    fn set_options(&mut self, options: DiskOptions) -> CodecResult {
        self.shared.borrow_mut().log.disk_options = Some(options);
        Ok(())
    }

    fn set_standard_lookup(&mut self) -> CodecResult {
        self.shared.borrow_mut().log.counters.standard_lookup = true;
        Ok(())
    }

    fn set_destination(&mut self, _dir: &Path) -> CodecResult {
        Ok(())
    }

    fn write_header(&mut self, header: &EntryHeader) -> CodecResult {
        let mut shared = self.shared.borrow_mut();
        let index = shared.log.disk_header_calls;
        shared.log.disk_header_calls += 1;
        if shared.script.fail_disk_header_at == Some(index) {
            return Err(scripted_failure());
        }
        shared.log.disk_headers.push(header.pathname.clone());
        self.current.clone_from(&header.pathname);
        Ok(())
    }

    fn write_data_block(&mut self, buf: &[u8], offset: u64) -> CodecResult {
        let mut shared = self.shared.borrow_mut();
        if shared.script.fail_disk_write {
            return Err(scripted_failure());
        }
        shared
            .log
            .disk_blocks
            .push((self.current.clone(), buf.to_vec(), offset));
        Ok(())
    }

    fn finish_entry(&mut self) -> CodecResult {
        let mut shared = self.shared.borrow_mut();
        let index = shared.log.disk_finish_calls;
        shared.log.disk_finish_calls += 1;
        shared.log.counters.disk_finishes += 1;
        if shared.script.fail_disk_finish_at == Some(index) {
            return Err(scripted_failure());
        }
        Ok(())
    }
}

impl Drop for MockDisk {
    fn drop(&mut self) {
        self.shared.borrow_mut().log.counters.disk_drops += 1;
    }
}

/// Progress callback counting every event.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub started: usize,
    pub completed: usize,
    pub bytes: u64,
    pub finished: usize,
}

impl ProgressCallback for RecordingProgress {
    fn on_entry_start(&mut self, _path: &Path, _current: usize) {
        self.started += 1;
    }

    fn on_bytes(&mut self, bytes: u64) {
        self.bytes += bytes;
    }

    fn on_entry_complete(&mut self, _path: &Path) {
        self.completed += 1;
    }

    fn on_complete(&mut self) {
        self.finished += 1;
    }
}
