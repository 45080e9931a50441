//! Archive codec capability.
//!
//! The archiving pipeline never touches container bytes itself. It drives
//! three kinds of sessions obtained from an [`ArchiveCodec`]:
//!
//! - a [`ReadSession`] that replays entry headers and data blocks from a
//!   container,
//! - a [`WriteSession`] that serialises entries into a container,
//! - a [`DiskWriteSession`] that materialises entries onto the filesystem.
//!
//! Releasing a session is dropping it. Closing is explicit and may fail;
//! [`SessionGuard`] closes a session on drop when nobody closed it first, so
//! every exit path releases what it acquired.
//!
//! [`TarCodec`] is the real implementation; tests substitute a scripted codec.

pub mod disk;
pub mod filter;
pub mod guard;
pub mod tar;

use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

pub use self::disk::DiskOptions;
pub use self::disk::DiskWriter;
pub use self::filter::Filter;
pub use self::guard::SessionGuard;
pub use self::tar::TarCodec;

/// Result type alias for codec primitives.
pub type CodecResult<T = ()> = std::result::Result<T, CodecError>;

/// Failures reported by codec primitives.
#[derive(Error, Debug)]
pub enum CodecError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not a container in any enabled format.
    #[error("unrecognized archive format")]
    UnrecognizedFormat,

    /// Input is compressed with a filter that is not enabled.
    #[error("compression filter {0} is not enabled")]
    FilterDisabled(&'static str),

    /// Container ended in the middle of a header or entry.
    #[error("truncated archive")]
    Truncated,

    /// An entry header failed validation.
    #[error("corrupt entry header: {0}")]
    CorruptHeader(String),

    /// A value does not fit the selected container format.
    #[error("{field} does not fit the {format} format")]
    FieldOverflow {
        /// Header field that overflowed.
        field: &'static str,
        /// Selected format name.
        format: &'static str,
    },

    /// An entry pathname would land outside the destination.
    #[error("refusing unsafe entry path {0}")]
    UnsafePath(PathBuf),

    /// A primitive was called in the wrong session state.
    #[error("{0}")]
    State(&'static str),
}

/// Entry types a container can describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file; the only kind the archiver writes.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link with its target.
    Symlink(PathBuf),
    /// Hard link to an earlier entry.
    Hardlink(PathBuf),
    /// Anything else (devices, fifos, sparse or vendor entries).
    Other(u8),
}

/// Per-entry metadata written before, and read ahead of, entry content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Archived pathname.
    pub pathname: String,
    /// Content size in bytes.
    pub size: u64,
    /// Entry type.
    pub kind: EntryKind,
    /// Permission bits.
    pub perm: u32,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: u64,
    /// Owner id.
    pub uid: u64,
    /// Group id.
    pub gid: u64,
}

impl EntryHeader {
    /// Creates a regular-file header with the given permissions.
    #[must_use]
    pub fn regular(pathname: impl Into<String>, size: u64, perm: u32) -> Self {
        Self {
            pathname: pathname.into(),
            size,
            kind: EntryKind::Regular,
            perm,
            mtime: 0,
            uid: 0,
            gid: 0,
        }
    }

    /// Sets the modification time.
    #[must_use]
    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Entry pathname accessor.
    #[must_use]
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Entry size accessor.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Modification time as a `SystemTime`.
    #[must_use]
    pub fn modified(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(self.mtime)
    }
}

/// A chunk of entry content together with its offset within the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlock<'a> {
    /// Block content.
    pub data: &'a [u8],
    /// Byte offset of `data` within the entry.
    pub offset: u64,
}

/// Container layouts a write session can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// POSIX ustar headers, with pax extended headers only for values that
    /// ustar cannot represent.
    #[default]
    PaxRestricted,
    /// Plain POSIX ustar; values that do not fit are an error.
    Ustar,
}

impl Format {
    /// Human-readable format name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PaxRestricted => "pax restricted",
            Self::Ustar => "ustar",
        }
    }
}

/// State shared by every session kind.
pub trait Session {
    /// Flushes and closes the session. Closing twice is a no-op.
    fn close(&mut self) -> CodecResult;

    /// Human-readable description of the most recent failure.
    fn last_error(&self) -> Option<&str>;
}

/// Reads entries out of a container.
pub trait ReadSession: Session {
    /// Enables every compression filter the codec knows.
    fn support_filter_all(&mut self) -> CodecResult;

    /// Enables every container format the codec knows.
    fn support_format_all(&mut self) -> CodecResult;

    /// Opens `path`, reading it `block_size` bytes at a time.
    fn open_filename(&mut self, path: &Path, block_size: usize) -> CodecResult;

    /// Advances to the next entry. `Ok(None)` is end of archive.
    fn next_header(&mut self) -> CodecResult<Option<EntryHeader>>;

    /// Reads the next block of the current entry. `Ok(None)` is end of data.
    fn read_data_block(&mut self) -> CodecResult<Option<DataBlock<'_>>>;
}

/// Serialises entries into a container.
pub trait WriteSession: Session {
    /// Selects the compression filter applied to the whole container.
    ///
    /// `level` uses the 1-9 scale; `None` picks the filter's default.
    fn add_filter(&mut self, filter: Filter, level: Option<u8>) -> CodecResult;

    /// Selects the container format.
    fn set_format(&mut self, format: Format) -> CodecResult;

    /// Creates the container at `path`.
    fn open_filename(&mut self, path: &Path) -> CodecResult;

    /// Starts a new entry, implicitly finishing the previous one.
    fn write_header(&mut self, header: &EntryHeader) -> CodecResult;

    /// Appends content to the current entry. Returns the bytes accepted.
    fn write_data(&mut self, buf: &[u8]) -> CodecResult<usize>;

    /// Completes the current entry.
    fn finish_entry(&mut self) -> CodecResult;

    /// Container bytes produced, known once the session is closed.
    fn bytes_written(&self) -> u64 {
        0
    }
}

/// Materialises entries onto the filesystem.
pub trait DiskWriteSession: Session {
    /// Selects what metadata is restored.
    fn set_options(&mut self, options: DiskOptions) -> CodecResult;

    /// Enables standard user/group lookup for ownership restoration.
    fn set_standard_lookup(&mut self) -> CodecResult;

    /// Sets the directory entry pathnames are resolved against.
    fn set_destination(&mut self, dir: &Path) -> CodecResult;

    /// Creates the filesystem object for `header`.
    fn write_header(&mut self, header: &EntryHeader) -> CodecResult;

    /// Writes `buf` at `offset` within the current entry.
    fn write_data_block(&mut self, buf: &[u8], offset: u64) -> CodecResult;

    /// Applies deferred metadata and closes the current entry.
    fn finish_entry(&mut self) -> CodecResult;
}

/// Factory for codec sessions. `None` means the session could not be
/// allocated.
pub trait ArchiveCodec {
    /// Container reader.
    type Reader: ReadSession;
    /// Container writer.
    type Writer: WriteSession;
    /// Disk writer.
    type Disk: DiskWriteSession;

    /// Allocates a read session.
    fn read_session(&self) -> Option<Self::Reader>;

    /// Allocates a write session.
    fn write_session(&self) -> Option<Self::Writer>;

    /// Allocates a disk-write session.
    fn disk_session(&self) -> Option<Self::Disk>;
}
