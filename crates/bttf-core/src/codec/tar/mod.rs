//! Tar-family codec.
//!
//! Containers are POSIX tar streams wrapped in one compression filter.
//! Writing defaults to xz with pax-restricted headers; reading accepts any
//! supported filter and ustar, pax or GNU headers.

mod header;
mod read;
mod write;

pub use self::read::TarReadSession;
pub use self::write::TarWriteSession;
use super::ArchiveCodec;
use super::disk::DiskWriter;

/// Codec backed by the `tar` header layout and the compression crates.
///
/// # Examples
///
/// ```no_run
/// use bttf_core::Archiver;
/// use bttf_core::codec::TarCodec;
///
/// let mut archiver = Archiver::create(&TarCodec::new(), "backup.tar.xz")?;
/// archiver.archive_item("src")?;
/// archiver.finish()?;
/// # Ok::<(), bttf_core::ArchiverError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TarCodec;

impl TarCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ArchiveCodec for TarCodec {
    type Reader = TarReadSession;
    type Writer = TarWriteSession;
    type Disk = DiskWriter;

    fn read_session(&self) -> Option<Self::Reader> {
        Some(TarReadSession::new())
    }

    fn write_session(&self) -> Option<Self::Writer> {
        Some(TarWriteSession::new())
    }

    fn disk_session(&self) -> Option<Self::Disk> {
        Some(DiskWriter::new())
    }
}
