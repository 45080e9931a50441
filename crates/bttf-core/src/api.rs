//! One-call entry points using the tar codec.

use std::path::Path;

use crate::ArchiveConfig;
use crate::ArchiveReport;
use crate::Archiver;
use crate::ExtractConfig;
use crate::ExtractionReport;
use crate::Extractor;
use crate::ProgressCallback;
use crate::Result;
use crate::codec::TarCodec;

/// Packs `root` into a new container at `output`.
///
/// The returned report covers the whole operation, including the size of
/// the finished container. Per-file failures inside a directory do not make
/// this return an error; check [`ArchiveReport::status`].
///
/// # Errors
///
/// Returns an error if the container cannot be created or completed, or if
/// `root` is a single file that cannot be archived.
///
/// # Examples
///
/// ```no_run
/// use bttf_core::ArchiveConfig;
///
/// # fn main() -> Result<(), bttf_core::ArchiverError> {
/// let report = bttf_core::pack("notes", "notes.tar.xz", &ArchiveConfig::default())?;
/// println!("{:.1}x", report.compression_ratio());
/// # Ok(())
/// # }
/// ```
pub fn pack(
    root: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ArchiveConfig,
) -> Result<ArchiveReport> {
    pack_with_progress(root, output, config, crate::NoopProgress)
}

/// Like [`pack`], reporting progress to `progress`.
///
/// # Errors
///
/// As [`pack`].
pub fn pack_with_progress<P: ProgressCallback>(
    root: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ArchiveConfig,
    progress: P,
) -> Result<ArchiveReport> {
    let mut archiver =
        Archiver::with_config(&TarCodec::new(), output, config.clone())?.with_progress(progress);
    archiver.archive_item(root)?;
    archiver.finish()
}

/// Unpacks `container` into `config.destination`.
///
/// # Errors
///
/// Returns an error if the container cannot be opened or an entry header
/// cannot be read or created. Entries that fail to finalise are counted in
/// the report instead.
pub fn unpack(container: impl AsRef<Path>, config: &ExtractConfig) -> Result<ExtractionReport> {
    unpack_with_progress(container, config, crate::NoopProgress)
}

/// Like [`unpack`], reporting progress to `progress`.
///
/// # Errors
///
/// As [`unpack`].
pub fn unpack_with_progress<P: ProgressCallback>(
    container: impl AsRef<Path>,
    config: &ExtractConfig,
    progress: P,
) -> Result<ExtractionReport> {
    Extractor::with_config(TarCodec::new(), config.clone())
        .with_progress(progress)
        .extract(container)
}
