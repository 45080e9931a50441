//! Header-driven extraction.
//!
//! Extraction replays a container onto disk: read a header, create the entry,
//! copy its data blocks at their offsets, finalise it, repeat until the end
//! of the archive. Header-level failures abort the whole extraction; block
//! failures only cut the affected entry short.

use std::path::Path;
use std::time::Instant;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::ArchiverError;
use crate::ExtractConfig;
use crate::ExtractionReport;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::codec::ArchiveCodec;
use crate::codec::CodecError;
use crate::codec::DiskWriteSession;
use crate::codec::EntryHeader;
use crate::codec::ReadSession;
use crate::codec::SessionGuard;
use crate::error::SessionKind;

/// Unpacks containers through a codec.
///
/// Every call to [`Extractor::extract`] allocates a fresh read session and a
/// fresh disk session and closes both before returning, on every path.
///
/// # Examples
///
/// ```no_run
/// use bttf_core::ExtractConfig;
/// use bttf_core::Extractor;
/// use bttf_core::codec::TarCodec;
///
/// # fn main() -> Result<(), bttf_core::ArchiverError> {
/// let config = ExtractConfig::default().with_destination("restored");
/// let mut extractor = Extractor::with_config(TarCodec::new(), config);
/// let report = extractor.extract("project.tar.xz")?;
/// println!("{} entries", report.entries_extracted);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Extractor<C: ArchiveCodec, P: ProgressCallback = NoopProgress> {
    codec: C,
    config: ExtractConfig,
    progress: P,
}

impl<C: ArchiveCodec> Extractor<C> {
    /// Creates an extractor writing into the current directory.
    pub fn new(codec: C) -> Self {
        Self::with_config(codec, ExtractConfig::default())
    }

    /// Creates an extractor with explicit settings.
    pub const fn with_config(codec: C, config: ExtractConfig) -> Self {
        Self {
            codec,
            config,
            progress: NoopProgress,
        }
    }
}

impl<C: ArchiveCodec, P: ProgressCallback> Extractor<C, P> {
    /// Replaces the progress callback.
    pub fn with_progress<Q: ProgressCallback>(self, progress: Q) -> Extractor<C, Q> {
        Extractor {
            codec: self.codec,
            config: self.config,
            progress,
        }
    }

    /// Settings in effect.
    #[must_use]
    pub const fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Progress callback.
    #[must_use]
    pub const fn progress(&self) -> &P {
        &self.progress
    }

    /// Extracts every entry of `container`.
    ///
    /// An entry that cannot be finalised is logged and counted in
    /// [`ExtractionReport::entries_failed`], and extraction continues.
    /// Reaching the end of the archive is a success.
    ///
    /// # Errors
    ///
    /// - [`ArchiverError::SessionAllocation`] / [`ArchiverError::Configure`]
    ///   if a session cannot be set up. No file is touched.
    /// - [`ArchiverError::CannotOpen`] if the container cannot be opened or
    ///   is not an archive.
    /// - [`ArchiverError::HeaderRead`] / [`ArchiverError::HeaderWrite`] if an
    ///   entry header cannot be read or created on disk.
    pub fn extract(&mut self, container: impl AsRef<Path>) -> Result<ExtractionReport> {
        let started = Instant::now();
        self.config.validate()?;
        let container = container.as_ref();

        let reader = self
            .codec
            .read_session()
            .ok_or(ArchiverError::SessionAllocation(SessionKind::Read))?;
        let mut reader = SessionGuard::labelled(reader, "archive reader");
        let configure_reader = |source| ArchiverError::Configure {
            kind: SessionKind::Read,
            source,
        };
        reader.support_filter_all().map_err(configure_reader)?;
        reader.support_format_all().map_err(configure_reader)?;

        let disk = self
            .codec
            .disk_session()
            .ok_or(ArchiverError::SessionAllocation(SessionKind::Disk))?;
        let mut disk = SessionGuard::labelled(disk, "disk writer");
        let configure_disk = |source| ArchiverError::Configure {
            kind: SessionKind::Disk,
            source,
        };
        disk.set_options(self.config.disk_options)
            .map_err(configure_disk)?;
        disk.set_standard_lookup().map_err(configure_disk)?;
        disk.set_destination(&self.config.destination)
            .map_err(configure_disk)?;

        reader
            .open_filename(container, self.config.block_size)
            .map_err(|source| {
                error!(container = %container.display(), error = %source, "cannot open archive");
                ArchiverError::CannotOpen {
                    path: container.to_path_buf(),
                    source,
                }
            })?;
        info!(
            container = %container.display(),
            destination = %self.config.destination.display(),
            "extracting"
        );

        let mut report = ExtractionReport::new();
        let mut current = 0;
        loop {
            let header = match reader.next_header() {
                Ok(Some(header)) => header,
                Ok(None) => break,
                Err(source) => {
                    error!(error = %source, "cannot read next header");
                    return Err(ArchiverError::HeaderRead { source });
                }
            };

            current += 1;
            let entry_path = Path::new(&header.pathname);
            self.progress.on_entry_start(entry_path, current);
            disk.write_header(&header).map_err(|source| {
                error!(entry = %header.pathname, error = %source, "cannot create entry");
                ArchiverError::HeaderWrite {
                    path: header.pathname.clone(),
                    source,
                }
            })?;

            match archive_entries(
                &mut *reader,
                &mut *disk,
                &header,
                &mut report,
                &mut self.progress,
            ) {
                Ok(()) => report.entries_extracted += 1,
                Err(e) => {
                    warn!(entry = %header.pathname, error = %e, "entry not finalised");
                    report.record_entry_failure(e.status());
                }
            }
            self.progress.on_entry_complete(entry_path);
        }

        if let Err(e) = disk.close() {
            warn!(error = %e, "failed to finalise extracted directories");
        }
        if let Err(e) = reader.close() {
            debug!(error = %e, "archive reader did not close cleanly");
        }

        report.duration = started.elapsed();
        self.progress.on_complete();
        info!(
            entries = report.entries_extracted,
            failed = report.entries_failed,
            bytes = report.bytes_written,
            "extraction finished"
        );
        Ok(report)
    }
}

/// Copies the data of the current entry from `reader` to `disk`, then
/// finalises the entry.
///
/// Blocks are only read when the header announces content. A block that
/// cannot be read or written ends the copy; the failure is logged and
/// counted in `report.block_errors` but does not fail the entry.
///
/// # Errors
///
/// Returns [`ArchiverError::FinishEntry`] if the entry cannot be finalised.
pub fn archive_entries<R, D>(
    reader: &mut R,
    disk: &mut D,
    header: &EntryHeader,
    report: &mut ExtractionReport,
    progress: &mut dyn ProgressCallback,
) -> Result<()>
where
    R: ReadSession + ?Sized,
    D: DiskWriteSession + ?Sized,
{
    if header.size > 0 {
        loop {
            let block = match reader.read_data_block() {
                Ok(Some(block)) => block,
                Ok(None) => break,
                Err(e) => {
                    warn!(entry = %header.pathname, error = %e, "cannot read data block");
                    report.block_errors += 1;
                    break;
                }
            };
            let len = block.data.len() as u64;
            if let Err(e) = disk.write_data_block(block.data, block.offset) {
                warn!(entry = %header.pathname, error = %e, "cannot write data block");
                report.block_errors += 1;
                break;
            }
            report.bytes_written += len;
            progress.on_bytes(len);
        }
    }

    disk.finish_entry()
        .map_err(|source: CodecError| ArchiverError::FinishEntry {
            path: header.pathname.clone(),
            source,
        })?;
    debug!(entry = %header.pathname, size = header.size, "extracted entry");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Status;
    use crate::test_utils::MockCodec;
    use crate::test_utils::ScriptedEntry;

    fn extractor(codec: MockCodec) -> Extractor<MockCodec> {
        Extractor::new(codec)
    }

    fn assert_released_once(codec: &MockCodec) {
        let counters = codec.counters();
        assert_eq!(counters.read_closes, 1);
        assert_eq!(counters.read_drops, 1);
        assert_eq!(counters.disk_closes, 1);
        assert_eq!(counters.disk_drops, 1);
    }

    #[test]
    fn test_read_allocation_failure_is_critical() {
        let codec = MockCodec::new().without_read_session();
        let mut extractor = extractor(codec.clone());
        let err = extractor.extract("a.tar").unwrap_err();
        assert_eq!(err.status(), Status::CriticalError);
        assert_eq!(codec.counters().disk_allocations, 0);
    }

    #[test]
    fn test_disk_allocation_failure_is_critical_and_releases_reader() {
        let codec = MockCodec::new().without_disk_session();
        let mut extractor = extractor(codec.clone());
        let err = extractor.extract("a.tar").unwrap_err();
        assert_eq!(err.status(), Status::CriticalError);
        assert_eq!(codec.counters().read_closes, 1);
        assert_eq!(codec.counters().read_drops, 1);
        assert!(codec.opened_containers().is_empty());
    }

    #[test]
    fn test_sessions_configured_before_open() {
        let codec = MockCodec::new();
        let mut extractor = extractor(codec.clone());
        extractor.extract("a.tar").unwrap();

        let disk = codec.disk_options().unwrap();
        assert!(disk.preserve_time && disk.preserve_perm && disk.preserve_fflags);
        assert!(codec.counters().standard_lookup);
        assert_eq!(codec.opened_containers(), vec![(
            std::path::PathBuf::from("a.tar"),
            16384
        )]);
        assert_released_once(&codec);
    }

    #[test]
    fn test_open_failure_is_cannot_open() {
        let codec = MockCodec::new().fail_read_open();
        let mut extractor = extractor(codec.clone());
        let err = extractor.extract("corrupt.tar").unwrap_err();
        assert_eq!(err.status(), Status::CannotOpenFile);
        assert_released_once(&codec);
        assert!(codec.disk_headers().is_empty());
    }

    #[test]
    fn test_empty_archive_succeeds() {
        let codec = MockCodec::new();
        let report = extractor(codec.clone()).extract("empty.tar").unwrap();
        assert_eq!(report.entries_extracted, 0);
        assert!(report.is_complete());
        assert_released_once(&codec);
    }

    #[test]
    fn test_blocks_written_at_offsets() {
        let codec = MockCodec::new().with_entries(vec![
            ScriptedEntry::file("a.txt", &[b"abc", b"de"]),
            ScriptedEntry::file("empty", &[]),
        ]);
        let report = extractor(codec.clone()).extract("x.tar").unwrap();
        assert_eq!(report.entries_extracted, 2);
        assert_eq!(report.bytes_written, 5);
        assert_eq!(
            codec.disk_blocks(),
            vec![
                ("a.txt".to_string(), b"abc".to_vec(), 0),
                ("a.txt".to_string(), b"de".to_vec(), 3),
            ]
        );
        assert_eq!(codec.counters().disk_finishes, 2);
        assert_released_once(&codec);
    }

    #[test]
    fn test_zero_size_entry_reads_no_blocks() {
        let codec = MockCodec::new().with_entries(vec![ScriptedEntry::file("empty", &[])]);
        extractor(codec.clone()).extract("x.tar").unwrap();
        assert_eq!(codec.counters().block_reads, 0);
    }

    #[test]
    fn test_header_read_failure_stops() {
        let codec = MockCodec::new()
            .with_entries(vec![ScriptedEntry::file("a", &[b"1"])])
            .fail_next_header_at(1);
        let err = extractor(codec.clone()).extract("x.tar").unwrap_err();
        assert_eq!(err.status(), Status::AccessFileFailed);
        assert_eq!(codec.disk_headers(), vec!["a".to_string()]);
        assert_released_once(&codec);
    }

    #[test]
    fn test_disk_header_failure_stops() {
        let codec = MockCodec::new()
            .with_entries(vec![
                ScriptedEntry::file("a", &[b"1"]),
                ScriptedEntry::file("b", &[b"2"]),
            ])
            .fail_disk_header_at(0);
        let err = extractor(codec.clone()).extract("x.tar").unwrap_err();
        assert!(matches!(err, ArchiverError::HeaderWrite { .. }));
        assert!(codec.disk_blocks().is_empty());
        assert_released_once(&codec);
    }

    #[test]
    fn test_block_errors_do_not_fail_entry() {
        let codec = MockCodec::new()
            .with_entries(vec![
                ScriptedEntry::file("a", &[b"1", b"2"]).failing_read_at(0),
                ScriptedEntry::file("b", &[b"3"]),
            ])
            .fail_disk_write();
        let report = extractor(codec.clone()).extract("x.tar").unwrap();
        assert_eq!(report.entries_extracted, 2);
        assert_eq!(report.block_errors, 2);
        assert!(report.is_complete());
        assert_eq!(report.status(), Status::Success);
    }

    #[test]
    fn test_finish_failure_is_counted_and_extraction_still_succeeds() {
        let codec = MockCodec::new()
            .with_entries(vec![
                ScriptedEntry::file("a", &[b"1"]),
                ScriptedEntry::file("b", &[b"2"]),
            ])
            .fail_disk_finish_at(0);
        let report = extractor(codec.clone()).extract("x.tar").unwrap();
        assert_eq!(report.entries_extracted, 1);
        assert_eq!(report.entries_failed, 1);
        assert_eq!(report.first_entry_failure, Some(Status::AccessFileFailed));
        assert_eq!(report.status(), Status::Success);
        assert!(!report.is_complete());
        assert_eq!(codec.disk_headers(), vec!["a".to_string(), "b".to_string()]);
        assert_released_once(&codec);
    }

    #[test]
    fn test_repeated_extractions_use_fresh_sessions() {
        let codec = MockCodec::new();
        let mut extractor = extractor(codec.clone());
        extractor.extract("a.tar").unwrap();
        extractor.extract("b.tar").unwrap();
        let counters = codec.counters();
        assert_eq!(counters.read_closes, 2);
        assert_eq!(counters.disk_drops, 2);
    }
}
