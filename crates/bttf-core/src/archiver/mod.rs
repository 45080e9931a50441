//! Packing files and directory trees into a container.
//!
//! An [`Archiver`] owns one write session from construction until it is
//! finished or dropped. Each [`Archiver::archive_item`] call is an
//! independent operation with its own [`ArchiveContext`], so several roots
//! can be packed into the same container.
//!
//! Failure policy differs by entry point: a single-file root fails fast,
//! while directory archiving logs and counts per-file failures, keeps going,
//! and surfaces the first failure through [`ArchiveReport::status`].

pub mod walker;

use std::fs;
use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use std::time::UNIX_EPOCH;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

pub use self::walker::Batch;
pub use self::walker::Batches;
pub use self::walker::DirectoryWalker;
use crate::ArchiveConfig;
use crate::ArchiveReport;
use crate::ArchiverError;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::codec::ArchiveCodec;
use crate::codec::EntryHeader;
use crate::codec::SessionGuard;
use crate::codec::WriteSession;
use crate::error::SessionKind;
use crate::path::ArchiveContext;

/// Streams files into a container through a codec write session.
///
/// # Examples
///
/// ```no_run
/// use bttf_core::Archiver;
/// use bttf_core::codec::TarCodec;
///
/// # fn main() -> Result<(), bttf_core::ArchiverError> {
/// let mut archiver = Archiver::create(&TarCodec::new(), "project.tar.xz")?;
/// let report = archiver.archive_item("project")?;
/// println!("{} files, status {}", report.files_added, report.status());
/// let totals = archiver.finish()?;
/// println!("{} bytes on disk", totals.bytes_compressed);
/// # Ok(())
/// # }
/// ```
pub struct Archiver<C: ArchiveCodec, P: ProgressCallback = NoopProgress> {
    session: SessionGuard<C::Writer>,
    config: ArchiveConfig,
    output: PathBuf,
    buffer: Vec<u8>,
    totals: ArchiveReport,
    entries_started: usize,
    progress: P,
}

impl<C: ArchiveCodec> Archiver<C> {
    /// Creates the container at `output` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::SessionAllocation`] or
    /// [`ArchiverError::Configure`] if the write session cannot be set up,
    /// and [`ArchiverError::CannotOpen`] if `output` cannot be created.
    pub fn create(codec: &C, output: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(codec, output, ArchiveConfig::default())
    }

    /// Creates the container at `output`.
    ///
    /// # Errors
    ///
    /// As [`Archiver::create`], plus [`ArchiverError::InvalidConfig`].
    pub fn with_config(codec: &C, output: impl AsRef<Path>, config: ArchiveConfig) -> Result<Self> {
        config.validate()?;
        let output = output.as_ref();

        let session = codec
            .write_session()
            .ok_or(ArchiverError::SessionAllocation(SessionKind::Write))?;
        let mut session = SessionGuard::labelled(session, "archive writer");

        let configure = |source| ArchiverError::Configure {
            kind: SessionKind::Write,
            source,
        };
        session
            .add_filter(config.filter, config.compression_level)
            .map_err(configure)?;
        session.set_format(config.format).map_err(configure)?;
        session.open_filename(output).map_err(|source| {
            error!(output = %output.display(), error = %source, "cannot create archive");
            ArchiverError::CannotOpen {
                path: output.to_path_buf(),
                source,
            }
        })?;

        info!(
            output = %output.display(),
            filter = config.filter.name(),
            format = config.format.name(),
            "archive created"
        );
        Ok(Self {
            session,
            buffer: vec![0; config.chunk_size],
            config,
            output: std::path::absolute(output).unwrap_or_else(|_| output.to_path_buf()),
            totals: ArchiveReport::new(),
            entries_started: 0,
            progress: NoopProgress,
        })
    }
}

impl<C: ArchiveCodec, P: ProgressCallback> Archiver<C, P> {
    /// Replaces the progress callback.
    pub fn with_progress<Q: ProgressCallback>(self, progress: Q) -> Archiver<C, Q> {
        Archiver {
            session: self.session,
            config: self.config,
            output: self.output,
            buffer: self.buffer,
            totals: self.totals,
            entries_started: self.entries_started,
            progress,
        }
    }

    /// Container being written.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Settings in effect.
    #[must_use]
    pub const fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Statistics accumulated over every operation so far.
    #[must_use]
    pub const fn totals(&self) -> &ArchiveReport {
        &self.totals
    }

    /// Progress callback.
    #[must_use]
    pub const fn progress(&self) -> &P {
        &self.progress
    }

    /// Archives `root`: a directory recursively, a regular file directly.
    ///
    /// Entries are named relative to the directory containing `root`, so
    /// packing `/data/project` yields names such as `project/src/lib.rs`.
    /// Other file types (and roots that cannot be inspected) are logged as
    /// unsupported and produce an empty, successful report.
    ///
    /// # Errors
    ///
    /// Only a single-file root fails: [`ArchiverError::WriteFailed`] when
    /// its header or content cannot be written. Directory failures are
    /// reported through [`ArchiveReport::status`].
    pub fn archive_item(&mut self, root: impl AsRef<Path>) -> Result<ArchiveReport> {
        let started = Instant::now();
        let root = root.as_ref();
        let root = std::path::absolute(root).map_err(|e| ArchiverError::write_failed(root, e))?;
        let ctx = ArchiveContext::new(&root);
        debug!(root = %root.display(), prefix = ctx.prefix(), "archiving item");

        let mut report = match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => self.add_directory(&ctx),
            Ok(meta) if meta.is_file() => match self.add_file(&ctx, &root) {
                Ok(bytes) => ArchiveReport {
                    files_added: 1,
                    bytes_read: bytes,
                    ..ArchiveReport::default()
                },
                Err(e) => {
                    self.totals.record_failure(e.status());
                    self.progress.on_complete();
                    return Err(e);
                }
            },
            Ok(_) => {
                warn!(root = %root.display(), "unsupported file type");
                ArchiveReport::new()
            }
            Err(e) => {
                warn!(root = %root.display(), error = %e, "unsupported file type");
                ArchiveReport::new()
            }
        };

        report.duration = started.elapsed();
        self.totals.merge(&report);
        self.progress.on_complete();
        info!(
            root = %root.display(),
            files = report.files_added,
            failed = report.files_failed,
            skipped = report.files_skipped,
            "item archived"
        );
        Ok(report)
    }

    /// Adds one regular file under its archive-relative name and streams its
    /// content. Returns the content bytes written.
    ///
    /// The recorded size comes from `stat`; when that fails the entry is
    /// written with size 0 and the failure is logged.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::WriteFailed`] if the header cannot be
    /// written (no content is streamed then) or if streaming fails.
    pub fn add_file(&mut self, ctx: &ArchiveContext, path: &Path) -> Result<u64> {
        let name = ctx.archive_name(path);
        let (size, mtime) = match stat(path) {
            Ok(stat) => stat,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat file, recording size 0");
                (0, 0)
            }
        };
        let header =
            EntryHeader::regular(name, size, self.config.entry_permissions).with_mtime(mtime);

        self.entries_started += 1;
        self.progress.on_entry_start(path, self.entries_started);
        let result = self.write_entry(&header, path);
        self.progress.on_entry_complete(path);

        if let Ok(bytes) = result {
            debug!(entry = header.pathname(), size, bytes, "added file");
        }
        result
    }

    fn write_entry(&mut self, header: &EntryHeader, path: &Path) -> Result<u64> {
        self.session
            .write_header(header)
            .map_err(|e| ArchiverError::write_failed(path, e))?;
        let bytes = self.write_data(path)?;
        self.session
            .finish_entry()
            .map_err(|e| ArchiverError::write_failed(path, e))?;
        Ok(bytes)
    }

    /// Streams the content of `path` into the current entry, one chunk at a
    /// time. Returns the bytes streamed. An empty file makes no data-write
    /// calls.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::WriteFailed`] if the file cannot be opened or
    /// read, or if the codec rejects a chunk.
    pub fn write_data(&mut self, path: &Path) -> Result<u64> {
        let mut file = File::open(path).map_err(|e| ArchiverError::write_failed(path, e))?;
        let mut total = 0u64;
        loop {
            self.buffer.fill(0);
            let read = match file.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ArchiverError::write_failed(path, e)),
            };
            self.session
                .write_data(&self.buffer[..read])
                .map_err(|e| ArchiverError::write_failed(path, e))?;
            total += read as u64;
            self.progress.on_bytes(read as u64);
        }
        Ok(total)
    }

    /// Archives every regular file below `ctx.root()`, batch by batch.
    ///
    /// Per-file failures are logged and counted; traversal continues.
    pub fn add_directory(&mut self, ctx: &ArchiveContext) -> ArchiveReport {
        let walker =
            DirectoryWalker::new(ctx.root()).with_capacity(self.config.batch_capacity);
        let mut report = ArchiveReport::new();
        let mut batches = walker.batches();

        for batch in &mut batches {
            report.batches_flushed += 1;
            for path in batch {
                if path == self.output {
                    debug!(path = %path.display(), "skipping the archive being written");
                    continue;
                }
                match self.add_file(ctx, &path) {
                    Ok(bytes) => {
                        report.files_added += 1;
                        report.bytes_read += bytes;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to archive file");
                        report.record_failure(e.status());
                    }
                }
            }
        }

        report.files_skipped = batches.skipped();
        report
    }

    /// Closes the container and returns the accumulated statistics.
    ///
    /// Dropping an archiver without finishing still closes the container,
    /// but any close failure is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::WriteFailed`] if the container cannot be
    /// completed.
    pub fn finish(self) -> Result<ArchiveReport> {
        let Self {
            session,
            output,
            mut totals,
            ..
        } = self;
        let session = session
            .close()
            .map_err(|e| ArchiverError::write_failed(&output, e))?;
        totals.bytes_compressed = session.bytes_written();
        info!(
            output = %output.display(),
            files = totals.files_added,
            bytes = totals.bytes_compressed,
            "archive finished"
        );
        Ok(totals)
    }
}

/// Size and modification time of `path`.
fn stat(path: &Path) -> std::io::Result<(u64, u64)> {
    let meta = fs::metadata(path)?;
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());
    Ok((meta.len(), mtime))
}
