//! Operation reports and progress callbacks.

use std::path::Path;
use std::time::Duration;

use crate::Status;

/// Statistics for an archiving operation.
///
/// Directory archiving is best effort: failures are counted here and the
/// first one is surfaced through [`ArchiveReport::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Regular files written into the container.
    pub files_added: usize,

    /// Files whose header or data could not be written.
    pub files_failed: usize,

    /// Walker entries that could not be visited (unreadable entries,
    /// permission-denied subtrees).
    pub files_skipped: usize,

    /// Batches handed from the walker to the archiver.
    pub batches_flushed: usize,

    /// Source bytes read and streamed into the container.
    pub bytes_read: u64,

    /// Size of the finished container. Zero until the archiver is finished.
    pub bytes_compressed: u64,

    /// Status of the first failure, if any.
    pub first_failure: Option<Status>,

    /// Wall time spent.
    pub duration: Duration,
}

impl ArchiveReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a failed file. Only the first failure's status is kept.
    pub fn record_failure(&mut self, status: Status) {
        self.files_failed += 1;
        if self.first_failure.is_none() {
            self.first_failure = Some(status);
        }
    }

    /// The status this operation surfaces.
    #[must_use]
    pub fn status(&self) -> Status {
        self.first_failure.unwrap_or_default()
    }

    /// Returns true if every file was archived.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.first_failure.is_none()
    }

    /// Folds another operation's statistics into this report.
    pub fn merge(&mut self, other: &Self) {
        self.files_added += other.files_added;
        self.files_failed += other.files_failed;
        self.files_skipped += other.files_skipped;
        self.batches_flushed += other.batches_flushed;
        self.bytes_read += other.bytes_read;
        self.bytes_compressed = self.bytes_compressed.max(other.bytes_compressed);
        self.first_failure = self.first_failure.or(other.first_failure);
        self.duration += other.duration;
    }

    /// Source bytes per container byte. Zero when either side is zero.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_compressed == 0 || self.bytes_read == 0 {
            return 0.0;
        }
        self.bytes_read as f64 / self.bytes_compressed as f64
    }
}

/// Statistics for an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Entries written to disk.
    pub entries_extracted: usize,

    /// Entries that failed to finalise. They do not change the status.
    pub entries_failed: usize,

    /// Data blocks that could not be read or written. The affected entry is
    /// still finalised.
    pub block_errors: usize,

    /// Content bytes written to disk.
    pub bytes_written: u64,

    /// Status of the first entry that failed to finalise, if any.
    pub first_entry_failure: Option<Status>,

    /// Wall time spent.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts an entry that failed to finalise. Only the first status is
    /// kept.
    pub fn record_entry_failure(&mut self, status: Status) {
        self.entries_failed += 1;
        if self.first_entry_failure.is_none() {
            self.first_entry_failure = Some(status);
        }
    }

    /// The status this extraction surfaces.
    ///
    /// An extraction that reaches the end of the archive succeeds, whatever
    /// happened to individual entries. Failures that stop it early are
    /// returned as errors instead of a report.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn status(&self) -> Status {
        Status::Success
    }

    /// Returns true if every entry was finalised.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.entries_failed == 0
    }
}

/// Callback trait for progress reporting.
///
/// # Examples
///
/// ```
/// use bttf_core::ProgressCallback;
/// use std::path::Path;
///
/// #[derive(Default)]
/// struct Counter {
///     entries: usize,
/// }
///
/// impl ProgressCallback for Counter {
///     fn on_entry_start(&mut self, _path: &Path, current: usize) {
///         self.entries = current;
///     }
///
///     fn on_bytes(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, _path: &Path) {}
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait ProgressCallback {
    /// Called before an entry is processed. `current` is 1-indexed; the total
    /// is not known up front because directories are walked lazily.
    fn on_entry_start(&mut self, path: &Path, current: usize);

    /// Called after a chunk of entry content has been streamed.
    fn on_bytes(&mut self, bytes: u64);

    /// Called when an entry has been processed, successfully or not.
    fn on_entry_complete(&mut self, path: &Path);

    /// Called once when the operation ends.
    fn on_complete(&mut self);
}

/// Progress callback that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _path: &Path, _current: usize) {}

    fn on_bytes(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _path: &Path) {}

    fn on_complete(&mut self) {}
}
