//! Bounded-memory directory traversal.
//!
//! The walker hands regular-file paths to the archiver in batches of a fixed
//! capacity. A batch is emitted the moment it is full and a non-empty
//! remainder once traversal ends, so memory stays bounded by the capacity
//! regardless of tree size.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::trace;
use tracing::warn;
use walkdir::DirEntry;
use walkdir::WalkDir;

/// Ordered, bounded list of file paths awaiting archiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    paths: Vec<PathBuf>,
    capacity: usize,
}

impl Batch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            paths: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Number of paths in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if the batch holds no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns true once the batch reached its capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.paths.len() >= self.capacity
    }

    /// Paths in traversal order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl IntoIterator for Batch {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

/// Walks a directory tree yielding regular files in batches.
///
/// Symbolic links are never followed and never yielded. Directories,
/// fifos, sockets and devices are traversed or ignored but never yielded.
///
/// # Examples
///
/// ```no_run
/// use bttf_core::archiver::DirectoryWalker;
///
/// let mut batches = DirectoryWalker::new("project").batches();
/// for batch in &mut batches {
///     for path in batch {
///         println!("{}", path.display());
///     }
/// }
/// println!("skipped {}", batches.skipped());
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
    capacity: usize,
}

impl DirectoryWalker {
    /// Creates a walker with the default batch capacity.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            capacity: crate::config::DEFAULT_BATCH_CAPACITY,
        }
    }

    /// Sets the batch capacity. Zero is treated as one.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Root being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts the traversal.
    #[must_use]
    pub fn batches(&self) -> Batches {
        Batches {
            entries: WalkDir::new(&self.root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
            capacity: self.capacity,
            skipped: 0,
            finished: false,
        }
    }
}

/// Iterator over the batches of one traversal.
pub struct Batches {
    entries: walkdir::IntoIter,
    capacity: usize,
    skipped: usize,
    finished: bool,
}

impl std::fmt::Debug for Batches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batches")
            .field("capacity", &self.capacity)
            .field("skipped", &self.skipped)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Batches {
    /// Entries that could not be visited so far.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Batches {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.finished {
            return None;
        }

        let mut batch = Batch::with_capacity(self.capacity);
        for entry in self.entries.by_ref() {
            match entry {
                Ok(entry) => {
                    if is_archivable(&entry) {
                        batch.push(entry.into_path());
                        if batch.is_full() {
                            debug!(files = batch.len(), "batch full");
                            return Some(batch);
                        }
                    }
                }
                Err(e) => {
                    self.skipped += 1;
                    report_walk_error(&e);
                }
            }
        }

        self.finished = true;
        if batch.is_empty() {
            None
        } else {
            debug!(files = batch.len(), "flushing remainder");
            Some(batch)
        }
    }
}

/// Symlink guard plus regular-file check.
fn is_archivable(entry: &DirEntry) -> bool {
    if entry.path_is_symlink() || entry.file_type().is_symlink() {
        trace!(path = %entry.path().display(), "not following symbolic link");
        return false;
    }
    if entry.file_type().is_file() {
        return true;
    }
    if !entry.file_type().is_dir() {
        debug!(path = %entry.path().display(), "skipping special file");
    }
    false
}

fn report_walk_error(err: &walkdir::Error) {
    let path = err
        .path()
        .map_or_else(String::new, |p| p.display().to_string());
    if err
        .io_error()
        .is_some_and(|io| io.kind() == ErrorKind::PermissionDenied)
    {
        debug!(path = %path, "permission denied, skipping");
    } else {
        warn!(path = %path, error = %err, "cannot read directory entry, skipping");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn populate(dir: &Path, count: usize) {
        for i in 0..count {
            fs::write(dir.join(format!("f{i:04}.txt")), b"x").unwrap();
        }
    }

    fn sizes(walker: &DirectoryWalker) -> Vec<usize> {
        walker.batches().map(|b| b.len()).collect()
    }

    #[test]
    fn test_empty_directory_yields_nothing() {
        let temp = TempDir::new().unwrap();
        assert!(sizes(&DirectoryWalker::new(temp.path())).is_empty());
    }

    #[test]
    fn test_exactly_full_batch_has_no_remainder() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 100);
        assert_eq!(sizes(&DirectoryWalker::new(temp.path())), vec![100]);
    }

    #[test]
    fn test_one_over_capacity_flushes_remainder() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 101);
        assert_eq!(sizes(&DirectoryWalker::new(temp.path())), vec![100, 1]);
    }

    #[test]
    fn test_custom_capacity_and_nesting() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 4);
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        populate(&nested, 3);

        let walker = DirectoryWalker::new(temp.path()).with_capacity(3);
        assert_eq!(sizes(&walker), vec![3, 3, 1]);

        let all: Vec<PathBuf> = walker.batches().flatten().collect();
        assert!(all.iter().all(|p| p.is_file()));
        assert!(all.contains(&nested.join("f0002.txt")));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 2);
        let walker = DirectoryWalker::new(temp.path()).with_capacity(0);
        assert_eq!(sizes(&walker), vec![1, 1]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_never_yielded_or_followed() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        populate(outside.path(), 5);
        fs::write(temp.path().join("real.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("linked_dir")).unwrap();
        std::os::unix::fs::symlink(
            temp.path().join("real.txt"),
            temp.path().join("linked_file.txt"),
        )
        .unwrap();

        let all: Vec<PathBuf> = DirectoryWalker::new(temp.path())
            .batches()
            .flatten()
            .collect();
        assert_eq!(all, vec![temp.path().join("real.txt")]);
    }

    #[test]
    fn test_missing_root_counts_as_skipped() {
        let temp = TempDir::new().unwrap();
        let mut batches = DirectoryWalker::new(temp.path().join("missing")).batches();
        assert!(batches.next().is_none());
        assert_eq!(batches.skipped(), 1);
        assert!(batches.next().is_none());
    }
}
