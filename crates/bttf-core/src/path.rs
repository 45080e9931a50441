//! Archive-relative name derivation.
//!
//! Every archiving operation computes the directory prefix of its root once
//! and strips it from each descendant path. The prefix lives in an
//! [`ArchiveContext`] value that is passed down explicitly, so one
//! [`Archiver`](crate::Archiver) can run any number of operations in sequence.

use std::path::Path;
use std::path::PathBuf;

/// Returns `path` up to and including its last separator.
///
/// When `path` contains no separator the whole path is returned unchanged,
/// so callers must not assume the result ends with a separator.
///
/// # Examples
///
/// ```
/// use bttf_core::path::compute_prefix;
///
/// assert_eq!(compute_prefix("/a/b/c.txt"), "/a/b/");
/// assert_eq!(compute_prefix("c.txt"), "c.txt");
/// ```
pub fn compute_prefix(path: impl AsRef<Path>) -> String {
    let path = path.as_ref().to_string_lossy();
    match path.rfind(std::path::is_separator) {
        // Separators are ASCII, so `idx + 1` stays on a char boundary.
        Some(idx) => path[..=idx].to_string(),
        None => path.into_owned(),
    }
}

/// Strips `prefix` from `path` when `path` starts with it.
///
/// Otherwise `path` is returned unmodified and the entry is archived under
/// its full original name.
///
/// # Examples
///
/// ```
/// use bttf_core::path::to_archive_name;
///
/// assert_eq!(to_archive_name("/a/b/c.txt", "/a/b/"), "c.txt");
/// assert_eq!(to_archive_name("/x/y.txt", "/a/b/"), "/x/y.txt");
/// ```
pub fn to_archive_name(path: impl AsRef<Path>, prefix: &str) -> String {
    let path = path.as_ref().to_string_lossy();
    path.strip_prefix(prefix)
        .map_or_else(|| path.to_string(), ToString::to_string)
}

/// Per-operation naming context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveContext {
    root: PathBuf,
    prefix: String,
}

impl ArchiveContext {
    /// Creates the context for archiving `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let prefix = compute_prefix(&root);
        Self { root, prefix }
    }

    /// The root passed to the operation.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The prefix stripped from every descendant path.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the name `path` is archived under.
    #[must_use]
    pub fn archive_name(&self, path: impl AsRef<Path>) -> String {
        to_archive_name(path, &self.prefix)
    }
}
