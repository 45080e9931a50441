//! Error conversion utilities for CLI.
//!
//! Turns bttf-core's typed errors into one-line messages with actionable
//! guidance for the terminal.

use bttf_core::ArchiverError;

/// Describes `err` for a human, with a hint when one helps.
pub fn describe(err: &ArchiverError) -> String {
    match err {
        ArchiverError::CannotOpen { path, source } => format!(
            "Cannot open '{}': {source}\n\
             HINT: Check that the file exists and is a tar container (optionally gz, bz2, xz or zst compressed).",
            path.display()
        ),
        ArchiverError::HeaderRead { source } => format!(
            "Cannot read the next entry: {source}\n\
             HINT: The archive may be truncated or corrupted."
        ),
        ArchiverError::HeaderWrite { path, source } => format!(
            "Cannot create '{path}': {source}\n\
             HINT: Check permissions of the destination directory."
        ),
        ArchiverError::WriteFailed { path, reason } => format!(
            "Cannot archive '{}': {reason}\n\
             HINT: Check that the file is readable and the output disk has space.",
            path.display()
        ),
        ArchiverError::TooManyArgs { count } => format!(
            "Expected at most one ARCHIVE, got {count}\n\
             HINT: Run without arguments to pack, or with one archive to unpack."
        ),
        other => other.to_string(),
    }
}
