//! Error types for archiving and extraction operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::Status;
use crate::codec::CodecError;

/// Result type alias using `ArchiverError`.
pub type Result<T> = std::result::Result<T, ArchiverError>;

/// Which codec session could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Container read session.
    Read,
    /// Container write session.
    Write,
    /// Disk materialisation session.
    Disk,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("archive reader"),
            Self::Write => f.write_str("archive writer"),
            Self::Disk => f.write_str("disk writer"),
        }
    }
}

/// Errors that can occur while packing or unpacking a container.
///
/// Every variant maps onto exactly one [`Status`] through
/// [`ArchiverError::status`].
#[derive(Error, Debug)]
pub enum ArchiverError {
    /// The codec could not allocate a session.
    #[error("failed to create {0}")]
    SessionAllocation(SessionKind),

    /// A freshly allocated session rejected its setup.
    #[error("failed to configure {kind}: {source}")]
    Configure {
        /// Session being configured.
        kind: SessionKind,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// Configuration values are out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A container could not be opened.
    #[error("cannot open archive {path}: {source}")]
    CannotOpen {
        /// The container path.
        path: PathBuf,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// The next entry header could not be read from the container.
    #[error("failed to read archive header: {source}")]
    HeaderRead {
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// An entry header could not be written to disk.
    #[error("failed to write header for {path}: {source}")]
    HeaderWrite {
        /// Entry pathname.
        path: String,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// An extracted entry could not be finalised.
    #[error("failed to finish entry {path}: {source}")]
    FinishEntry {
        /// Entry pathname.
        path: String,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// A source file could not be read, or its header or data could not be
    /// written into the container.
    #[error("failed to archive {path}: {reason}")]
    WriteFailed {
        /// The source file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// More positional arguments were given than the command line accepts.
    #[error("too many arguments: expected at most 1, got {count}")]
    TooManyArgs {
        /// Number of positional arguments received.
        count: usize,
    },

    /// The user left the interactive browser without selecting anything.
    #[error("cancelled by user")]
    UserExit,
}

impl ArchiverError {
    /// Returns the status code this error surfaces as.
    ///
    /// # Examples
    ///
    /// ```
    /// use bttf_core::ArchiverError;
    /// use bttf_core::Status;
    ///
    /// assert_eq!(ArchiverError::UserExit.status(), Status::UserExit);
    /// let err = ArchiverError::TooManyArgs { count: 3 };
    /// assert_eq!(err.status(), Status::TooManyArgs);
    /// ```
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::SessionAllocation(_) | Self::Configure { .. } | Self::InvalidConfig { .. } => {
                Status::CriticalError
            }
            Self::CannotOpen { .. } => Status::CannotOpenFile,
            Self::HeaderRead { .. } | Self::HeaderWrite { .. } | Self::FinishEntry { .. } => {
                Status::AccessFileFailed
            }
            Self::WriteFailed { .. } => Status::WriteFailed,
            Self::TooManyArgs { .. } => Status::TooManyArgs,
            Self::UserExit => Status::UserExit,
        }
    }

    pub(crate) fn write_failed(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::WriteFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
