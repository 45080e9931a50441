//! Outcome codes shared by every archiving operation.

use std::fmt;

/// Outcome of an archive, extract, or command-line operation.
///
/// The numeric values are stable: the command-line binary uses them as its
/// process exit code.
///
/// # Examples
///
/// ```
/// use bttf_core::Status;
///
/// assert_eq!(Status::Success.code(), 0);
/// assert_eq!(Status::UserExit.code(), 6);
/// assert!(!Status::WriteFailed.is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// The operation completed.
    #[default]
    Success,
    /// A codec session could not be allocated, or configuration was invalid.
    CriticalError,
    /// The container could not be opened for reading.
    CannotOpenFile,
    /// An entry header could not be read or written, or an entry could not
    /// be finalised.
    AccessFileFailed,
    /// Reading a source file or writing its data into the container failed.
    WriteFailed,
    /// More positional arguments than the command line accepts.
    TooManyArgs,
    /// The interactive browser was cancelled.
    UserExit,
}

impl Status {
    /// Every status, in code order.
    pub const ALL: [Self; 7] = [
        Self::Success,
        Self::CriticalError,
        Self::CannotOpenFile,
        Self::AccessFileFailed,
        Self::WriteFailed,
        Self::TooManyArgs,
        Self::UserExit,
    ];

    /// Returns the stable numeric code for this status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::CriticalError => 1,
            Self::CannotOpenFile => 2,
            Self::AccessFileFailed => 3,
            Self::WriteFailed => 4,
            Self::TooManyArgs => 5,
            Self::UserExit => 6,
        }
    }

    /// Returns `true` for [`Status::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the status for a numeric code, if there is one.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Short machine-friendly name, used in JSON output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::CriticalError => "critical_error",
            Self::CannotOpenFile => "cannot_open_file",
            Self::AccessFileFailed => "access_file_failed",
            Self::WriteFailed => "write_failed",
            Self::TooManyArgs => "too_many_args",
            Self::UserExit => "user_exit",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_sequential() {
        for (index, status) in Status::ALL.iter().enumerate() {
            assert_eq!(usize::from(status.code()), index);
        }
    }

    #[test]
    fn test_from_code_round_trip() {
        for status in Status::ALL {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(7), None);
    }

    #[test]
    fn test_only_success_is_success() {
        assert!(Status::Success.is_success());
        assert!(
            Status::ALL[1..]
                .iter()
                .all(|status| !status.is_success())
        );
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(Status::CannotOpenFile.to_string(), "cannot_open_file");
        assert_eq!(Status::default(), Status::Success);
    }
}
