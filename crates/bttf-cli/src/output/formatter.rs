//! Output formatter trait for CLI results.

use anyhow::Result;
use bttf_core::ArchiveReport;
use bttf_core::ArchiverError;
use bttf_core::ExtractionReport;
use bttf_core::Status;
use serde::Serialize;
use std::path::Path;

/// Operation a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Pack,
    Unpack,
    Usage,
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the result of packing into `output`
    fn format_pack_result(&self, output: &Path, report: &ArchiveReport) -> Result<()>;

    /// Format the result of unpacking `container`
    fn format_unpack_result(&self, container: &Path, report: &ExtractionReport) -> Result<()>;

    /// Format an operation that stopped with an error
    fn format_failure(&self, operation: Operation, error: &ArchiverError) -> Result<()>;

    /// Format an error outside any operation (terminal, working directory)
    fn format_error(&self, error: &anyhow::Error);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: Operation,
    pub status: &'static str,
    pub code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn report(operation: Operation, status: Status, data: T) -> Self {
        Self {
            operation,
            status: status.name(),
            code: status.code(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(operation: Operation, status: Status, error: impl Into<String>) -> Self {
        Self {
            operation,
            status: status.name(),
            code: status.code(),
            data: None,
            error: Some(error.into()),
        }
    }
}
