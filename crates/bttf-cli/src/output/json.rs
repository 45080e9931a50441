//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::Operation;
use super::formatter::OutputFormatter;
use anyhow::Result;
use bttf_core::ArchiveReport;
use bttf_core::ArchiverError;
use bttf_core::ExtractionReport;
use bttf_core::Status;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

#[derive(Serialize)]
struct PackOutput {
    output_path: String,
    files_added: usize,
    files_failed: usize,
    files_skipped: usize,
    batches_flushed: usize,
    bytes_read: u64,
    bytes_compressed: u64,
    compression_ratio: f64,
    duration_ms: u128,
}

impl PackOutput {
    fn new(output: &Path, report: &ArchiveReport) -> Self {
        Self {
            output_path: output.display().to_string(),
            files_added: report.files_added,
            files_failed: report.files_failed,
            files_skipped: report.files_skipped,
            batches_flushed: report.batches_flushed,
            bytes_read: report.bytes_read,
            bytes_compressed: report.bytes_compressed,
            compression_ratio: report.compression_ratio(),
            duration_ms: report.duration.as_millis(),
        }
    }
}

#[derive(Serialize)]
struct UnpackOutput {
    archive: String,
    entries_extracted: usize,
    entries_failed: usize,
    block_errors: usize,
    bytes_written: u64,
    duration_ms: u128,
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_pack_result(&self, output: &Path, report: &ArchiveReport) -> Result<()> {
        let data = PackOutput::new(output, report);
        Self::output(&JsonOutput::report(Operation::Pack, report.status(), data))
    }

    fn format_unpack_result(&self, container: &Path, report: &ExtractionReport) -> Result<()> {
        let data = UnpackOutput {
            archive: container.display().to_string(),
            entries_extracted: report.entries_extracted,
            entries_failed: report.entries_failed,
            block_errors: report.block_errors,
            bytes_written: report.bytes_written,
            duration_ms: report.duration.as_millis(),
        };
        Self::output(&JsonOutput::report(Operation::Unpack, report.status(), data))
    }

    fn format_failure(&self, operation: Operation, error: &ArchiverError) -> Result<()> {
        Self::output(&JsonOutput::<()>::error(
            operation,
            error.status(),
            error.to_string(),
        ))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error(Operation::Usage, Status::CriticalError, format!("{error:#}"));
        let _ = Self::output(&output);
    }
}
