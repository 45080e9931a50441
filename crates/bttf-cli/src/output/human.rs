//! Human-readable output formatter with colors and styling.

use super::FAILURE;
use super::PACK_SUCCESS;
use super::UNPACK_SUCCESS;
use super::formatter::Operation;
use super::formatter::OutputFormatter;
use crate::error::describe;
use anyhow::Result;
use bttf_core::ArchiveReport;
use bttf_core::ArchiverError;
use bttf_core::ExtractionReport;
use bttf_core::Status;
use console::Term;
use console::style;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        for (i, c) in s.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }
        result.chars().rev().collect()
    }

    fn success_line(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(message);
        }
    }

    fn failure_line(&self, status: Status) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {FAILURE}", style("✗").red().bold()));
        } else {
            let _ = self.term.write_line(FAILURE);
        }
        let _ = self
            .err_term
            .write_line(&format!("  Status: {status} ({})", status.code()));
    }

    fn detail(&self, label: &str, value: impl std::fmt::Display) {
        let _ = self.term.write_line(&format!("  {label:<17}{value}"));
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_pack_result(&self, output: &Path, report: &ArchiveReport) -> Result<()> {
        let status = report.status();
        if status.is_success() {
            self.success_line(PACK_SUCCESS);
        } else {
            self.failure_line(status);
            let _ = self.err_term.write_line(&format!(
                "  {} of {} files could not be archived; see the log for details",
                Self::format_number(report.files_failed),
                Self::format_number(report.files_failed + report.files_added)
            ));
        }

        if self.verbose && !self.quiet {
            self.detail("Archive:", output.display());
            self.detail("Files added:", Self::format_number(report.files_added));
            self.detail("Files skipped:", Self::format_number(report.files_skipped));
            self.detail("Total size:", Self::format_size(report.bytes_read));
            if report.bytes_compressed > 0 {
                self.detail("Compressed size:", Self::format_size(report.bytes_compressed));
                self.detail(
                    "Ratio:",
                    format!("{:.2}x", report.compression_ratio()),
                );
            }
            self.detail("Duration:", format!("{:?}", report.duration));
        }
        Ok(())
    }

    fn format_unpack_result(&self, container: &Path, report: &ExtractionReport) -> Result<()> {
        self.success_line(UNPACK_SUCCESS);
        if !report.is_complete() {
            let _ = self.err_term.write_line(&format!(
                "  {} entries could not be finalised; see the log for details",
                Self::format_number(report.entries_failed)
            ));
        }

        if self.verbose && !self.quiet {
            self.detail("Archive:", container.display());
            self.detail(
                "Entries restored:",
                Self::format_number(report.entries_extracted),
            );
            self.detail("Total size:", Self::format_size(report.bytes_written));
            if report.block_errors > 0 {
                self.detail("Block errors:", Self::format_number(report.block_errors));
            }
            self.detail("Duration:", format!("{:?}", report.duration));
        }
        Ok(())
    }

    fn format_failure(&self, _operation: Operation, error: &ArchiverError) -> Result<()> {
        self.failure_line(error.status());
        let _ = self.err_term.write_line(&format!("  {}", describe(error)));
        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        let prefix = if self.use_colors {
            style("Error:").red().bold().to_string()
        } else {
            "Error:".to_string()
        };
        let _ = self.err_term.write_line(&format!("{prefix} {error:#}"));
    }
}
