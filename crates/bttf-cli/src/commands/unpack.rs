//! Unpack mode: restore a container onto disk.

use crate::cli::Cli;
use crate::output::OutputFormatter;
use crate::output::Operation;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use bttf_core::ExtractConfig;
use bttf_core::Status;
use std::path::Path;
use tracing::info;

pub fn execute(cli: &Cli, container: &Path, formatter: &dyn OutputFormatter) -> Result<Status> {
    let mut config = ExtractConfig::default();
    if let Some(dir) = &cli.directory {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
        config = config.with_destination(dir);
    }
    info!(
        container = %container.display(),
        destination = %config.destination.display(),
        "unpacking"
    );

    let result = if cli.wants_progress() && CliProgress::should_show() {
        bttf_core::api::unpack_with_progress(container, &config, CliProgress::new("Restoring"))
    } else {
        bttf_core::unpack(container, &config)
    };

    match result {
        Ok(report) => {
            formatter.format_unpack_result(container, &report)?;
            Ok(report.status())
        }
        Err(err) => {
            formatter.format_failure(Operation::Unpack, &err)?;
            Ok(err.status())
        }
    }
}
