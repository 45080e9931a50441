//! Pack mode: choose an item and archive it into one container.

use crate::browser::Explorer;
use crate::browser::Selection;
use crate::cli::Cli;
use crate::output::OutputFormatter;
use crate::output::Operation;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use bttf_core::ArchiveConfig;
use bttf_core::ArchiverError;
use bttf_core::Status;
use bttf_core::codec::Filter;
use std::io;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;

pub fn execute(cli: &Cli, formatter: &dyn OutputFormatter) -> Result<Status> {
    let Some(item) = choose_item(cli)? else {
        let err = ArchiverError::UserExit;
        formatter.format_failure(Operation::Pack, &err)?;
        return Ok(err.status());
    };
    debug!(item = %item.display(), "selected item");

    let config = archive_config(cli);
    info!(
        item = %item.display(),
        output = %cli.output.display(),
        filter = config.filter.name(),
        "packing"
    );
    let result = if cli.wants_progress() && CliProgress::should_show() {
        bttf_core::api::pack_with_progress(&item, &cli.output, &config, CliProgress::new("Archiving"))
    } else {
        bttf_core::pack(&item, &cli.output, &config)
    };

    match result {
        Ok(report) => {
            formatter.format_pack_result(&cli.output, &report)?;
            Ok(report.status())
        }
        Err(err) => {
            formatter.format_failure(Operation::Pack, &err)?;
            Ok(err.status())
        }
    }
}

/// The item named by `--item`, or the one picked in the browser.
fn choose_item(cli: &Cli) -> Result<Option<PathBuf>> {
    if let Some(item) = &cli.item {
        return Ok(Some(item.clone()));
    }

    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    let stdin = io::stdin();
    let mut explorer = Explorer::new(cwd, stdin.lock(), io::stdout());
    let selection = explorer
        .select()
        .context("failed to read a selection from the terminal")?;
    debug!(location = %explorer.location().display(), "browser closed");
    Ok(match selection {
        Selection::Item(path) => Some(path),
        Selection::Exit => None,
    })
}

/// Filter follows the output name, falling back to xz.
fn archive_config(cli: &Cli) -> ArchiveConfig {
    let filter = Filter::from_path(&cli.output).unwrap_or(Filter::Xz);
    let config = ArchiveConfig::default().with_filter(filter);
    match cli.level {
        Some(level) => config.with_compression_level(Some(level)),
        None => config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_archive_config_follows_output_name() {
        let cli = Cli::parse_from(["bttf", "-o", "x.tar.gz", "-l", "9"]);
        let config = archive_config(&cli);
        assert_eq!(config.filter, Filter::Gzip);
        assert_eq!(config.compression_level, Some(9));

        let cli = Cli::parse_from(["bttf", "-o", "backup.bin"]);
        let config = archive_config(&cli);
        assert_eq!(config.filter, Filter::Xz);
        assert_eq!(config.compression_level, Some(6));
    }
}
