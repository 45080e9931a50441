//! CLI argument parsing using clap.

use clap::ArgAction;
use clap::Parser;
use std::path::Path;
use std::path::PathBuf;

/// Container written in pack mode when `--output` is not given.
pub const DEFAULT_CONTAINER_NAME: &str = "archive.tar.xz";

#[derive(Parser, Debug)]
#[command(name = "bttf")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Without ARCHIVE, bttf starts an interactive browser and packs the \
selected item.\nWith ARCHIVE, bttf restores the container into the current directory.")]
pub struct Cli {
    /// Container to unpack
    #[arg(value_name = "ARCHIVE")]
    pub archives: Vec<PathBuf>,

    /// Pack this file or directory instead of browsing for one
    #[arg(long, value_name = "PATH")]
    pub item: Option<PathBuf>,

    /// Container to create in pack mode
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONTAINER_NAME)]
    pub output: PathBuf,

    /// Directory to unpack into (default: current directory)
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Compression level (1-9)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u8).range(1..=9))]
    pub level: Option<u8>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,
}

/// What the positional arguments ask for.
#[derive(Debug, PartialEq, Eq)]
pub enum Mode<'a> {
    Pack,
    Unpack(&'a Path),
    TooManyArgs(usize),
}

impl Cli {
    pub fn mode(&self) -> Mode<'_> {
        match self.archives.as_slice() {
            [] => Mode::Pack,
            [archive] => Mode::Unpack(archive),
            more => Mode::TooManyArgs(more.len()),
        }
    }

    /// Progress bars only make sense for a human watching a terminal.
    pub fn wants_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}
