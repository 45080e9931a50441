//! Interactive directory browser used to pick what to pack.
//!
//! The browser lists the current directory with numeric indices and reads
//! one command per line:
//!
//! - `<n>`: enter directory `n`, or select file `n`
//! - `A`: select the current directory
//! - `..`: go to the parent directory
//! - `X`: exit without selecting (end of input does the same)
//!
//! Input and output are generic so the browser can be driven from tests.

use std::fs;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

/// Outcome of a browsing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The user picked this file or directory.
    Item(PathBuf),
    /// The user left without picking anything.
    Exit,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Index(usize),
    ArchiveHere,
    Up,
    Exit,
    Invalid,
}

impl Command {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "A" | "a" => Self::ArchiveHere,
            "X" | "x" => Self::Exit,
            ".." => Self::Up,
            other => other.parse().map_or(Self::Invalid, Self::Index),
        }
    }
}

/// Line-oriented file browser.
pub struct Explorer<R, W> {
    location: PathBuf,
    entries: Vec<PathBuf>,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Explorer<R, W> {
    /// Starts browsing at `location`.
    pub fn new(location: impl Into<PathBuf>, input: R, output: W) -> Self {
        Self {
            location: location.into(),
            entries: Vec::new(),
            input,
            output,
        }
    }

    /// Directory currently shown.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Runs the browser until the user selects an item or exits.
    ///
    /// # Errors
    ///
    /// Returns an error only if the terminal cannot be read or written.
    pub fn select(&mut self) -> io::Result<Selection> {
        loop {
            self.refresh();
            self.print_listing()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                debug!("end of input, leaving browser");
                return Ok(Selection::Exit);
            }

            match Command::parse(&line) {
                Command::ArchiveHere => return Ok(Selection::Item(self.location.clone())),
                Command::Exit => {
                    debug!("user requested exit");
                    return Ok(Selection::Exit);
                }
                Command::Up => match self.location.parent() {
                    Some(parent) => self.location = parent.to_path_buf(),
                    None => writeln!(self.output, "Already at the top")?,
                },
                Command::Index(id) => match self.entries.get(id) {
                    // `is_dir` follows symlinks, so a link to a directory is entered.
                    Some(entry) if entry.is_dir() => {
                        debug!(location = %entry.display(), "moving to directory");
                        self.location = entry.clone();
                    }
                    Some(entry) => return Ok(Selection::Item(entry.clone())),
                    None => writeln!(self.output, "Invalid selection: {id}")?,
                },
                Command::Invalid => writeln!(self.output, "Invalid input. Please try again.")?,
            }
        }
    }

    fn refresh(&mut self) {
        self.entries = match fs::read_dir(&self.location) {
            Ok(dir) => {
                let mut entries: Vec<PathBuf> =
                    dir.filter_map(|e| e.ok().map(|e| e.path())).collect();
                entries.sort();
                entries
            }
            Err(e) => {
                warn!(location = %self.location.display(), error = %e, "cannot list directory");
                Vec::new()
            }
        };
    }

    fn print_listing(&mut self) -> io::Result<()> {
        writeln!(self.output, "Select item to archive:")?;
        writeln!(self.output, "\t[number] (file) archive file")?;
        writeln!(self.output, "\t[number] (directory) go to the directory")?;
        writeln!(self.output, "\tA - Archive current directory")?;
        writeln!(self.output, "\t.. - Go to the parent directory")?;
        writeln!(self.output, "\tX - Exit")?;
        writeln!(self.output, "{}:", self.location.display())?;
        for (id, entry) in self.entries.iter().enumerate() {
            let name = entry
                .file_name()
                .map_or_else(|| entry.display().to_string(), |n| n.to_string_lossy().into_owned());
            let marker = if entry.is_dir() { "/" } else { "" };
            writeln!(self.output, "{id} {name}{marker}")?;
        }
        write!(self.output, "> ")?;
        self.output.flush()
    }
}
