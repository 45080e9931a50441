//! Archiving pipeline for packing a directory tree into one compressed
//! container and unpacking it again.
//!
//! `bttf-core` walks a tree in bounded batches, names every regular file
//! relative to the directory that contains the root, streams file content
//! through an [`ArchiveCodec`](codec::ArchiveCodec) in fixed-size chunks, and
//! replays a container's headers and data blocks back onto disk.
//!
//! # Examples
//!
//! ```no_run
//! use bttf_core::ArchiveConfig;
//! use bttf_core::ExtractConfig;
//!
//! # fn main() -> Result<(), bttf_core::ArchiverError> {
//! let report = bttf_core::pack("project", "project.tar.xz", &ArchiveConfig::default())?;
//! println!("archived {} files", report.files_added);
//!
//! let config = ExtractConfig::default().with_destination("restored");
//! let report = bttf_core::unpack("project.tar.xz", &config)?;
//! println!("restored {} entries", report.entries_extracted);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod archiver;
pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod io;
pub mod path;
pub mod report;
pub mod status;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::pack;
pub use api::unpack;
pub use archiver::Archiver;
pub use config::ArchiveConfig;
pub use config::ExtractConfig;
pub use error::ArchiverError;
pub use error::Result;
pub use extract::Extractor;
pub use extract::archive_entries;
pub use report::ArchiveReport;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use status::Status;
