//! Configuration for packing and unpacking.

use std::path::PathBuf;

use crate::ArchiverError;
use crate::Result;
use crate::codec::DiskOptions;
use crate::codec::Filter;
use crate::codec::Format;

/// Paths buffered by the directory walker before they are archived.
pub const DEFAULT_BATCH_CAPACITY: usize = 100;

/// Bytes read from a source file per data-write call.
pub const DEFAULT_CHUNK_SIZE: usize = 16384;

/// Block size requested when opening a container for reading.
pub const DEFAULT_BLOCK_SIZE: usize = 16384;

/// Permission bits recorded for every archived file.
pub const DEFAULT_ENTRY_PERMISSIONS: u32 = 0o644;

/// Configuration for archiving operations.
///
/// # Examples
///
/// ```
/// use bttf_core::ArchiveConfig;
/// use bttf_core::codec::Filter;
///
/// let config = ArchiveConfig::default()
///     .with_filter(Filter::Gzip)
///     .with_compression_level(Some(9));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.batch_capacity, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Walker batch capacity.
    ///
    /// Default: `100`.
    pub batch_capacity: usize,

    /// Streaming chunk size in bytes.
    ///
    /// Default: `16384`.
    pub chunk_size: usize,

    /// Compression filter for the container.
    ///
    /// Default: [`Filter::Xz`].
    pub filter: Filter,

    /// Container header format.
    ///
    /// Default: [`Format::PaxRestricted`].
    pub format: Format,

    /// Compression level (1-9). `None` uses the filter's default.
    ///
    /// Default: `Some(6)`.
    pub compression_level: Option<u8>,

    /// Permission bits written into every entry header.
    ///
    /// Default: `0o644`.
    pub entry_permissions: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            filter: Filter::Xz,
            format: Format::PaxRestricted,
            compression_level: Some(6),
            entry_permissions: DEFAULT_ENTRY_PERMISSIONS,
        }
    }
}

impl ArchiveConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the walker batch capacity.
    #[must_use]
    pub const fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    /// Sets the streaming chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the compression filter.
    #[must_use]
    pub const fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the container format.
    #[must_use]
    pub const fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the compression level. Checked by [`ArchiveConfig::validate`].
    #[must_use]
    pub const fn with_compression_level(mut self, level: Option<u8>) -> Self {
        self.compression_level = level;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::InvalidConfig`] if a size is zero or the
    /// compression level is outside 1-9.
    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity == 0 {
            return Err(invalid("batch capacity must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk size must be at least 1"));
        }
        if let Some(level) = self.compression_level
            && !(1..=9).contains(&level)
        {
            return Err(invalid(format!("compression level {level} is not in 1-9")));
        }
        Ok(())
    }
}

/// Configuration for extraction.
///
/// # Examples
///
/// ```
/// use bttf_core::ExtractConfig;
///
/// let config = ExtractConfig::default().with_destination("out");
/// assert_eq!(config.block_size, 16384);
/// assert!(config.disk_options.no_dot_dot);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Block size used when opening the container.
    ///
    /// Default: `16384`.
    pub block_size: usize,

    /// Directory entries are extracted into.
    ///
    /// Default: the current directory.
    pub destination: PathBuf,

    /// Metadata restored on disk.
    ///
    /// Default: time, permissions and file flags; `..` refused and absolute
    /// names re-rooted.
    pub disk_options: DiskOptions,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            destination: PathBuf::from("."),
            disk_options: DiskOptions::default(),
        }
    }
}

impl ExtractConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the container block size.
    #[must_use]
    pub const fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the extraction destination.
    #[must_use]
    pub fn with_destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination = dir.into();
        self
    }

    /// Sets the disk options.
    #[must_use]
    pub const fn with_disk_options(mut self, options: DiskOptions) -> Self {
        self.disk_options = options;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::InvalidConfig`] if the block size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(invalid("block size must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ArchiverError {
    ArchiverError::InvalidConfig {
        reason: reason.into(),
    }
}
