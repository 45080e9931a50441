//! Compression filters applied around the tar stream.
//!
//! Writing uses one explicitly selected filter. Reading detects the filter
//! from the leading magic bytes, so any supported compression unpacks
//! regardless of the container's file name.
//!
//! # Level Mapping
//!
//! User levels follow a consistent 1-9 scale:
//!
//! - **1-3**: Fast compression (lower CPU usage, larger files)
//! - **6**: Default compression (balanced)
//! - **7-9**: Best compression (higher CPU usage, smaller files)
//!
//! Each codec maps these levels to its own internal scale.

use std::io::BufRead;
use std::io::Read;
use std::io::Write;
use std::io::{self};
use std::path::Path;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Longest magic sequence, i.e. how many bytes detection needs to see.
pub const MAGIC_LEN: usize = 6;

/// Compression filter applied to a whole container.
///
/// # Examples
///
/// ```
/// use bttf_core::codec::Filter;
///
/// assert_eq!(Filter::detect(&[0xfd, b'7', b'z', b'X', b'Z', 0]), Filter::Xz);
/// assert_eq!(Filter::detect(b"plain tar"), Filter::None);
/// assert_eq!(Filter::Xz.extension(), "tar.xz");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    /// No compression.
    None,
    /// Gzip compression (deflate algorithm).
    Gzip,
    /// Bzip2 compression (Burrows-Wheeler algorithm).
    Bzip2,
    /// Xz compression (LZMA2 algorithm). Smallest output; the archiver's
    /// default.
    #[default]
    Xz,
    /// Zstd compression (Zstandard algorithm).
    Zstd,
}

impl Filter {
    /// Detects the filter from the first bytes of a container.
    #[must_use]
    pub fn detect(magic: &[u8]) -> Self {
        if magic.starts_with(XZ_MAGIC) {
            Self::Xz
        } else if magic.starts_with(ZSTD_MAGIC) {
            Self::Zstd
        } else if magic.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else if magic.starts_with(BZIP2_MAGIC) {
            Self::Bzip2
        } else {
            Self::None
        }
    }

    /// Human-readable filter name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Typical file extension for a tar container with this filter.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::None => "tar",
            Self::Gzip => "tar.gz",
            Self::Bzip2 => "tar.bz2",
            Self::Xz => "tar.xz",
            Self::Zstd => "tar.zst",
        }
    }

    /// Picks the filter matching the extension of a container name, such as
    /// `backup.tar.gz` or `backup.tgz`. Returns `None` for unknown names.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tar" => Some(Self::None),
            "gz" | "tgz" => Some(Self::Gzip),
            "bz2" | "tbz2" | "tbz" => Some(Self::Bzip2),
            "xz" | "txz" => Some(Self::Xz),
            "zst" | "zstd" | "tzst" => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Wraps `reader` in the matching decompressor.
    ///
    /// Multi-member streams are decoded in full for every filter.
    pub fn decoder<R: BufRead + 'static>(self, reader: R) -> io::Result<Box<dyn Read>> {
        Ok(match self {
            Self::None => Box::new(reader),
            Self::Gzip => Box::new(flate2::bufread::MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(bzip2::bufread::MultiBzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::bufread::XzDecoder::new_multi_decoder(reader)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::with_buffer(reader)?),
        })
    }

    /// Wraps `writer` in the matching compressor.
    pub fn encoder<W: Write>(self, writer: W, level: Option<u8>) -> io::Result<FilterWriter<W>> {
        Ok(match self {
            Self::None => FilterWriter::Plain(writer),
            Self::Gzip => FilterWriter::Gzip(flate2::write::GzEncoder::new(
                writer,
                level_to_flate2(level),
            )),
            Self::Bzip2 => {
                FilterWriter::Bzip2(bzip2::write::BzEncoder::new(writer, level_to_bzip2(level)))
            }
            Self::Xz => FilterWriter::Xz(xz2::write::XzEncoder::new(writer, level_to_xz(level))),
            Self::Zstd => {
                let mut encoder = zstd::Encoder::new(writer, level_to_zstd(level))?;
                encoder.include_checksum(true)?;
                FilterWriter::Zstd(encoder)
            }
        })
    }
}

/// Compressing writer for one of the supported filters.
///
/// Compressors buffer internally; [`FilterWriter::finish`] must be called to
/// emit the trailing frame.
pub enum FilterWriter<W: Write> {
    /// Uncompressed passthrough.
    Plain(W),
    /// Gzip stream.
    Gzip(flate2::write::GzEncoder<W>),
    /// Bzip2 stream.
    Bzip2(bzip2::write::BzEncoder<W>),
    /// Xz stream.
    Xz(xz2::write::XzEncoder<W>),
    /// Zstd frame.
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> FilterWriter<W> {
    /// Flushes the compressor trailer and returns the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(w) => Ok(w),
            Self::Gzip(e) => e.finish(),
            Self::Bzip2(e) => e.finish(),
            Self::Xz(e) => e.finish(),
            Self::Zstd(e) => e.finish(),
        }
    }
}

impl<W: Write> Write for FilterWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(e) => e.write(buf),
            Self::Bzip2(e) => e.write(buf),
            Self::Xz(e) => e.write(buf),
            Self::Zstd(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(e) => e.flush(),
            Self::Bzip2(e) => e.flush(),
            Self::Xz(e) => e.flush(),
            Self::Zstd(e) => e.flush(),
        }
    }
}

/// Converts a 1-9 level to a flate2 compression level.
#[must_use]
pub fn level_to_flate2(level: Option<u8>) -> flate2::Compression {
    match level {
        None | Some(6) => flate2::Compression::default(),
        Some(1..=3) => flate2::Compression::fast(),
        Some(7..=9) => flate2::Compression::best(),
        Some(n) => flate2::Compression::new(u32::from(n)),
    }
}

/// Converts a 1-9 level to a bzip2 compression level.
#[must_use]
pub fn level_to_bzip2(level: Option<u8>) -> bzip2::Compression {
    match level {
        None | Some(6) => bzip2::Compression::default(),
        Some(1) => bzip2::Compression::fast(),
        Some(7..=9) => bzip2::Compression::best(),
        Some(n) => bzip2::Compression::new(u32::from(n.clamp(1, 9))),
    }
}

/// Converts a 1-9 level to an xz preset.
#[must_use]
pub fn level_to_xz(level: Option<u8>) -> u32 {
    match level {
        None => 6,
        Some(n) => u32::from(n.min(9)),
    }
}

/// Converts a 1-9 level to a zstd level.
///
/// Zstd has a wider range (1-22), so the upper user levels are spread out.
#[allow(clippy::match_same_arms)]
#[must_use]
pub fn level_to_zstd(level: Option<u8>) -> i32 {
    match level {
        None | Some(6) => 3,
        Some(1) => 1,
        Some(2) => 2,
        Some(7) => 10,
        Some(8) => 15,
        Some(9) => 19,
        _ => 3,
    }
}
