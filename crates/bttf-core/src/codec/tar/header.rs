//! Conversion between [`EntryHeader`] and tar headers.
//!
//! Headers are ustar blocks built with [`::tar::Header`]. Values that ustar
//! cannot hold are returned as pax records for the writer to emit ahead of
//! the entry. Decoding works on entries produced by [`::tar::Archive`], so
//! pax and GNU extensions are already folded in.

use std::io;
use std::io::Read;
use std::path::PathBuf;

use ::tar::EntryType;
use ::tar::Header;

use crate::codec::CodecError;
use crate::codec::CodecResult;
use crate::codec::EntryHeader;
use crate::codec::EntryKind;
use crate::codec::Format;

/// Tar block size.
pub const BLOCK: usize = 512;

const NAME_LEN: usize = 100;
/// Largest value an 11-digit octal field holds (8 GiB - 1).
const OCTAL_11_MAX: u64 = 0o777_7777_7777;
/// Largest value a 7-digit octal field holds.
const OCTAL_7_MAX: u64 = 0o777_7777;

/// Number of zero bytes needed to pad `len` to a block boundary.
#[must_use]
pub const fn padding(len: u64) -> u64 {
    let rem = len % BLOCK as u64;
    if rem == 0 { 0 } else { BLOCK as u64 - rem }
}

/// An entry header ready to be written.
#[derive(Debug)]
pub struct Encoded {
    /// Pax records for values the ustar header cannot hold.
    pub pax: Vec<(&'static str, Vec<u8>)>,
    /// The ustar header itself, checksum included.
    pub header: Header,
}

impl Encoded {
    /// Pax records in the form [`::tar::Builder::append_pax_extensions`] takes.
    pub fn pax_records(&self) -> impl Iterator<Item = (&'static str, &[u8])> {
        self.pax.iter().map(|(key, value)| (*key, value.as_slice()))
    }
}

fn put(slot: &mut [u8], bytes: &[u8]) {
    slot.fill(0);
    let n = bytes.len().min(slot.len());
    slot[..n].copy_from_slice(&bytes[..n]);
}

/// Builds the ustar header for `entry`, collecting pax records for whatever
/// does not fit. [`Format::Ustar`] refuses such values instead.
pub fn encode(entry: &EntryHeader, format: Format) -> CodecResult<Encoded> {
    let overflow = |field| CodecError::FieldOverflow {
        field,
        format: format.name(),
    };
    let pax_allowed = format == Format::PaxRestricted;
    let mut pax = Vec::new();
    let mut header = Header::new_ustar();

    if header.set_path(&entry.pathname).is_err() {
        if !pax_allowed {
            return Err(overflow("path"));
        }
        let path = entry.pathname.as_bytes();
        pax.push(("path", path.to_vec()));
        put(
            &mut header.as_old_mut().name,
            &path[path.len().saturating_sub(NAME_LEN)..],
        );
    }

    let (entry_type, link) = match &entry.kind {
        EntryKind::Regular => (EntryType::Regular, None),
        EntryKind::Directory => (EntryType::Directory, None),
        EntryKind::Symlink(target) => (EntryType::Symlink, Some(target)),
        EntryKind::Hardlink(target) => (EntryType::Link, Some(target)),
        EntryKind::Other(flag) => (EntryType::new(*flag), None),
    };
    header.set_entry_type(entry_type);
    if let Some(target) = link
        && header.set_link_name(target).is_err()
    {
        if !pax_allowed {
            return Err(overflow("linkpath"));
        }
        pax.push(("linkpath", target.to_string_lossy().into_owned().into_bytes()));
    }

    let mut numeric = |key: &'static str, value: u64, max: u64| -> CodecResult<u64> {
        if value <= max {
            Ok(value)
        } else if pax_allowed {
            pax.push((key, value.to_string().into_bytes()));
            Ok(0)
        } else {
            Err(overflow(key))
        }
    };
    let size = numeric("size", entry.size, OCTAL_11_MAX)?;
    let mtime = numeric("mtime", entry.mtime, OCTAL_11_MAX)?;
    let uid = numeric("uid", entry.uid, OCTAL_7_MAX)?;
    let gid = numeric("gid", entry.gid, OCTAL_7_MAX)?;

    header.set_size(size);
    header.set_mtime(mtime);
    header.set_uid(uid);
    header.set_gid(gid);
    header.set_mode(entry.perm & 0o7777);
    header.set_cksum();

    Ok(Encoded { pax, header })
}

/// Converts an entry read by [`::tar::Archive`] into an [`EntryHeader`].
///
/// Path, link target, size, uid and gid already carry pax and GNU
/// overrides. A pax `mtime` is applied here, whole seconds only.
pub fn decode<R: Read>(entry: &mut ::tar::Entry<'_, R>) -> CodecResult<EntryHeader> {
    let pathname = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
    let size = entry.size();
    let link_target = entry
        .link_name_bytes()
        .map(|bytes| PathBuf::from(String::from_utf8_lossy(&bytes).into_owned()));

    let header = entry.header();
    let kind = match header.entry_type() {
        EntryType::Regular | EntryType::Continuous => EntryKind::Regular,
        EntryType::Directory => EntryKind::Directory,
        EntryType::Symlink => EntryKind::Symlink(link_target.unwrap_or_default()),
        EntryType::Link => EntryKind::Hardlink(link_target.unwrap_or_default()),
        other => EntryKind::Other(other.as_byte()),
    };
    let perm = header.mode().unwrap_or(0o644);
    let uid = header.uid().unwrap_or(0);
    let gid = header.gid().unwrap_or(0);
    let mtime = header.mtime().unwrap_or(0);

    let mtime = pax_mtime(entry)
        .map_err(|e| CodecError::CorruptHeader(format!("{pathname}: {e}")))?
        .unwrap_or(mtime);

    Ok(EntryHeader {
        pathname,
        size,
        kind,
        perm,
        mtime,
        uid,
        gid,
    })
}

fn pax_mtime<R: Read>(entry: &mut ::tar::Entry<'_, R>) -> io::Result<Option<u64>> {
    let Some(extensions) = entry.pax_extensions()? else {
        return Ok(None);
    };
    let mut mtime = None;
    for extension in extensions {
        let extension = extension?;
        if extension.key_bytes() == b"mtime" {
            // Fractional seconds are dropped.
            let value = String::from_utf8_lossy(extension.value_bytes());
            let whole = value.split('.').next().unwrap_or_default().trim();
            mtime = Some(whole.parse().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, format!("pax mtime {value:?}"))
            })?);
        }
    }
    Ok(mtime)
}
