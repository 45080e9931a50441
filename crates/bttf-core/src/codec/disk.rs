//! Filesystem materialisation of container entries.

use std::fs;
use std::fs::File;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use super::CodecError;
use super::CodecResult;
use super::DiskWriteSession;
use super::EntryHeader;
use super::EntryKind;
use super::Session;

/// Permission bits restored on extraction. Set-id bits are never applied.
const PERM_MASK: u32 = 0o1777;

/// What a disk session restores and which entry names it accepts.
///
/// The default is the extraction profile: modification time, permissions and
/// file flags are restored, `..` components are refused and absolute names
/// are re-rooted under the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DiskOptions {
    /// Restore modification times.
    pub preserve_time: bool,
    /// Restore permission bits.
    pub preserve_perm: bool,
    /// Restore file flags. Recorded only; no portable API applies them.
    pub preserve_fflags: bool,
    /// Restore uid/gid. Requires standard lookup as well.
    pub preserve_owner: bool,
    /// Refuse entries whose names contain `..`.
    pub no_dot_dot: bool,
    /// Strip a leading root from entry names.
    pub no_absolute_paths: bool,
}

impl Default for DiskOptions {
    fn default() -> Self {
        Self {
            preserve_time: true,
            preserve_perm: true,
            preserve_fflags: true,
            preserve_owner: false,
            no_dot_dot: true,
            no_absolute_paths: true,
        }
    }
}

impl DiskOptions {
    /// Sets whether ownership is restored.
    #[must_use]
    pub const fn with_preserve_owner(mut self, preserve: bool) -> Self {
        self.preserve_owner = preserve;
        self
    }
}

#[derive(Debug)]
struct OpenEntry {
    path: PathBuf,
    header: EntryHeader,
    file: Option<File>,
}

#[derive(Debug)]
struct DeferredDir {
    path: PathBuf,
    header: EntryHeader,
}

/// Disk session writing entries under a destination directory.
#[derive(Debug)]
pub struct DiskWriter {
    options: DiskOptions,
    lookup: bool,
    destination: PathBuf,
    current: Option<OpenEntry>,
    deferred_dirs: Vec<DeferredDir>,
    last_error: Option<String>,
}

impl Default for DiskWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskWriter {
    /// Creates a session targeting the current directory with no metadata
    /// restoration until [`DiskWriteSession::set_options`] is called.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: DiskOptions {
                preserve_time: false,
                preserve_perm: false,
                preserve_fflags: false,
                preserve_owner: false,
                no_dot_dot: true,
                no_absolute_paths: true,
            },
            lookup: false,
            destination: PathBuf::from("."),
            current: None,
            deferred_dirs: Vec::new(),
            last_error: None,
        }
    }

    /// Options currently in effect.
    #[must_use]
    pub const fn options(&self) -> DiskOptions {
        self.options
    }

    /// Resolves an entry name against the destination.
    fn resolve(&self, pathname: &str) -> CodecResult<PathBuf> {
        let mut relative = PathBuf::new();
        for component in Path::new(pathname).components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {
                    if !self.options.no_absolute_paths {
                        relative.push(component);
                    }
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if self.options.no_dot_dot {
                        return Err(CodecError::UnsafePath(PathBuf::from(pathname)));
                    }
                    relative.push(component);
                }
                Component::Normal(name) => relative.push(name),
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(CodecError::UnsafePath(PathBuf::from(pathname)));
        }
        let path = self.destination.join(relative);
        self.check_ancestors(&path, pathname)?;
        Ok(path)
    }

    /// Refuses `path` when a directory between the destination and the
    /// entry is a symbolic link, since writing through it could leave the
    /// destination.
    fn check_ancestors(&self, path: &Path, pathname: &str) -> CodecResult {
        let Ok(relative) = path.strip_prefix(&self.destination) else {
            return Ok(());
        };
        let mut current = self.destination.clone();
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            if components.peek().is_none() {
                break;
            }
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    warn!(
                        entry = pathname,
                        link = %current.display(),
                        "entry path goes through a symbolic link"
                    );
                    return Err(CodecError::UnsafePath(PathBuf::from(pathname)));
                }
                Ok(_) => {}
                // Nothing below a missing directory exists yet.
                Err(_) => break,
            }
        }
        Ok(())
    }

    fn create_entry(&mut self, header: &EntryHeader) -> CodecResult {
        self.finish_current()?;

        let path = self.resolve(&header.pathname)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = match &header.kind {
            EntryKind::Regular => {
                remove_symlink(&path)?;
                Some(File::create(&path)?)
            }
            EntryKind::Directory => {
                fs::create_dir_all(&path)?;
                None
            }
            EntryKind::Symlink(target) => {
                remove_non_dir(&path)?;
                make_symlink(target, &path)?;
                None
            }
            EntryKind::Hardlink(target) => {
                let original = self.resolve(&target.to_string_lossy())?;
                remove_non_dir(&path)?;
                fs::hard_link(original, &path)?;
                None
            }
            EntryKind::Other(type_flag) => {
                warn!(
                    path = %header.pathname,
                    type_flag = %char::from(*type_flag),
                    "skipping unsupported entry type"
                );
                None
            }
        };

        debug!(path = %path.display(), "created entry");
        self.current = Some(OpenEntry {
            path,
            header: header.clone(),
            file,
        });
        Ok(())
    }

    fn write_block(&mut self, buf: &[u8], offset: u64) -> CodecResult {
        let entry = self
            .current
            .as_mut()
            .ok_or(CodecError::State("no entry in progress"))?;
        if let Some(file) = entry.file.as_mut() {
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(buf)?;
        }
        Ok(())
    }

    fn finish_current(&mut self) -> CodecResult {
        let Some(entry) = self.current.take() else {
            return Ok(());
        };

        match entry.header.kind {
            EntryKind::Regular => {
                if let Some(mut file) = entry.file {
                    file.flush()?;
                    if self.options.preserve_time {
                        file.set_modified(entry.header.modified())?;
                    }
                }
                self.apply_owner(&entry.path, &entry.header);
                if self.options.preserve_perm {
                    set_mode(&entry.path, entry.header.perm)?;
                }
            }
            EntryKind::Directory => self.deferred_dirs.push(DeferredDir {
                path: entry.path,
                header: entry.header,
            }),
            EntryKind::Symlink(_) | EntryKind::Hardlink(_) | EntryKind::Other(_) => {}
        }
        Ok(())
    }

    fn apply_owner(&self, path: &Path, header: &EntryHeader) {
        if !(self.options.preserve_owner && self.lookup) {
            return;
        }
        #[cfg(unix)]
        {
            let uid = u32::try_from(header.uid).ok();
            let gid = u32::try_from(header.gid).ok();
            if let Err(e) = std::os::unix::fs::chown(path, uid, gid) {
                warn!(path = %path.display(), error = %e, "cannot restore ownership");
            }
        }
        #[cfg(not(unix))]
        let _ = (path, header);
    }

    /// Applies directory metadata deepest first, after every child exists.
    fn apply_deferred_dirs(&mut self) {
        let mut dirs = std::mem::take(&mut self.deferred_dirs);
        dirs.sort_by_key(|dir| std::cmp::Reverse(dir.path.components().count()));
        for dir in dirs {
            self.apply_owner(&dir.path, &dir.header);
            if self.options.preserve_perm
                && let Err(e) = set_mode(&dir.path, dir.header.perm)
            {
                warn!(path = %dir.path.display(), error = %e, "cannot restore directory permissions");
            }
            if self.options.preserve_time
                && let Err(e) =
                    File::open(&dir.path).and_then(|f| f.set_modified(dir.header.modified()))
            {
                debug!(path = %dir.path.display(), error = %e, "cannot restore directory time");
            }
        }
    }

    fn record<T>(&mut self, result: CodecResult<T>) -> CodecResult<T> {
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }
}

impl Session for DiskWriter {
    fn close(&mut self) -> CodecResult {
        let result = self.finish_current();
        self.apply_deferred_dirs();
        self.record(result)
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl DiskWriteSession for DiskWriter {
    fn set_options(&mut self, options: DiskOptions) -> CodecResult {
        if options.preserve_fflags {
            debug!("file flags are recorded but not applied");
        }
        self.options = options;
        Ok(())
    }

    fn set_standard_lookup(&mut self) -> CodecResult {
        self.lookup = true;
        Ok(())
    }

    fn set_destination(&mut self, dir: &Path) -> CodecResult {
        if self.current.is_some() {
            return self.record(Err(CodecError::State(
                "destination cannot change while an entry is open",
            )));
        }
        self.destination = dir.to_path_buf();
        Ok(())
    }

    fn write_header(&mut self, header: &EntryHeader) -> CodecResult {
        let result = self.create_entry(header);
        self.record(result)
    }

    fn write_data_block(&mut self, buf: &[u8], offset: u64) -> CodecResult {
        let result = self.write_block(buf, offset);
        self.record(result)
    }

    fn finish_entry(&mut self) -> CodecResult {
        let result = self.finish_current();
        self.record(result)
    }
}

fn remove_symlink(path: &Path) -> CodecResult {
    if let Ok(meta) = fs::symlink_metadata(path)
        && meta.file_type().is_symlink()
    {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn remove_non_dir(path: &Path) -> CodecResult {
    if let Ok(meta) = fs::symlink_metadata(path)
        && !meta.is_dir()
    {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> CodecResult {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_symlink(_target: &Path, _link: &Path) -> CodecResult {
    Err(CodecError::State(
        "symbolic links are not supported on this platform",
    ))
}

#[cfg(unix)]
fn set_mode(path: &Path, perm: u32) -> CodecResult {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(perm & PERM_MASK))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(path: &Path, perm: u32) -> CodecResult {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(perm & PERM_MASK & 0o222 == 0);
    fs::set_permissions(path, permissions)?;
    Ok(())
}
