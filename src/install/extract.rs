// src/install/extract.rs

//! Conditional extraction of package content
//!
//! Every content entry is unpacked under the install root with permissions,
//! mtimes and extended attributes preserved (ownership too when running as
//! root). Entries named `<path>.pkgconf` are config samples: the real config
//! at `<path>` is created from the sample only when nothing exists there yet,
//! so user edits survive reinstalls. Regular-file samples are copied,
//! symlink and hardlink samples are recreated as links, directory samples as
//! directories. Device and fifo samples are left alone.

use crate::error::{Error, Result};
use crate::packages::archive::{ContentReader, archive_error, is_metadata_entry};
use crate::packages::traits::InstalledFile;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Suffix marking a config sample entry
pub const SAMPLE_SUFFIX: &str = ".pkgconf";

/// Where and how entries are written
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub root: PathBuf,
    pub preserve_owner: bool,
}

/// Header attributes needed to recreate a sample's real config file
struct EntryAttrs {
    mtime: Option<u64>,
    uid: Option<u64>,
    gid: Option<u64>,
}

/// How a sample entry is recreated at its real path
#[derive(Debug, Clone, PartialEq, Eq)]
enum SampleSource {
    File,
    Directory,
    /// Symlink pointing where the sample's link points
    Symlink(PathBuf),
    /// Hard link sharing the unpacked sample's inode
    HardLink,
}

/// Real config path for a sample entry, or `None` if the path is not a sample
pub fn sample_target(path: &str) -> Option<&str> {
    let target = path.strip_suffix(SAMPLE_SUFFIX)?;
    let file_name = target.rsplit('/').next().unwrap_or(target);
    if file_name.is_empty() {
        None
    } else {
        Some(target)
    }
}

/// Extract every remaining content entry, returning the regular files written
///
/// Any unpack or iteration error aborts with the archive's message.
pub fn extract_all(reader: &mut ContentReader, options: &ExtractOptions) -> Result<Vec<InstalledFile>> {
    fs::create_dir_all(&options.root)?;

    let archive = reader.archive_mut();
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_unpack_xattrs(true);
    archive.set_preserve_ownerships(options.preserve_owner);
    archive.set_overwrite(true);

    let mut files = Vec::new();
    let mut leading_metadata = true;

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;

        let entry_path = entry
            .path()
            .map_err(archive_error)?
            .to_string_lossy()
            .to_string();

        if leading_metadata && is_metadata_entry(&entry_path) {
            continue;
        }
        leading_metadata = false;

        let relative = entry_path
            .trim_start_matches("./")
            .trim_start_matches('/')
            .trim_end_matches('/')
            .to_string();

        let header = entry.header();
        let entry_type = header.entry_type();
        let attrs = EntryAttrs {
            mtime: header.mtime().ok(),
            uid: header.uid().ok(),
            gid: header.gid().ok(),
        };
        let sample = match sample_target(&relative) {
            Some(target) => Some((target.to_string(), sample_source(&entry)?)),
            None => None,
        };

        if !entry.unpack_in(&options.root).map_err(archive_error)? {
            return Err(Error::Archive(format!(
                "{}: refusing to extract outside of {}",
                entry_path,
                options.root.display()
            )));
        }
        debug!("Extracted {}", relative);

        if entry_type.is_file() {
            files.push(record_file(&options.root, &relative)?);
        }

        match sample {
            Some((target, Some(source))) => {
                if create_from_sample(options, &relative, &target, &source, &attrs)?
                    && source == SampleSource::File
                {
                    files.push(record_file(&options.root, &target)?);
                }
            }
            Some((_, None)) => {
                debug!("{} is not a file, link or directory, no config created", relative)
            }
            None => {}
        }
    }

    debug!("Extracted {} files", files.len());
    Ok(files)
}

fn sample_source(entry: &tar::Entry<'_, Box<dyn io::Read>>) -> Result<Option<SampleSource>> {
    let entry_type = entry.header().entry_type();

    let source = if entry_type.is_file() {
        Some(SampleSource::File)
    } else if entry_type.is_dir() {
        Some(SampleSource::Directory)
    } else if entry_type.is_hard_link() {
        Some(SampleSource::HardLink)
    } else if entry_type.is_symlink() {
        entry
            .link_name()
            .map_err(archive_error)?
            .map(|link| SampleSource::Symlink(link.into_owned()))
    } else {
        None
    };
    Ok(source)
}

/// Create the real config from its sample if the real path is absent
///
/// Only a definite not-found creates the file. Any other stat failure leaves
/// the sample alone, since it may hide an existing config we cannot see.
fn create_from_sample(
    options: &ExtractOptions,
    sample: &str,
    target: &str,
    source: &SampleSource,
    attrs: &EntryAttrs,
) -> Result<bool> {
    let target_path = options.root.join(target);

    match fs::symlink_metadata(&target_path) {
        Ok(_) => {
            info!("Keeping existing {}, sample left at {}", target, sample);
            Ok(false)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let sample_path = options.root.join(sample);
            recreate(source, &sample_path, &target_path).map_err(|e| {
                Error::Archive(format!("Failed to create {} from {}: {}", target, sample, e))
            })?;
            // Links carry the attributes of what they point at
            if matches!(source, SampleSource::File | SampleSource::Directory) {
                apply_attrs(&target_path, attrs, options.preserve_owner)?;
            }
            info!("Created {} from sample", target);
            Ok(true)
        }
        Err(e) => {
            warn!(
                "Cannot check {} ({}), not creating it from sample",
                target_path.display(),
                e
            );
            Ok(false)
        }
    }
}

fn recreate(source: &SampleSource, sample: &Path, target: &Path) -> io::Result<()> {
    match source {
        SampleSource::File => {
            with_owner_read(sample, || fs::copy(sample, target))?;
            fs::set_permissions(target, fs::metadata(sample)?.permissions())
        }
        SampleSource::Directory => fs::create_dir(target),
        SampleSource::HardLink => fs::hard_link(sample, target),
        SampleSource::Symlink(link) => symlink(link, target),
    }
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(_original: &Path, link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot create symlink {}", link.display()),
    ))
}

/// Apply the sample's mtime and, when requested, ownership to the new file.
/// The copy already carried the permission bits.
fn apply_attrs(path: &Path, attrs: &EntryAttrs, preserve_owner: bool) -> Result<()> {
    if let Some(mtime) = attrs.mtime {
        match mtime_to_system_time(mtime) {
            Some(time) => with_owner_read(path, || File::open(path)?.set_modified(time))?,
            None => warn!("{}: mtime {} is out of range, not applied", path.display(), mtime),
        }
    }

    #[cfg(unix)]
    if preserve_owner {
        let uid = owner_id("uid", attrs.uid, path)?;
        let gid = owner_id("gid", attrs.gid, path)?;
        std::os::unix::fs::chown(path, uid, gid)?;
    }
    #[cfg(not(unix))]
    let _ = preserve_owner;

    Ok(())
}

/// Header mtimes are signed seconds; base-256 encoded pre-epoch values read
/// back as huge unsigned numbers.
fn mtime_to_system_time(mtime: u64) -> Option<SystemTime> {
    let secs = mtime as i64;
    if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs.unsigned_abs()))
    } else {
        UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
    }
}

#[cfg(unix)]
fn owner_id(kind: &str, id: Option<u64>, path: &Path) -> Result<Option<u32>> {
    id.map(|id| {
        u32::try_from(id).map_err(|_| {
            Error::Archive(format!("{}: {} {} is out of range", path.display(), kind, id))
        })
    })
    .transpose()
}

/// Run `f`, retrying once with owner read permission added if `path` is
/// unreadable. The original mode is put back afterwards.
#[cfg(unix)]
fn with_owner_read<T>(path: &Path, mut f: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    use std::os::unix::fs::PermissionsExt;

    match f() {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            let original = fs::metadata(path)?.permissions();
            let mut readable = original.clone();
            readable.set_mode(original.mode() | 0o400);
            fs::set_permissions(path, readable)?;
            let result = f();
            fs::set_permissions(path, original)?;
            result
        }
        other => other,
    }
}

#[cfg(not(unix))]
fn with_owner_read<T>(_path: &Path, mut f: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    f()
}

/// Hash and stat a file that was just written
fn record_file(root: &Path, relative: &str) -> Result<InstalledFile> {
    let path = root.join(relative);
    let metadata = fs::symlink_metadata(&path)?;

    let sha256 = with_owner_read(&path, || {
        let mut hasher = Sha256::new();
        let mut file = File::open(&path)?;
        io::copy(&mut file, &mut hasher)?;
        Ok(format!("{:x}", hasher.finalize()))
    })?;

    Ok(InstalledFile {
        path: format!("/{}", relative),
        sha256,
        size: metadata.len() as i64,
        mode: file_mode(&metadata),
    })
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> i32 {
    use std::os::unix::fs::PermissionsExt;
    (metadata.permissions().mode() & 0o7777) as i32
}

#[cfg(not(unix))]
fn file_mode(metadata: &fs::Metadata) -> i32 {
    if metadata.permissions().readonly() { 0o444 } else { 0o644 }
}
