// src/packages/archive.rs

//! Package archive reader
//!
//! A package is a (possibly compressed) tarball whose leading entries are
//! `+`-prefixed metadata files. Everything after them is content to extract.

use crate::error::{Error, Result};
use crate::packages::manifest;
use crate::packages::traits::{Package, Script, ScriptKind};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tar::Archive;
use tracing::debug;
use xz2::read::XzDecoder;

/// Package compression format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Xz,
    Zstd,
    None,
}

/// Map any archive-layer I/O error to an `Archive` error, keeping its message
pub(crate) fn archive_error(e: io::Error) -> Error {
    Error::Archive(e.to_string())
}

/// Whether an archived path names a metadata file rather than content
pub fn is_metadata_entry(path: &str) -> bool {
    path.trim_start_matches("./").starts_with('+')
}

/// Detect compression from the file name, falling back to magic bytes
pub fn detect_compression(path: &Path) -> Result<CompressionFormat> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
        return Ok(CompressionFormat::Gzip);
    } else if name.ends_with(".txz") || name.ends_with(".tar.xz") {
        return Ok(CompressionFormat::Xz);
    } else if name.ends_with(".tzst") || name.ends_with(".tar.zst") {
        return Ok(CompressionFormat::Zstd);
    } else if name.ends_with(".tar") {
        return Ok(CompressionFormat::None);
    }

    let mut file = File::open(path)
        .map_err(|e| Error::Archive(format!("Failed to open package file: {}", e)))?;
    let mut magic = [0u8; 6];
    file.read_exact(&mut magic)
        .map_err(|e| Error::Archive(format!("Failed to read package header: {}", e)))?;

    if magic[0..2] == [0x1F, 0x8B] {
        return Ok(CompressionFormat::Gzip);
    }
    if magic == [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00] {
        return Ok(CompressionFormat::Xz);
    }
    if magic[0..4] == [0x28, 0xB5, 0x2F, 0xFD] {
        return Ok(CompressionFormat::Zstd);
    }

    // Uncompressed tar carries "ustar" at offset 257
    let mut ustar = [0u8; 5];
    if file.seek(SeekFrom::Start(257)).is_ok()
        && file.read_exact(&mut ustar).is_ok()
        && &ustar == b"ustar"
    {
        return Ok(CompressionFormat::None);
    }

    Err(Error::Archive(format!(
        "Unable to detect package format for: {}",
        path.display()
    )))
}

/// Open the archive file and wrap it in the matching decompressor
fn open_stream(path: &Path) -> Result<Box<dyn Read>> {
    let compression = detect_compression(path)?;
    let file = File::open(path)
        .map_err(|e| Error::Archive(format!("Failed to open package file: {}", e)))?;

    let reader: Box<dyn Read> = match compression {
        CompressionFormat::Gzip => Box::new(GzDecoder::new(file)),
        CompressionFormat::Xz => Box::new(XzDecoder::new(file)),
        CompressionFormat::Zstd => {
            let decoder = zstd::Decoder::new(file)
                .map_err(|e| Error::Archive(format!("Failed to create zstd decoder: {}", e)))?;
            Box::new(decoder)
        }
        CompressionFormat::None => Box::new(file),
    };

    Ok(reader)
}

/// Reader over the content entries of a package archive
///
/// Leading metadata entries are skipped by the extractor, so iteration
/// effectively starts at the first content entry. Dropping the reader
/// closes the underlying file.
pub struct ContentReader {
    archive: Archive<Box<dyn Read>>,
}

impl ContentReader {
    /// Wrap an already-decompressed tar stream
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self {
            archive: Archive::new(reader),
        }
    }

    fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(open_stream(path)?))
    }

    pub(crate) fn archive_mut(&mut self) -> &mut Archive<Box<dyn Read>> {
        &mut self.archive
    }
}

/// Result of opening a package archive
pub struct OpenedPackage {
    pub package: Package,
    /// `None` when the archive holds metadata only
    pub content: Option<ContentReader>,
}

/// Open a package archive, load its metadata and position a reader at the content
pub fn open(path: &Path) -> Result<OpenedPackage> {
    debug!("Opening package archive: {}", path.display());

    let mut archive = Archive::new(open_stream(path)?);
    let mut manifest_content = None;
    let mut description = None;
    let mut scripts = Vec::new();
    let mut has_content = false;

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;

        let entry_path = entry
            .path()
            .map_err(archive_error)?
            .to_string_lossy()
            .to_string();

        if !is_metadata_entry(&entry_path) {
            has_content = true;
            break;
        }

        let name = entry_path.trim_start_matches("./").to_string();
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| Error::Archive(format!("Failed to read {}: {}", name, e)))?;

        if name == "+MANIFEST" {
            manifest_content = Some(content);
        } else if name == "+DESC" {
            description = Some(content);
        } else if let Some(kind) = ScriptKind::from_entry_name(&name) {
            scripts.push(Script::new(kind, content));
        } else {
            debug!("Ignoring unknown metadata entry: {}", name);
        }
    }

    let manifest_content = manifest_content
        .ok_or_else(|| Error::Archive(format!("No +MANIFEST found in {}", path.display())))?;

    let mut package = manifest::parse(&manifest_content)?;
    package.description = description;
    package.scripts = scripts;

    debug!(
        "Loaded package: {} ({} dependencies, {} scripts, {} execs, content: {})",
        package.full_name(),
        package.dependencies.len(),
        package.scripts.len(),
        package.execs.len(),
        has_content
    );

    // The metadata pass consumed the stream, so content gets a fresh one
    let content = if has_content {
        Some(ContentReader::open(path)?)
    } else {
        None
    };

    Ok(OpenedPackage {
        package,
        content,
    })
}
