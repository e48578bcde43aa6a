//! Zip archive download and extraction.
//!
//! Hosts wrap the tree in a single root folder (`<repo>-<sha>`,
//! `<org>-<repo>-<hash>`, ...). That folder is replaced by the repository name
//! so the extracted layout is the same whatever the host called it.
//!
//! Extraction is guarded against zip slip and zip bombs: entries are validated
//! before anything is written, and each entry is read through a size-limited
//! reader so lying headers cannot inflate past the limit.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::http::{HttpClient, HttpRequest};

/// Maximum uncompressed size of a single entry (1 GiB)
pub(crate) const MAX_UNCOMPRESSED_SIZE: u64 = 1024 * 1024 * 1024;
/// Maximum uncompressed size of a whole archive (16 GiB)
pub(crate) const MAX_TOTAL_EXTRACTED_SIZE: u64 = 16 * 1024 * 1024 * 1024;
/// Maximum compression ratio for entries above `RATIO_CHECK_THRESHOLD`
pub(crate) const MAX_COMPRESSION_RATIO: f64 = 1000.0;
/// Small text files compress extremely well; only larger entries are ratio-checked.
const RATIO_CHECK_THRESHOLD: u64 = 1024 * 1024;

const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip",
    "application/x-zip-compressed",
    "application/octet-stream",
];

#[derive(Error, Debug)]
pub(crate) enum ArchiveError {
    #[error("download failed: {0}")]
    Transport(String),

    #[error("archive host answered HTTP {0}")]
    Status(u16),

    #[error("unexpected content type '{0}' for a zip archive")]
    ContentType(String),

    #[error("unsafe archive entry '{name}': {reason}")]
    UnsafeEntry { name: String, reason: &'static str },

    #[error("archive entry '{name}' too large: {size} bytes (max {})", MAX_UNCOMPRESSED_SIZE)]
    EntryTooLarge { name: String, size: u64 },

    #[error("suspicious compression ratio in '{name}': {ratio:.1}x (max {:.1}x)", MAX_COMPRESSION_RATIO)]
    CompressionRatio { name: String, ratio: f64 },

    #[error("archive expands beyond {} bytes", MAX_TOTAL_EXTRACTED_SIZE)]
    TotalTooLarge,

    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A downloaded archive on disk, removed when dropped.
struct TransientFile {
    path: PathBuf,
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), "could not remove transient archive: {}", e);
            }
        }
    }
}

/// A reader that refuses to yield more than `limit` bytes.
pub(crate) struct LimitedReader<R> {
    inner: R,
    remaining: u64,
}

impl<R> LimitedReader<R> {
    pub(crate) fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remaining == 0 {
            // Probe one byte: hitting the limit exactly at EOF is fine
            let mut probe = [0u8; 1];
            return match self.inner.read(&mut probe)? {
                0 => Ok(0),
                _ => Err(io::Error::other(
                    "archive entry exceeds its declared size during extraction",
                )),
            };
        }

        let max_read = std::cmp::min(buf.len() as u64, self.remaining) as usize;
        let bytes_read = self.inner.read(&mut buf[..max_read])?;
        self.remaining = self.remaining.saturating_sub(bytes_read as u64);

        Ok(bytes_read)
    }
}

/// Download the archive behind `request` and extract it into `dest`.
///
/// The archive is staged next to `dest` and removed on every exit path. On
/// failure nothing is left at `dest`.
pub(crate) fn download_and_extract(
    http: &dyn HttpClient,
    request: &HttpRequest,
    dest: &Path,
) -> Result<(), ArchiveError> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repository".to_string());
    let transient = TransientFile {
        path: parent.join(format!(".{}.zip.tmp", name)),
    };

    let mut file = File::create(&transient.path)?;
    let response = http
        .download(request, &mut file)
        .map_err(|e| ArchiveError::Transport(e.0))?;

    if !response.is_ok() {
        return Err(ArchiveError::Status(response.status));
    }
    if let Some(content_type) = response.content_type() {
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(ArchiveError::ContentType(content_type));
        }
    }
    file.flush()?;
    drop(file);

    let result = extract(&transient.path, dest);
    if result.is_err() && dest.exists() {
        if let Err(e) = fs::remove_dir_all(dest) {
            warn!(path = %dest.display(), "could not remove partial extraction: {}", e);
        }
    }
    result
}

/// Extract `zip_path` into `dest`, dropping a single shared root folder.
pub(crate) fn extract(zip_path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let mut archive = zip::ZipArchive::new(File::open(zip_path)?)?;

    // Validate everything before writing anything
    let mut names = Vec::with_capacity(archive.len());
    let mut total: u64 = 0;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        validate_zip_entry(&entry)?;
        total = total
            .checked_add(entry.size())
            .filter(|t| *t <= MAX_TOTAL_EXTRACTED_SIZE)
            .ok_or(ArchiveError::TotalTooLarge)?;
        names.push(entry.name().to_string());
    }

    let root = common_root(&names);
    if let Some(root) = root {
        debug!(root, "replacing archive root folder");
    }

    fs::create_dir_all(dest)?;
    let canonical_dest = dest.canonicalize()?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = strip_root(&names[i], root);
        if relative.is_empty() {
            continue;
        }

        let outpath = safe_extract_path(&canonical_dest, relative)?;

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            let limit = entry.size();
            let mut limited = LimitedReader::new(&mut entry, limit);
            io::copy(&mut limited, &mut outfile)?;
        }
    }

    Ok(())
}

/// The top-level folder every entry lives under, if there is exactly one.
fn common_root(names: &[String]) -> Option<&str> {
    let mut root: Option<&str> = None;
    for name in names {
        let (head, _) = name.split_once('/')?;
        match root {
            None => root = Some(head),
            Some(r) if r == head => {}
            Some(_) => return None,
        }
    }
    root.filter(|r| !r.is_empty())
}

fn strip_root<'n>(name: &'n str, root: Option<&str>) -> &'n str {
    match root {
        Some(root) => name
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(""),
        None => name,
    }
}

fn validate_zip_entry<R: Read + ?Sized>(
    entry: &zip::read::ZipFile<'_, R>,
) -> Result<(), ArchiveError> {
    let compressed = entry.compressed_size();
    let uncompressed = entry.size();

    if uncompressed > MAX_UNCOMPRESSED_SIZE {
        return Err(ArchiveError::EntryTooLarge {
            name: entry.name().to_string(),
            size: uncompressed,
        });
    }

    if compressed > 0 && uncompressed > RATIO_CHECK_THRESHOLD {
        let ratio = uncompressed as f64 / compressed as f64;
        if ratio > MAX_COMPRESSION_RATIO {
            return Err(ArchiveError::CompressionRatio {
                name: entry.name().to_string(),
                ratio,
            });
        }
    }

    Ok(())
}

/// Resolve an entry name under `dest`, rejecting anything that could escape it.
///
/// `dest` must already be canonical.
pub(crate) fn safe_extract_path(dest: &Path, entry_name: &str) -> Result<PathBuf, ArchiveError> {
    let unsafe_entry = |reason| ArchiveError::UnsafeEntry {
        name: entry_name.to_string(),
        reason,
    };

    if entry_name.starts_with('/') || entry_name.starts_with('\\') {
        return Err(unsafe_entry("starts with a path separator"));
    }

    let entry_path = Path::new(entry_name);
    if entry_path.is_absolute() {
        return Err(unsafe_entry("absolute path"));
    }

    let mut normalized = dest.to_path_buf();
    for component in entry_path.components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => return Err(unsafe_entry("contains '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_entry("absolute path component"))
            }
        }
    }

    if !normalized.starts_with(dest) {
        return Err(unsafe_entry("escapes the destination directory"));
    }

    Ok(normalized)
}
