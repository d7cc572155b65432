//! Oldest-first eviction over the cache directory
//!
//! The directory listing is the only catalog: every pass walks the root,
//! sorts regular files by modification time and deletes from the oldest end
//! until both limits hold again.

use crate::error::{CacheError, Result};
use crate::types::CleanupReport;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Suffix of the temp files `set` writes before renaming into place
pub(crate) const TEMP_SUFFIX: &str = ".tmp";

/// Size and count limits, 0 meaning unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Limits {
    pub max_bytes: u64,
    pub max_files: u64,
}

impl Limits {
    pub fn is_unlimited(&self) -> bool {
        self.max_bytes == 0 && self.max_files == 0
    }

    fn exceeded(&self, bytes: u64, files: u64) -> bool {
        (self.max_bytes > 0 && bytes > self.max_bytes)
            || (self.max_files > 0 && files > self.max_files)
    }
}

/// A regular file found during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileInfo {
    pub path: PathBuf,
    /// Path relative to the cache root
    pub name: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Whether a file name has the shape of a `set` temp file
pub(crate) fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// A temp file younger than `grace` is treated as a write still in flight.
/// Older ones were left behind by an interrupted write and count as entries.
fn is_in_flight(modified: SystemTime, grace: Duration) -> bool {
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age < grace,
        Err(_) => true,
    }
}

/// List every regular file under `root`, in walk order.
///
/// Failing to read the root is an error; entries that disappear or cannot be
/// stat'ed mid-walk are skipped, as are temp files written less than
/// `temp_grace` ago.
pub(crate) fn scan(root: &Path, temp_grace: Duration) -> Result<Vec<FileInfo>> {
    let mut files = Vec::with_capacity(256);

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop at cache root"));
                return Err(CacheError::Scan {
                    path: root.to_path_buf(),
                    source: Box::new(source),
                });
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable cache entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = ?entry.path(), error = %e, "Cache entry vanished during scan");
                continue;
            }
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if entry.file_name().to_str().is_some_and(is_temp_name)
            && is_in_flight(modified, temp_grace)
        {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();

        files.push(FileInfo {
            path: entry.path().to_path_buf(),
            name,
            modified,
            size: metadata.len(),
        });
    }

    Ok(files)
}

/// Sort `files` oldest first and return how many leading files must go.
///
/// The sort is stable, so files with equal timestamps keep walk order.
pub(crate) fn plan(files: &mut [FileInfo], limits: Limits) -> usize {
    files.sort_by_key(|f| f.modified);

    let mut bytes: u64 = files.iter().map(|f| f.size).sum();
    let mut count = files.len() as u64;
    let mut evict = 0;

    for file in files.iter() {
        if !limits.exceeded(bytes, count) {
            break;
        }
        bytes = bytes.saturating_sub(file.size);
        count -= 1;
        evict += 1;
    }

    evict
}

/// Run one full cleanup pass over `root`.
pub(crate) fn run_pass(
    root: &Path,
    limits: Limits,
    temp_grace: Duration,
) -> Result<CleanupReport> {
    run_pass_with(root, limits, temp_grace, |path| std::fs::remove_file(path))
}

/// Run a cleanup pass deleting files through `remove`.
///
/// Deletion failures are logged and counted but do not stop the trim; the
/// failed file is still accounted as gone, so a file that can never be
/// removed may keep the directory above its limits.
pub(crate) fn run_pass_with<F>(
    root: &Path,
    limits: Limits,
    temp_grace: Duration,
    remove: F,
) -> Result<CleanupReport>
where
    F: Fn(&Path) -> io::Result<()>,
{
    let mut report = CleanupReport::empty();
    if limits.is_unlimited() {
        return Ok(report);
    }

    let mut files = scan(root, temp_grace)?;
    report.scanned_files = files.len();
    report.scanned_bytes = files.iter().map(|f| f.size).sum();

    let evict = plan(&mut files, limits);

    for file in &files[..evict] {
        match remove(&file.path) {
            Ok(()) => {
                debug!(name = ?file.name, size = file.size, "Evicted cache entry");
                report.deleted_files += 1;
                report.deleted_bytes += file.size;
            }
            Err(e) => {
                warn!(name = ?file.name, error = %e, "Failed to evict cache entry");
                report.failed_deletions += 1;
            }
        }
    }

    report.retained_files = files.len() - evict;
    report.retained_bytes = files[evict..].iter().map(|f| f.size).sum();

    Ok(report)
}
