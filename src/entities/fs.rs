//! Directory listing behind the `FileSystem` seam
//!
//! Listing order is lexicographic by path on every platform, so a folder
//! of `shot.0001.png ... shot.0240.png` always plays in frame order.

use std::io;
use std::path::{Path, PathBuf};

/// Filesystem queries used while building a sequence.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// List regular files in `dir`, sorted by path.
    ///
    /// - `extension`: keep only files with this extension (case-insensitive, no dot)
    /// - `max_entries`: keep at most this many (after sorting)
    fn list_directory(
        &self,
        dir: &Path,
        extension: Option<&str>,
        max_entries: Option<usize>,
    ) -> io::Result<Vec<PathBuf>>;
}

/// `std::fs` backed filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

/// Extension filter match, tolerant of a leading dot in the filter
pub fn matches_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_directory(
        &self,
        dir: &Path,
        extension: Option<&str>,
        max_entries: Option<usize>,
    ) -> io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && !is_hidden(path))
            .filter(|path| match extension {
                Some(ext) if !ext.is_empty() => matches_extension(path, ext),
                _ => true,
            })
            .collect();

        files.sort();

        if let Some(max) = max_entries {
            files.truncate(max);
        }

        Ok(files)
    }
}
