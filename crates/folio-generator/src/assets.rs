//! Static asset copying.
//!
//! Copies site-wide static files, per-post images, and EPUB downloads into
//! the output tree.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Asset copying errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error on a specific file.
    #[error("failed to copy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Invalid asset path.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Recursively copy `source_dir` into `dest_dir`.
///
/// Hidden files and directories are skipped. Returns the destination path of
/// every copied file. A missing source directory copies nothing.
pub fn copy_dir(source_dir: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();

    if !source_dir.is_dir() {
        debug!(source = %source_dir.display(), "source directory does not exist, skipping");
        return Ok(copied);
    }

    let walker = WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|_| AssetError::InvalidPath(entry.path().to_path_buf()))?;
        let dest = dest_dir.join(relative);

        copy_file(entry.path(), &dest)?;
        copied.push(dest);
    }

    info!(
        source = %source_dir.display(),
        dest = %dest_dir.display(),
        count = copied.len(),
        "copied assets"
    );
    Ok(copied)
}

/// Copy one file, creating parent directories as needed.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| AssetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::copy(source, dest).map_err(|e| AssetError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;

    debug!(src = %source.display(), dest = %dest.display(), "copied asset");
    Ok(())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
