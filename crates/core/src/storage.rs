//! Filesystem helpers shared by the upload cache and the dispatcher.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Deletes every regular file under `root` for which `keep` returns false.
///
/// Directories are walked but never removed. A missing `root` counts as
/// empty. Returns the number of files deleted.
pub(crate) async fn remove_unreferenced<F>(root: &Path, keep: F) -> io::Result<usize>
where
    F: Fn(&Path) -> bool,
{
    let mut removed = 0;
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
            } else if !keep(&path) {
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %path.display(), "Removed unreferenced file");
                        removed += 1;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(removed)
}

/// Deletes every directory directly under `root` whose name starts with
/// `prefix`, contents included. Returns the number of directories deleted.
pub(crate) async fn remove_prefixed_dirs(root: &Path, prefix: &str) -> io::Result<usize> {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let matches = entry.file_name().to_string_lossy().starts_with(prefix);
        if !matches || !entry.file_type().await?.is_dir() {
            continue;
        }
        let path = entry.path();
        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stale directory");
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

/// Removes `path`, treating a missing file as success.
pub(crate) async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
