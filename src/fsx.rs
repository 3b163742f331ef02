//! Filesystem helpers shared by the pipeline steps.

use std::io;
use std::path::Path;

use tokio::fs;

use crate::error::{InstallerError, Result};

/// Create `dir` and any missing parents.
pub(crate) async fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| InstallerError::fs(dir, e))
}

/// Rename `from` to `to`, refusing to overwrite an existing target.
///
/// The equal-path case is still handed to the filesystem (a no-op rename),
/// so callers do not need to special-case it.
pub(crate) async fn rename_guarded(from: &Path, to: &Path) -> Result<()> {
    if from != to && fs::metadata(to).await.is_ok() {
        return Err(InstallerError::fs(
            to,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                "rename target already exists",
            ),
        ));
    }

    fs::rename(from, to)
        .await
        .map_err(|e| InstallerError::fs(from, e))
}

/// Recursively remove `dir`, treating a missing directory as success.
pub(crate) async fn remove_dir_all_if_exists(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallerError::fs(dir, e)),
    }
}
