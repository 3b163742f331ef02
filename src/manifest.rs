//! SlimIO manifest reading and manifest-based directory renaming.
//!
//! A freshly extracted repository lands on disk with the host's archive
//! naming (`Socket-master`). The manifest at its root declares the
//! canonical addon name; the directory is renamed to it exactly once.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;

use crate::error::{InstallerError, Result};

/// Default manifest file name at an agent or addon root.
pub const MANIFEST_FILE: &str = "slimio.toml";

/// The subset of the SlimIO manifest this crate reads.
///
/// Unknown fields (dependencies, doc settings, ...) are ignored; the
/// manifest is read, never written.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Canonical name of the agent or addon.
    pub name: String,
    pub version: Option<String>,
    /// Project kind (`Addon`, `NAPI`, `CLI`, ...).
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Read and parse the manifest at `path`.
pub async fn read_manifest(path: &Path) -> Result<Manifest> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| InstallerError::fs(path, e))?;
    toml::from_str(&contents).map_err(|e| {
        InstallerError::invalid_input(format!("malformed manifest '{}': {e}", path.display()))
    })
}

/// Rename `dir` to the canonical name declared in its manifest.
///
/// When the manifest is missing or malformed the name falls back to the
/// directory's base name up to the first `-`, which matches the
/// `Repo-branch` naming of host-generated archives. This fallback is a
/// designed path, not an error.
///
/// The rename happens exactly once; at most one caller may normalize a
/// given directory at a time. A pre-existing sibling with the target name
/// fails with a filesystem error instead of being overwritten, except
/// when the target is the directory itself (the rename is still attempted
/// and is a filesystem-level no-op).
pub async fn rename_dir_from_manifest(dir: &Path, manifest_file: &str) -> Result<PathBuf> {
    let name = match read_manifest(&dir.join(manifest_file)).await {
        Ok(manifest) => manifest.name,
        Err(e) => {
            let fallback = derive_name_from_dir(dir)?;
            tracing::debug!(
                dir = %dir.display(),
                name = %fallback,
                "no usable manifest ({e}), falling back to directory prefix"
            );
            fallback
        }
    };

    let parent = dir.parent().ok_or_else(|| {
        InstallerError::invalid_input(format!("directory '{}' has no parent", dir.display()))
    })?;
    let target = parent.join(&name);

    crate::fsx::rename_guarded(dir, &target).await?;
    Ok(target)
}

/// Base name of `dir` up to the first `-`.
fn derive_name_from_dir(dir: &Path) -> Result<String> {
    let base = dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            InstallerError::invalid_input(format!(
                "cannot derive a name from directory '{}'",
                dir.display()
            ))
        })?;

    let name = base.split('-').next().unwrap_or(base);
    if name.is_empty() {
        return Err(InstallerError::invalid_input(format!(
            "directory name '{base}' yields an empty addon name"
        )));
    }
    Ok(name.to_string())
}
