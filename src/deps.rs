//! Package dependency installation via the npm subprocess.
//!
//! The installer never resolves dependency graphs itself; it shells out to
//! the package manager scoped to production dependencies. Lockfile
//! presence selects the deterministic `ci` path over a plain `install`.

use std::path::Path;
use std::process::Stdio;

use tokio::fs;
use tokio::process::Command;

use crate::error::{InstallerError, Result};

/// Lockfile whose presence selects the deterministic install mode.
pub const LOCKFILE: &str = "package-lock.json";

/// True when `dir` contains a package lockfile.
pub async fn has_package_lock(dir: &Path) -> bool {
    fs::metadata(dir.join(LOCKFILE)).await.is_ok()
}

/// npm arguments for the chosen install mode, production scope only.
fn npm_args(lock: bool) -> &'static [&'static str] {
    if lock {
        &["ci", "--only=production"]
    } else {
        &["install", "--production"]
    }
}

/// A running dependency install.
///
/// The handle exposes both lifecycle control (process identity, kill) and
/// an awaitable completion, so call sites can either fire-and-wait or
/// manage several concurrent installs and terminate them out-of-band.
#[derive(Debug)]
pub struct DependencyInstall {
    child: tokio::process::Child,
}

impl DependencyInstall {
    /// Spawn the package manager in `cwd`.
    pub(crate) fn spawn(npm_binary: &str, cwd: &Path, lock: bool) -> Result<Self> {
        let args = npm_args(lock);
        tracing::debug!(cwd = %cwd.display(), ?args, "spawning dependency install");

        let child = Command::new(npm_binary)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| InstallerError::fs(npm_binary, e))?;

        Ok(Self { child })
    }

    /// OS process identifier, if the process is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Forcibly terminate the subprocess.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }

    /// Wait for the install to finish.
    ///
    /// A non-zero exit surfaces as [`InstallerError::DependencyInstall`]
    /// carrying the exit code and captured stderr.
    pub async fn wait(self) -> Result<()> {
        let output = self
            .child
            .wait_with_output()
            .await
            .map_err(|e| InstallerError::DependencyInstall {
                code: None,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            tracing::warn!(code = ?output.status.code(), "dependency install failed");
            return Err(InstallerError::DependencyInstall {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(())
    }
}
