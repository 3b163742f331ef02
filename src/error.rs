//! Error types for installer operations.
//!
//! Every failure surfaces as an [`InstallerError`]; the only deliberately
//! swallowed path is the missing-manifest fallback in directory renaming,
//! which is a designed behavior rather than an error.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, InstallerError>;

/// Failures produced by the installation pipeline.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// Malformed argument caught at the boundary, before any side effect.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// An addon expression resolved to a URL on an unrecognized host.
    #[error("unsupported host '{host}': only github.com and gitlab.com are supported")]
    UnsupportedHost { host: String },

    /// Remote download or archive extraction failed.
    #[error("failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// A filesystem operation (mkdir, rename, remove) failed.
    #[error("filesystem operation failed at '{}': {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The package-manager subprocess exited with a non-zero status.
    #[error("dependency install failed with exit code {code:?}")]
    DependencyInstall { code: Option<i32>, stderr: String },

    /// Registry lookup for a published addon failed.
    #[error("registry lookup failed for addon '{name}': {reason}")]
    Registry { name: String, reason: String },

    /// One or more branches of a concurrent bootstrap failed.
    ///
    /// All branches run to completion; failures are collected rather than
    /// cancelling siblings, so partially installed addons stay on disk for
    /// inspection.
    #[error("agent bootstrap finished with {} failed task(s): {}", failures.len(), summarize(failures))]
    Bootstrap {
        failures: Vec<(String, InstallerError)>,
    },
}

impl InstallerError {
    /// Shorthand for [`InstallerError::InvalidInput`].
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred on.
    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for [`InstallerError::Fetch`].
    pub(crate) fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

fn summarize(failures: &[(String, InstallerError)]) -> String {
    failures
        .iter()
        .map(|(task, err)| format!("{task}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_error_lists_failed_tasks() {
        let err = InstallerError::Bootstrap {
            failures: vec![
                (
                    "addon Socket".to_string(),
                    InstallerError::invalid_input("empty expression"),
                ),
                (
                    "agent dependencies".to_string(),
                    InstallerError::DependencyInstall {
                        code: Some(1),
                        stderr: String::new(),
                    },
                ),
            ],
        };

        let message = err.to_string();
        assert!(message.contains("2 failed task(s)"));
        assert!(message.contains("addon Socket"));
        assert!(message.contains("agent dependencies"));
    }

    #[test]
    fn filesystem_error_carries_path() {
        let err = InstallerError::fs(
            "/tmp/addons/cpu",
            io::Error::new(io::ErrorKind::AlreadyExists, "exists"),
        );
        assert!(err.to_string().contains("/tmp/addons/cpu"));
    }
}
