//! Installer configuration.
//!
//! All tunables are threaded explicitly through [`InstallerConfig`] into the
//! [`Installer`](crate::Installer) constructor; there is no process-wide
//! mutable state. The registry endpoint in particular is a plain
//! configuration value with a setter, not a package-level global.

use std::path::PathBuf;

use url::Url;

/// Default SlimIO registry endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.slimio.fr";

/// Configuration for an [`Installer`](crate::Installer).
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Registry endpoint consulted when an addon is resolved by published
    /// name instead of by expression.
    pub registry_url: Url,
    /// Package-manager binary invoked for dependency installs.
    pub npm_binary: String,
    /// JavaScript runtime binary used to run the extracted agent.
    pub node_binary: String,
    /// Bundled `Agent-master.tar.gz` used for offline agent extraction.
    /// When absent, the agent is always fetched from the remote host.
    pub agent_archive: Option<PathBuf>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            // The constant is a valid absolute URL, parsing cannot fail.
            registry_url: Url::parse(DEFAULT_REGISTRY_URL).expect("default registry URL is valid"),
            npm_binary: default_npm_binary(),
            node_binary: "node".to_string(),
            agent_archive: None,
        }
    }
}

impl InstallerConfig {
    /// Create a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point registry lookups at a different endpoint.
    ///
    /// URL validity is enforced by the [`Url`] type at the call site.
    pub fn set_registry_url(&mut self, url: Url) {
        self.registry_url = url;
    }

    /// Builder-style variant of [`set_registry_url`](Self::set_registry_url).
    pub fn with_registry_url(mut self, url: Url) -> Self {
        self.registry_url = url;
        self
    }

    /// Override the package-manager binary (used by tests to substitute npm).
    pub fn with_npm_binary(mut self, binary: impl Into<String>) -> Self {
        self.npm_binary = binary.into();
        self
    }

    /// Override the JavaScript runtime binary.
    pub fn with_node_binary(mut self, binary: impl Into<String>) -> Self {
        self.node_binary = binary.into();
        self
    }

    /// Use a local agent tarball instead of downloading from the remote host.
    pub fn with_agent_archive(mut self, archive: impl Into<PathBuf>) -> Self {
        self.agent_archive = Some(archive.into());
        self
    }
}

fn default_npm_binary() -> String {
    if cfg!(windows) {
        "npm.cmd".to_string()
    } else {
        "npm".to_string()
    }
}
