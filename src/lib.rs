//! # SlimIO Installer
//!
//! Download, extract and bootstrap the SlimIO agent and its addons.
//!
//! The pipeline takes a loosely specified addon expression (bare name,
//! `org/name`, `org.name`, or a full repository URL), resolves it to a
//! typed `(org, name, host)` reference, fetches the repository archive,
//! renames the extracted directory to the canonical name declared in its
//! `slimio.toml` manifest, and optionally installs its npm dependencies.
//!
//! ## Install Flow
//! 1. Resolve the addon expression ([`parse_addon_expr`])
//! 2. Fetch and extract the archive ([`RemoteFetcher`])
//! 3. Normalize the directory name ([`rename_dir_from_manifest`])
//! 4. Install production dependencies ([`DependencyInstall`])
//!
//! Bootstrapping an agent ([`Installer::init_agent`]) additionally fans
//! out one install per built-in addon, concurrently with the agent's own
//! dependency install.
//!
//! ## Modules
//! - `expr`: addon expression parsing and host dispatch
//! - `fetch`: remote archive download and extraction
//! - `manifest`: manifest reading and directory renaming
//! - `deps`: package-manager subprocess handling
//! - `registry`: published-addon registry lookup
//! - `installer`: the end-to-end orchestrator

mod archive;
pub mod config;
pub mod deps;
pub mod error;
pub mod expr;
pub mod fetch;
mod fsx;
pub mod installer;
pub mod manifest;
pub mod registry;

pub use config::{InstallerConfig, DEFAULT_REGISTRY_URL};
pub use deps::{has_package_lock, DependencyInstall, LOCKFILE};
pub use error::{InstallerError, Result};
pub use expr::{parse_addon_expr, AddonRef, Host, DEFAULT_ORG_NAME};
pub use fetch::{HttpFetcher, RemoteFetcher};
pub use installer::{ExtractOptions, InitOptions, InstallOptions, Installer};
pub use manifest::{read_manifest, rename_dir_from_manifest, Manifest, MANIFEST_FILE};
pub use registry::RegistryAddon;

/// Addons every agent bootstrap installs alongside the agent itself.
///
/// Read-only; callers can introspect it to verify bootstrap completeness.
pub const BUILT_IN_ADDONS: [&str; 5] = ["Events", "Socket", "Gate", "Alerting", "Aggregator"];

/// Repository name of the core agent under the default organization.
pub const AGENT_REPOSITORY: &str = "Agent";
