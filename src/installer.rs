//! Installation orchestration.
//!
//! [`Installer`] composes expression parsing, fetching, manifest renaming
//! and dependency installation into the two end-to-end workflows: install
//! one addon, and bootstrap a full agent with its built-in addons.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use tokio::process::{Child, Command};
use tokio::task;

use crate::config::InstallerConfig;
use crate::deps::{self, DependencyInstall};
use crate::error::{InstallerError, Result};
use crate::expr::{parse_addon_expr, Host, DEFAULT_ORG_NAME};
use crate::fetch::{self, HttpFetcher, RemoteFetcher};
use crate::fsx;
use crate::manifest::{self, MANIFEST_FILE};
use crate::registry;
use crate::{AGENT_REPOSITORY, BUILT_IN_ADDONS};

/// Options for [`Installer::extract_agent`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Download the agent from the remote host instead of unpacking the
    /// bundled archive.
    pub download_from_remote: bool,
    /// Token for private repository access.
    pub token: Option<String>,
    /// Final directory name; when set, the extracted directory is renamed
    /// exactly once to `dest/name`.
    pub name: Option<String>,
    /// Create `dest` (and parents) before extraction.
    pub force_mkdir: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            download_from_remote: false,
            token: None,
            name: None,
            force_mkdir: true,
        }
    }
}

/// Options for [`Installer::install_addon`].
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Run the dependency install after extraction.
    pub install_dependencies: bool,
    /// Resolve the expression through the registry first, replacing it
    /// with the registry's reported repository URL.
    pub search_in_registry: bool,
    /// Token for private repository access.
    pub token: Option<String>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            install_dependencies: true,
            search_in_registry: false,
            token: None,
        }
    }
}

/// Options for [`Installer::init_agent`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Token for private repository access.
    pub token: Option<String>,
    /// Directory name of the installed agent.
    pub name: String,
    /// Wipe any pre-existing agent directory before extraction.
    pub force_clean: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            token: None,
            name: "agent".to_string(),
            force_clean: true,
        }
    }
}

/// The installation pipeline.
///
/// Configuration is threaded explicitly through the constructor; two
/// installers with different registries or binaries can coexist in one
/// process.
pub struct Installer {
    config: InstallerConfig,
    fetcher: Arc<dyn RemoteFetcher>,
    client: reqwest::Client,
}

impl Installer {
    /// Create an installer backed by the HTTP archive endpoints.
    pub fn new(config: InstallerConfig) -> Self {
        Self::with_fetcher(config, Arc::new(HttpFetcher::new()))
    }

    /// Create an installer with a custom remote fetcher.
    pub fn with_fetcher(config: InstallerConfig, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self {
            config,
            fetcher,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Extract the core agent into `dest` and return its directory path.
    ///
    /// The remote path fetches `SlimIO/Agent` from GitHub; the local path
    /// unpacks the bundled archive configured in
    /// [`InstallerConfig::agent_archive`].
    pub async fn extract_agent(&self, dest: &Path, options: &ExtractOptions) -> Result<PathBuf> {
        if dest.as_os_str().is_empty() {
            return Err(InstallerError::invalid_input(
                "destination path must not be empty",
            ));
        }
        if options.force_mkdir {
            fsx::ensure_dir(dest).await?;
        }

        let current = if options.download_from_remote {
            self.fetcher
                .fetch(
                    Host::GitHub,
                    DEFAULT_ORG_NAME,
                    AGENT_REPOSITORY,
                    dest,
                    options.token.as_deref(),
                )
                .await?
        } else {
            let archive = self.config.agent_archive.clone().ok_or_else(|| {
                InstallerError::invalid_input(
                    "no bundled agent archive configured; set `agent_archive` or extract with `download_from_remote`",
                )
            })?;
            let dest_owned = dest.to_owned();
            task::spawn_blocking(move || {
                crate::archive::unpack_tar_gz_file(&archive, &dest_owned)
            })
            .await
            .map_err(|e| {
                InstallerError::invalid_input(format!("extraction task failed: {e}"))
            })?
            .map_err(|e| InstallerError::fs(dest, e))?
        };

        match options.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                let target = dest.join(name);
                fsx::rename_guarded(&current, &target).await?;
                Ok(target)
            }
            _ => Ok(current),
        }
    }

    /// Install one addon into `dest` and return its final directory path.
    ///
    /// Steps: ensure `dest` → optional registry lookup → resolve the
    /// expression → fetch → manifest rename → optional dependency install.
    /// The first failing step aborts the chain; nothing is retried and
    /// partial results stay on disk.
    pub async fn install_addon(
        &self,
        addon_expr: &str,
        dest: &Path,
        options: &InstallOptions,
    ) -> Result<PathBuf> {
        if dest.as_os_str().is_empty() {
            return Err(InstallerError::invalid_input(
                "destination path must not be empty",
            ));
        }
        fsx::ensure_dir(dest).await?;

        let resolved_expr = if options.search_in_registry {
            registry::get_one_addon(&self.client, &self.config.registry_url, addon_expr)
                .await?
                .git
        } else {
            addon_expr.to_string()
        };
        let addon = parse_addon_expr(&resolved_expr)?;

        let extracted = fetch::fetch_addon(
            &*self.fetcher,
            &addon,
            dest,
            options.token.as_deref(),
        )
        .await?;
        let addon_dir = manifest::rename_dir_from_manifest(&extracted, MANIFEST_FILE).await?;

        if options.install_dependencies {
            let lock = deps::has_package_lock(&addon_dir).await;
            self.install_dependencies(&addon_dir, lock)?.wait().await?;
        }

        tracing::info!(
            addon = %addon.name,
            dir = %addon_dir.display(),
            "addon installed"
        );
        Ok(addon_dir)
    }

    /// Bootstrap a complete agent at `location`.
    ///
    /// Extracts the agent, creates its `addons/` directory, then fans out
    /// the agent's own dependency install and one [`install_addon`] per
    /// built-in addon, all concurrently. Every branch runs to completion;
    /// failures are aggregated into [`InstallerError::Bootstrap`] rather
    /// than cancelling siblings, so nothing is left half-cancelled.
    ///
    /// [`install_addon`]: Self::install_addon
    pub async fn init_agent(&self, location: &Path, options: &InitOptions) -> Result<PathBuf> {
        if location.as_os_str().is_empty() {
            return Err(InstallerError::invalid_input(
                "agent location must not be empty",
            ));
        }

        if options.force_clean {
            fsx::remove_dir_all_if_exists(&location.join(&options.name)).await?;
        }

        let extract_options = ExtractOptions {
            download_from_remote: self.config.agent_archive.is_none(),
            token: options.token.clone(),
            name: Some(options.name.clone()),
            force_mkdir: true,
        };
        let agent_dir = self.extract_agent(location, &extract_options).await?;
        let addons_dir = agent_dir.join("addons");
        fsx::ensure_dir(&addons_dir).await?;

        let mut branches: Vec<BoxFuture<'_, (String, Result<()>)>> = Vec::new();

        let agent_dir_ref = &agent_dir;
        branches.push(Box::pin(async move {
            let outcome = match self.install_dependencies(agent_dir_ref, true) {
                Ok(install) => install.wait().await,
                Err(e) => Err(e),
            };
            ("agent dependencies".to_string(), outcome)
        }));

        for addon_name in BUILT_IN_ADDONS {
            let install_options = InstallOptions {
                token: options.token.clone(),
                ..Default::default()
            };
            let addons_dir_ref = &addons_dir;
            branches.push(Box::pin(async move {
                let outcome = self
                    .install_addon(addon_name, addons_dir_ref, &install_options)
                    .await
                    .map(|_| ());
                (format!("addon {addon_name}"), outcome)
            }));
        }

        let failures: Vec<(String, InstallerError)> = join_all(branches)
            .await
            .into_iter()
            .filter_map(|(branch, outcome)| outcome.err().map(|e| (branch, e)))
            .collect();

        if !failures.is_empty() {
            for (branch, error) in &failures {
                tracing::warn!(%branch, %error, "bootstrap branch failed");
            }
            return Err(InstallerError::Bootstrap { failures });
        }

        tracing::info!(dir = %agent_dir.display(), "agent bootstrap complete");
        Ok(agent_dir)
    }

    /// Run the installed agent and return the live process handle.
    ///
    /// Waits one second after spawning so the agent has started by the
    /// time the handle is returned.
    pub async fn run_agent(&self, location: &Path, silent: bool) -> Result<Child> {
        let entry = location.join("index.js");

        let mut command = Command::new(&self.config.node_binary);
        command.arg("--experimental-modules").arg(&entry);
        if silent {
            command.arg("--silent");
        }

        let child = command.spawn().map_err(|e| {
            tracing::error!(entry = %entry.display(), error = %e, "failed to spawn agent");
            InstallerError::fs(&self.config.node_binary, e)
        })?;

        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(child)
    }

    /// Spawn a dependency install in `cwd`; `lock` selects the
    /// deterministic `npm ci` path over a plain `npm install`.
    pub fn install_dependencies(&self, cwd: &Path, lock: bool) -> Result<DependencyInstall> {
        DependencyInstall::spawn(&self.config.npm_binary, cwd, lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fakes a remote host: "extracts" `Repo-master` with a manifest
    /// declaring the lowercased repository name, and records every fetch.
    #[derive(Default)]
    struct MockFetcher {
        calls: Mutex<Vec<String>>,
        fail_for: Option<&'static str>,
    }

    impl MockFetcher {
        fn failing_for(repo: &'static str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_for: Some(repo),
            }
        }
    }

    #[async_trait]
    impl RemoteFetcher for MockFetcher {
        async fn fetch(
            &self,
            host: Host,
            org: &str,
            repo: &str,
            dest: &Path,
            _token: Option<&str>,
        ) -> Result<PathBuf> {
            self.calls
                .lock()
                .expect("mock lock")
                .push(format!("{}/{org}/{repo}", host.authority()));

            if self.fail_for == Some(repo) {
                return Err(InstallerError::fetch(
                    host.archive_url(org, repo),
                    "mock host rejected the request",
                ));
            }

            let extracted = dest.join(format!("{repo}-master"));
            std::fs::create_dir_all(&extracted).map_err(|e| InstallerError::fs(&extracted, e))?;
            std::fs::write(
                extracted.join(MANIFEST_FILE),
                format!("name = \"{}\"\ntype = \"Addon\"\n", repo.to_lowercase()),
            )
            .map_err(|e| InstallerError::fs(&extracted, e))?;
            Ok(extracted)
        }
    }

    fn offline_config(tmp: &Path) -> InstallerConfig {
        // The agent tarball the original ships under archive/, rebuilt as
        // a fixture; npm is substituted with a zero-exit binary.
        let archive = tmp.join("Agent-master.tar.gz");
        crate::archive::test_support::write_tar_gz(
            &archive,
            "Agent-master",
            &[
                ("index.js", "'use strict';\n"),
                ("slimio.toml", "name = \"agent\"\ntype = \"Service\"\n"),
            ],
        );
        InstallerConfig::new()
            .with_agent_archive(archive)
            .with_npm_binary("true")
    }

    #[tokio::test]
    async fn extract_agent_rejects_empty_destination_before_any_side_effect() {
        let installer = Installer::with_fetcher(
            InstallerConfig::new(),
            Arc::new(MockFetcher::default()),
        );

        let err = installer
            .extract_agent(Path::new(""), &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn extract_agent_unpacks_the_bundled_archive_and_renames_it() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let installer = Installer::with_fetcher(
            offline_config(tmp.path()),
            Arc::new(MockFetcher::default()),
        );

        let options = ExtractOptions {
            name: Some("agent".to_string()),
            ..Default::default()
        };
        let dest = tmp.path().join("out");
        let agent_dir = installer.extract_agent(&dest, &options).await.expect("extract");

        assert_eq!(agent_dir, dest.join("agent"));
        assert!(agent_dir.join("index.js").is_file());
        assert!(!dest.join("Agent-master").exists());
    }

    #[tokio::test]
    async fn extract_agent_without_name_returns_the_raw_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let installer = Installer::with_fetcher(
            offline_config(tmp.path()),
            Arc::new(MockFetcher::default()),
        );

        let dest = tmp.path().join("out");
        let agent_dir = installer
            .extract_agent(&dest, &ExtractOptions::default())
            .await
            .expect("extract");
        assert_eq!(agent_dir, dest.join("Agent-master"));
    }

    #[tokio::test]
    async fn install_addon_fetches_renames_and_returns_the_final_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fetcher = Arc::new(MockFetcher::default());
        let installer = Installer::with_fetcher(InstallerConfig::new(), fetcher.clone());

        let options = InstallOptions {
            install_dependencies: false,
            ..Default::default()
        };
        let addon_dir = installer
            .install_addon("Socket", tmp.path(), &options)
            .await
            .expect("install");

        assert_eq!(addon_dir, tmp.path().join("socket"));
        assert!(addon_dir.join(MANIFEST_FILE).is_file());
        assert_eq!(
            fetcher.calls.lock().expect("mock lock").as_slice(),
            ["github.com/SlimIO/Socket"]
        );
    }

    #[tokio::test]
    async fn install_addon_honors_org_and_dotted_expressions() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fetcher = Arc::new(MockFetcher::default());
        let installer = Installer::with_fetcher(InstallerConfig::new(), fetcher.clone());

        let options = InstallOptions {
            install_dependencies: false,
            ..Default::default()
        };
        installer
            .install_addon("org.cpu", tmp.path(), &options)
            .await
            .expect("install");

        assert_eq!(
            fetcher.calls.lock().expect("mock lock").as_slice(),
            ["github.com/org/cpu"]
        );
    }

    #[tokio::test]
    async fn install_addon_runs_the_dependency_install_when_requested() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let installer = Installer::with_fetcher(
            InstallerConfig::new().with_npm_binary("true"),
            Arc::new(MockFetcher::default()),
        );

        installer
            .install_addon("Events", tmp.path(), &InstallOptions::default())
            .await
            .expect("install with dependencies");
    }

    #[tokio::test]
    async fn install_addon_propagates_unsupported_host() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let installer = Installer::with_fetcher(
            InstallerConfig::new(),
            Arc::new(MockFetcher::default()),
        );

        let err = installer
            .install_addon(
                "https://bitbucket.org/SlimIO/Socket",
                tmp.path(),
                &InstallOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::UnsupportedHost { .. }));
    }

    #[tokio::test]
    async fn init_agent_installs_every_built_in_addon() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let installer = Installer::with_fetcher(
            offline_config(tmp.path()),
            Arc::new(MockFetcher::default()),
        );

        let location = tmp.path().join("slimio");
        let agent_dir = installer
            .init_agent(&location, &InitOptions::default())
            .await
            .expect("bootstrap");

        assert_eq!(agent_dir, location.join("agent"));
        let addons: Vec<String> = std::fs::read_dir(agent_dir.join("addons"))
            .expect("read addons dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(addons.len(), BUILT_IN_ADDONS.len());
        for addon in BUILT_IN_ADDONS {
            assert!(addons.contains(&addon.to_lowercase()), "missing {addon}");
        }
    }

    #[tokio::test]
    async fn init_agent_runs_to_completion_and_aggregates_failures() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let installer = Installer::with_fetcher(
            offline_config(tmp.path()),
            Arc::new(MockFetcher::failing_for("Gate")),
        );

        let location = tmp.path().join("slimio");
        let err = installer
            .init_agent(&location, &InitOptions::default())
            .await
            .unwrap_err();

        match err {
            InstallerError::Bootstrap { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, "addon Gate");
            }
            other => panic!("expected Bootstrap, got {other:?}"),
        }

        // Sibling branches were not cancelled: the other addons landed.
        let addons_dir = location.join("agent").join("addons");
        assert!(addons_dir.join("events").is_dir());
        assert!(addons_dir.join("aggregator").is_dir());
        assert!(!addons_dir.join("gate").exists());
    }

    #[tokio::test]
    async fn init_agent_force_clean_wipes_a_previous_install() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let installer = Installer::with_fetcher(
            offline_config(tmp.path()),
            Arc::new(MockFetcher::default()),
        );

        let location = tmp.path().join("slimio");
        let stale = location.join("agent");
        std::fs::create_dir_all(&stale).expect("mkdir");
        std::fs::write(stale.join("leftover.txt"), "stale").expect("write");

        let agent_dir = installer
            .init_agent(&location, &InitOptions::default())
            .await
            .expect("bootstrap over stale install");
        assert!(!agent_dir.join("leftover.txt").exists());
        assert!(agent_dir.join("index.js").is_file());
    }
}
