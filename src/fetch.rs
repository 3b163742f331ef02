//! Remote archive fetching.
//!
//! The dispatcher selects a backend by the typed [`Host`] of a resolved
//! addon, downloads the repository's default-branch tarball over HTTP and
//! unpacks it into the destination directory. The [`RemoteFetcher`] trait
//! is the seam the orchestrator tests use to substitute the remote host.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::task;

use crate::archive;
use crate::error::{InstallerError, Result};
use crate::expr::{AddonRef, Host};

/// Backend contract: download and extract `org/repo` from `host` into
/// `dest`, returning the freshly extracted (not yet renamed) directory.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(
        &self,
        host: Host,
        org: &str,
        repo: &str,
        dest: &Path,
        token: Option<&str>,
    ) -> Result<PathBuf>;
}

/// Production fetcher backed by the hosts' HTTP archive endpoints.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(
        &self,
        host: Host,
        org: &str,
        repo: &str,
        dest: &Path,
        token: Option<&str>,
    ) -> Result<PathBuf> {
        let url = host.archive_url(org, repo);
        tracing::info!(%url, dest = %dest.display(), "downloading repository archive");

        let mut request = self.client.get(&url);
        if let Some(token) = token {
            let (header, value) = host.auth_header(token);
            request = request.header(header, value);
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| InstallerError::fetch(url.as_str(), e))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| InstallerError::fetch(url.as_str(), e))?;

        let dest = dest.to_owned();
        let extracted = task::spawn_blocking(move || {
            archive::unpack_tar_gz(std::io::Cursor::new(bytes), &dest)
        })
        .await
        .map_err(|e| InstallerError::fetch(url.as_str(), e))?
        .map_err(|e| InstallerError::fetch(url.as_str(), format!("archive extraction failed: {e}")))?;

        Ok(extracted)
    }
}

/// Dispatch a fetch for a resolved addon; an unhosted reference goes to
/// the default backend (GitHub).
pub(crate) async fn fetch_addon(
    fetcher: &dyn RemoteFetcher,
    addon: &AddonRef,
    dest: &Path,
    token: Option<&str>,
) -> Result<PathBuf> {
    let host = addon.host.unwrap_or(Host::GitHub);
    tracing::debug!(
        org = %addon.org,
        name = %addon.name,
        host = host.authority(),
        "dispatching fetch"
    );
    fetcher.fetch(host, &addon.org, &addon.name, dest, token).await
}
