//! SlimIO registry lookup.
//!
//! Thin client for the registry endpoint that maps a published addon name
//! to its repository location. The endpoint comes from
//! [`InstallerConfig`](crate::InstallerConfig), never from global state.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{InstallerError, Result};

/// Registry record for a published addon.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryAddon {
    pub name: String,
    /// Repository URL the addon is installed from.
    pub git: String,
}

/// Look up one addon by its published name.
pub(crate) async fn get_one_addon(
    client: &Client,
    registry_url: &Url,
    addon_name: &str,
) -> Result<RegistryAddon> {
    let url = registry_url
        .join(&format!("addon/{addon_name}"))
        .map_err(|e| InstallerError::Registry {
            name: addon_name.to_string(),
            reason: e.to_string(),
        })?;

    tracing::debug!(%url, addon = addon_name, "querying registry");
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| InstallerError::Registry {
            name: addon_name.to_string(),
            reason: e.to_string(),
        })?;

    response
        .json::<RegistryAddon>()
        .await
        .map_err(|e| InstallerError::Registry {
            name: addon_name.to_string(),
            reason: format!("malformed registry response: {e}"),
        })
}
