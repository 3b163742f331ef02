//! Addon expression parsing.
//!
//! An addon can be designated four ways: a bare name (`"cpu"`), an
//! org/name pair (`"org/cpu"`), a dotted pair (`"org.cpu"`), or a full
//! repository URL (`"https://github.com/SlimIO/Socket"`). All four forms
//! normalize to an [`AddonRef`] so the rest of the pipeline never deals
//! with raw expressions.

use url::Url;

use crate::error::{InstallerError, Result};

/// Default organization assumed for bare addon names.
pub const DEFAULT_ORG_NAME: &str = "SlimIO";

/// Remote hosts the fetch dispatcher knows how to download archives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Host {
    GitHub,
    GitLab,
}

impl Host {
    /// Map a URL authority to a supported host.
    pub fn from_authority(authority: &str) -> Option<Self> {
        match authority {
            "github.com" => Some(Self::GitHub),
            "gitlab.com" => Some(Self::GitLab),
            _ => None,
        }
    }

    /// The URL authority of this host.
    pub fn authority(self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
            Self::GitLab => "gitlab.com",
        }
    }

    /// URL of the default-branch tarball for `org/repo` on this host.
    pub fn archive_url(self, org: &str, repo: &str) -> String {
        match self {
            Self::GitHub => {
                format!("https://codeload.github.com/{org}/{repo}/tar.gz/master")
            }
            Self::GitLab => {
                format!("https://gitlab.com/{org}/{repo}/-/archive/master/{repo}-master.tar.gz")
            }
        }
    }

    /// Authorization header (name, value) for a private repository token.
    pub fn auth_header(self, token: &str) -> (&'static str, String) {
        match self {
            Self::GitHub => ("Authorization", format!("token {token}")),
            Self::GitLab => ("PRIVATE-TOKEN", token.to_string()),
        }
    }
}

/// A fully resolved addon location.
///
/// `host == None` means the expression carried no host and resolution is
/// left to the dispatcher's default backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonRef {
    pub org: String,
    pub name: String,
    pub host: Option<Host>,
}

/// True when the expression is URL-shaped and must go through [`Url`].
///
/// Classification is explicit so that a genuine URL parse failure is a
/// real error instead of a branch signal.
fn is_url_shaped(expr: &str) -> bool {
    expr.contains("://")
}

/// Resolve an addon expression into an [`AddonRef`].
///
/// ```
/// use slimio_installer::{parse_addon_expr, Host};
///
/// let addon = parse_addon_expr("Socket").unwrap();
/// assert_eq!((addon.org.as_str(), addon.name.as_str()), ("SlimIO", "Socket"));
///
/// let addon = parse_addon_expr("https://github.com/SlimIO/Socket").unwrap();
/// assert_eq!(addon.host, Some(Host::GitHub));
/// ```
pub fn parse_addon_expr(expr: &str) -> Result<AddonRef> {
    if expr.trim().is_empty() {
        return Err(InstallerError::invalid_input("addon expression is empty"));
    }

    if is_url_shaped(expr) {
        parse_url_expr(expr)
    } else {
        parse_plain_expr(expr)
    }
}

fn parse_url_expr(expr: &str) -> Result<AddonRef> {
    let parsed = Url::parse(expr)
        .map_err(|e| InstallerError::invalid_input(format!("malformed addon URL '{expr}': {e}")))?;

    let authority = parsed
        .host_str()
        .ok_or_else(|| InstallerError::invalid_input(format!("addon URL '{expr}' has no host")))?;
    let host = Host::from_authority(authority).ok_or_else(|| InstallerError::UnsupportedHost {
        host: authority.to_string(),
    })?;

    let mut segments = parsed
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty());
    let org = segments.next();
    let name = segments.next();

    match (org, name) {
        (Some(org), Some(name)) => Ok(AddonRef {
            org: org.to_string(),
            name: name.to_string(),
            host: Some(host),
        }),
        _ => Err(InstallerError::invalid_input(format!(
            "addon URL '{expr}' must contain an organization and a repository"
        ))),
    }
}

fn parse_plain_expr(expr: &str) -> Result<AddonRef> {
    // Dotted form is equivalent to the slash form.
    let normalized = expr.replace('.', "/");

    let mut parts = normalized.split('/');
    // split always yields at least one item.
    let first = parts.next().unwrap_or_default();
    let second = parts.next();

    let (org, name) = match second {
        None => (DEFAULT_ORG_NAME, first),
        // Segments beyond the second are dropped.
        Some(name) => (first, name),
    };

    if org.is_empty() || name.is_empty() {
        return Err(InstallerError::invalid_input(format!(
            "addon expression '{expr}' has an empty organization or name"
        )));
    }

    Ok(AddonRef {
        org: org.to_string(),
        name: name.to_string(),
        host: None,
    })
}
