//! Upstream revision tracking for the tool itself.
//!
//! The last acknowledged upstream commit is kept in `$HOME/.rpi-source`.
//! Each run compares it against the upstream branch head and warns when they
//! differ; `--tag-update` records the current head.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fetch::Fetch;

/// Git ref as returned by the GitHub refs API.
#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

/// Result of comparing the stored tag with upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    /// Upstream moved (or no tag has been stored yet).
    Available { current: Option<String>, latest: String },
}

/// Fetch the upstream branch head.
pub fn latest_revision(fetcher: &dyn Fetch, ref_url: &str) -> Result<String> {
    let body = fetcher
        .get_text(ref_url)
        .context("looking up latest rpi-source revision")?;
    let git_ref: GitRef = serde_json::from_str(&body)
        .with_context(|| format!("parsing ref lookup response from {}", ref_url))?;
    let sha = git_ref.object.sha.trim().to_string();
    if sha.is_empty() {
        bail!("ref lookup at {} returned an empty sha", ref_url);
    }
    Ok(sha)
}

/// Read the stored tag, `None` if it was never written.
pub fn read_tag(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(tag) => Ok(Some(tag.trim().to_string()).filter(|t| !t.is_empty())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading '{}'", path.display())),
    }
}

pub fn write_tag(path: &Path, revision: &str) -> Result<()> {
    fs::write(path, format!("{}\n", revision))
        .with_context(|| format!("writing '{}'", path.display()))
}

pub fn compare(current: Option<String>, latest: String) -> UpdateStatus {
    if current.as_deref() == Some(latest.as_str()) {
        UpdateStatus::UpToDate
    } else {
        UpdateStatus::Available { current, latest }
    }
}

/// Warn if upstream has moved past the stored tag.
///
/// The check is advisory: lookup failures are logged and the run goes on.
pub fn check_for_update(config: &Config, fetcher: &dyn Fetch) -> Option<UpdateStatus> {
    let tag_path = config.update_tag_path.as_deref()?;

    let status = latest_revision(fetcher, &config.endpoints.update_ref)
        .and_then(|latest| Ok(compare(read_tag(tag_path)?, latest)));

    match status {
        Ok(status) => {
            match &status {
                UpdateStatus::UpToDate => debug!("rpi-source is up to date"),
                UpdateStatus::Available { latest, .. } => warn!(
                    "A newer rpi-source revision is available ({}); \
                     update the tool, then run with --tag-update to acknowledge",
                    latest
                ),
            }
            Some(status)
        }
        Err(e) => {
            warn!("Skipping update check: {:#}", e);
            None
        }
    }
}

/// Record the current upstream revision in the tag file.
pub fn tag_update(config: &Config, fetcher: &dyn Fetch) -> Result<String> {
    let Some(tag_path) = config.update_tag_path.as_deref() else {
        bail!("cannot locate the home directory to store the update tag");
    };
    let latest = latest_revision(fetcher, &config.endpoints.update_ref)?;

    if config.dry_run {
        info!("[dry-run] write {} to {}", latest, tag_path.display());
    } else {
        write_tag(tag_path, &latest)?;
        info!("Recorded rpi-source revision {} in {}", latest, tag_path.display());
    }
    Ok(latest)
}
