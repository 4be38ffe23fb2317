//! Installed firmware revision and the kernel it corresponds to.
//!
//! Two kinds of hosts exist:
//!
//! - Raspberry Pi OS installs the firmware as a Debian package, whose
//!   changelog records the upstream firmware revision of each release.
//! - `rpi-update` installs firmware straight from a git mirror and leaves a
//!   `.firmware_revision` marker in the boot partition.
//!
//! [`RevisionSource::detect`] picks whichever is present (changelog first);
//! [`RevisionSource::resolve`] turns it into a [`KernelDescriptor`].

pub mod changelog;
pub mod running_config;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::board::HostProbe;
use crate::config::Config;
use crate::fetch::Fetch;
use crate::kernel::{KernelDescriptor, KernelVariant};

/// Packaged changelogs, in priority order.
pub const CHANGELOG_PATHS: &[&str] = &[
    "/usr/share/doc/raspberrypi-bootloader/changelog.Debian.gz",
    "/usr/share/doc/raspi-firmware/changelog.Debian.gz",
];

/// `rpi-update` revision markers, in priority order.
pub const FIRMWARE_MARKER_PATHS: &[&str] = &[
    "/boot/firmware/.firmware_revision",
    "/boot/.firmware_revision",
];

/// Where the installed firmware revision is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSource {
    /// Gzipped Debian changelog of the firmware package.
    Changelog(PathBuf),
    /// Plain-text revision left behind by `rpi-update`.
    FirmwareMarker(PathBuf),
}

impl RevisionSource {
    /// Pick the revision source present on the host.
    pub fn detect(probe: &dyn HostProbe) -> Result<Self> {
        if let Some(path) = first_existing(probe, CHANGELOG_PATHS) {
            return Ok(RevisionSource::Changelog(path));
        }
        if let Some(path) = first_existing(probe, FIRMWARE_MARKER_PATHS) {
            return Ok(RevisionSource::FirmwareMarker(path));
        }

        bail!(
            "cannot determine installed firmware revision; none of these exist:\n  {}",
            CHANGELOG_PATHS
                .iter()
                .chain(FIRMWARE_MARKER_PATHS)
                .copied()
                .collect::<Vec<_>>()
                .join("\n  ")
        )
    }

    pub fn path(&self) -> &Path {
        match self {
            RevisionSource::Changelog(path) | RevisionSource::FirmwareMarker(path) => path,
        }
    }

    /// The firmware revision recorded by this source.
    pub fn revision(&self, probe: &dyn HostProbe) -> Result<String> {
        let bytes = probe
            .read(self.path())?
            .with_context(|| format!("'{}' disappeared", self.path().display()))?;

        match self {
            RevisionSource::Changelog(path) => {
                let text = gunzip(&bytes)
                    .with_context(|| format!("decompressing '{}'", path.display()))?;
                changelog::parse_firmware_revision(&text)
                    .with_context(|| format!("parsing '{}'", path.display()))
            }
            RevisionSource::FirmwareMarker(path) => {
                let revision = String::from_utf8_lossy(&bytes).trim().to_string();
                if revision.is_empty() {
                    bail!("firmware revision marker '{}' is empty", path.display());
                }
                Ok(revision)
            }
        }
    }

    /// Base URL that serves the raw firmware files for `revision`.
    fn raw_base(&self, config: &Config, revision: &str) -> String {
        match self {
            RevisionSource::Changelog(_) => format!(
                "{}/{}/extra",
                config.endpoints.firmware_raw.trim_end_matches('/'),
                revision
            ),
            RevisionSource::FirmwareMarker(_) => {
                format!("{}/{}", raw_content_base(&config.repo_uri), revision)
            }
        }
    }

    /// Resolve the kernel commit, symvers location and running config.
    pub fn resolve(
        &self,
        probe: &dyn HostProbe,
        fetcher: &dyn Fetch,
        config: &Config,
        variant: &KernelVariant,
    ) -> Result<KernelDescriptor> {
        let revision = self.revision(probe)?;
        info!(
            "Firmware revision {} (from {})",
            revision,
            self.path().display()
        );

        let base = self.raw_base(config, &revision);
        let git_hash_url = format!("{}/git_hash", base);
        let git_hash = fetcher
            .get_text(&git_hash_url)
            .context("fetching kernel git hash for the installed firmware")?
            .trim()
            .to_string();
        if git_hash.is_empty() {
            bail!("{} returned an empty git hash", git_hash_url);
        }

        let symvers_url = format!("{}/{}", base, variant.symvers_filename());

        let running = if config.default_config {
            None
        } else {
            running_config::read_running_config(probe)?
        };

        Ok(KernelDescriptor {
            git_hash,
            symvers_url,
            config: running,
        })
    }
}

fn first_existing(probe: &dyn HostProbe, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| probe.exists(path))
}

/// Map a GitHub repository URI to its raw-content host.
///
/// Non-GitHub mirrors are assumed to serve raw files at the URI itself.
pub fn raw_content_base(repo_uri: &str) -> String {
    repo_uri
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .replacen("://github.com/", "://raw.githubusercontent.com/", 1)
}

pub(crate) fn gunzip(compressed: &[u8]) -> Result<String> {
    let mut text = String::new();
    GzDecoder::new(compressed)
        .read_to_string(&mut text)
        .context("gzip stream is corrupt or not UTF-8")?;
    Ok(text)
}
