//! Run configuration.
//!
//! Every option a run depends on is collected into [`Config`] once, in
//! `main`, and passed by reference from there. Nothing below reads the
//! environment or the command line on its own.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::board::BoardOverrides;

/// Default destination for kernel sources.
pub const DEFAULT_DEST: &str = "/root";

/// Firmware mirror used with `rpi-update` installs.
pub const DEFAULT_REPO_URI: &str = "https://github.com/Hexxeh/rpi-firmware";

/// Environment variable overriding [`DEFAULT_REPO_URI`].
pub const REPO_URI_ENV: &str = "REPO_URI";

/// Printed with every fatal error.
pub const HELP_URL: &str = "https://github.com/RPi-Distro/rpi-source/blob/master/README.md";

/// Module directories of installed kernels.
pub const MODULES_ROOT: &str = "/lib/modules";

/// Name of the self-update tag file under `$HOME`.
pub const UPDATE_TAG_FILENAME: &str = ".rpi-source";

/// Upstream endpoints a run talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Raw-content base of the `raspberrypi/firmware` repository.
    pub firmware_raw: String,
    /// Archive base of the `raspberrypi/linux` repository.
    pub linux_archive: String,
    /// Git ref lookup of this tool's own repository.
    pub update_ref: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            firmware_raw: "https://raw.githubusercontent.com/raspberrypi/firmware".to_string(),
            linux_archive: "https://github.com/raspberrypi/linux/archive".to_string(),
            update_ref: "https://api.github.com/repos/RPi-Distro/rpi-source/git/refs/heads/master"
                .to_string(),
        }
    }
}

impl Endpoints {
    pub fn tarball_url(&self, git_hash: &str) -> String {
        format!(
            "{}/{}.tar.gz",
            self.linux_archive.trim_end_matches('/'),
            git_hash
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the source tree and `linux` symlink are placed in.
    pub dest: PathBuf,
    /// Skip `make modules_prepare`.
    pub skip_make: bool,
    /// Firmware repository for `rpi-update` hosts.
    pub repo_uri: String,
    /// Remove the tarball after unpacking.
    pub delete_archive: bool,
    /// Log side effects instead of performing them.
    pub dry_run: bool,
    /// Ignore `/proc/config.gz` and use the variant's defconfig.
    pub default_config: bool,
    pub overrides: BoardOverrides,
    pub skip_space_check: bool,
    pub skip_update_check: bool,
    /// Record the current upstream revision and exit.
    pub tag_update: bool,
    /// Stop after downloading and unpacking.
    pub download_only: bool,
    /// Self-update tag file, `None` when no home directory is known.
    pub update_tag_path: Option<PathBuf>,
    /// Where `<release>/{build,source}` links are created.
    pub modules_root: PathBuf,
    pub endpoints: Endpoints,
}

impl Config {
    /// Check the invariants that do not need the network or the board.
    pub fn validate(&self) -> Result<()> {
        if !self.dest.is_dir() {
            bail!(
                "destination directory '{}' does not exist or is not a directory",
                self.dest.display()
            );
        }
        if self.repo_uri.trim().is_empty() {
            bail!("repository URI must not be empty");
        }
        Ok(())
    }

    /// Absolute destination path, so symlinks stay valid from anywhere.
    pub fn canonical_dest(&self) -> Result<PathBuf> {
        self.dest
            .canonicalize()
            .with_context(|| format!("resolving destination '{}'", self.dest.display()))
    }

    /// Path of the tag file for a given home directory.
    pub fn update_tag_path_in(home: &Path) -> PathBuf {
        home.join(UPDATE_TAG_FILENAME)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(dest: &Path) -> Self {
        Self {
            dest: dest.to_path_buf(),
            skip_make: false,
            repo_uri: DEFAULT_REPO_URI.to_string(),
            delete_archive: false,
            dry_run: false,
            default_config: false,
            overrides: BoardOverrides::default(),
            skip_space_check: true,
            skip_update_check: true,
            tag_update: false,
            download_only: false,
            update_tag_path: None,
            modules_root: dest.join("lib/modules"),
            endpoints: Endpoints::default(),
        }
    }
}
