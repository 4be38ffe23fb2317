//! Kernel source installation.
//!
//! Takes a resolved [`KernelDescriptor`] and turns it into a prepared source
//! tree under the destination directory:
//!
//! 1. download `rpi-linux-<hash>.tar.gz` (skipped if already present)
//! 2. unpack it to `linux-<hash>`
//! 3. write `.scmversion` and refresh the `linux` and module symlinks
//! 4. install `.config` (running config or defconfig)
//! 5. install `Module.symvers`
//! 6. `make modules_prepare`
//!
//! Under dry-run every step is logged and nothing is written.

pub mod archive;
pub mod links;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::board::ArchitectureType;
use crate::config::Config;
use crate::fetch::Fetch;
use crate::kernel::{KernelDescriptor, KernelVariant};
use crate::process::Cmd;

/// Content of `.scmversion`; keeps `make` from appending git state to the
/// kernel release so it matches the running kernel's `+` suffix.
const SCMVERSION: &str = "+";

/// Installs and prepares one kernel source tree.
pub struct Installer<'a> {
    config: &'a Config,
    fetcher: &'a dyn Fetch,
    dest: PathBuf,
}

impl<'a> Installer<'a> {
    pub fn new(config: &'a Config, fetcher: &'a dyn Fetch, dest: PathBuf) -> Self {
        Self {
            config,
            fetcher,
            dest,
        }
    }

    pub fn source_dir(&self, desc: &KernelDescriptor) -> PathBuf {
        self.dest.join(desc.source_dir_name())
    }

    pub fn tarball_path(&self, desc: &KernelDescriptor) -> PathBuf {
        self.dest.join(desc.tarball_name())
    }

    pub fn linux_link(&self) -> PathBuf {
        self.dest.join("linux")
    }

    /// Download and unpack the tree. Returns the source directory.
    pub fn fetch_source(&self, desc: &KernelDescriptor) -> Result<PathBuf> {
        let source_dir = self.source_dir(desc);
        let tarball = self.tarball_path(desc);
        let url = self.config.endpoints.tarball_url(&desc.git_hash);

        if self.config.dry_run {
            info!("[dry-run] download {} -> {}", url, tarball.display());
            info!(
                "[dry-run] unpack {} -> {}",
                tarball.display(),
                source_dir.display()
            );
            return Ok(source_dir);
        }

        archive::fetch_tarball(self.fetcher, &url, &tarball)?;
        archive::unpack_tarball(&tarball, &self.dest, &source_dir)?;
        if self.config.delete_archive {
            archive::delete_tarball(&tarball)?;
        }
        Ok(source_dir)
    }

    /// Everything after unpacking: markers, links, config, symvers, make.
    pub fn prepare(
        &self,
        desc: &KernelDescriptor,
        variant: &KernelVariant,
        architecture: ArchitectureType,
        kernel_release: &str,
    ) -> Result<()> {
        let source_dir = self.source_dir(desc);

        self.write_tree_files(&source_dir, desc)?;
        self.link_tree(desc, kernel_release)?;
        match &desc.config {
            Some(_) => info!("Installing running kernel config"),
            None => info!("Generating default config ({})", variant.defconfig),
        }
        let targets: Vec<String> = config_targets(desc, variant)
            .into_iter()
            .map(String::from)
            .collect();
        self.make(&source_dir, architecture, &targets)
            .run_interactive()?;
        self.install_symvers(&source_dir, &desc.symvers_url)?;

        match self.prepare_targets() {
            Some(targets) => {
                info!("Running make modules_prepare");
                self.make(&source_dir, architecture, &targets)
                    .run_interactive()?;
            }
            None => info!("  [SKIP] make modules_prepare (--nomake)"),
        }
        Ok(())
    }

    /// `.scmversion`, and `.config` when the running config is known.
    fn write_tree_files(&self, source_dir: &Path, desc: &KernelDescriptor) -> Result<()> {
        self.write_file(&source_dir.join(".scmversion"), SCMVERSION)?;
        if let Some(config) = &desc.config {
            self.write_file(&source_dir.join(".config"), config)?;
        }
        Ok(())
    }

    /// `modules_prepare` targets, or `None` under `--nomake`.
    fn prepare_targets(&self) -> Option<Vec<String>> {
        if self.config.skip_make {
            return None;
        }
        Some(vec![format!("-j{}", make_jobs()), "modules_prepare".to_string()])
    }

    fn link_tree(&self, desc: &KernelDescriptor, kernel_release: &str) -> Result<()> {
        let linux_link = self.linux_link();
        let target = PathBuf::from(desc.source_dir_name());
        if self.config.dry_run {
            info!(
                "[dry-run] ln -sfn {} {}",
                target.display(),
                linux_link.display()
            );
            info!(
                "[dry-run] link {}/{}/{{build,source}} -> {}",
                self.config.modules_root.display(),
                kernel_release,
                linux_link.display()
            );
            return Ok(());
        }

        links::replace_symlink(&linux_link, &target)?;
        links::link_module_dirs(&self.config.modules_root, kernel_release, &linux_link)?;
        info!(
            "  Linked {} and {}/{}/{{build,source}}",
            linux_link.display(),
            self.config.modules_root.display(),
            kernel_release
        );
        Ok(())
    }

    fn install_symvers(&self, source_dir: &Path, url: &str) -> Result<()> {
        let symvers = source_dir.join("Module.symvers");
        let backup = source_dir.join("Module.symvers.orig");

        if self.config.dry_run {
            info!("[dry-run] download {} -> {}", url, symvers.display());
            return Ok(());
        }

        info!("Downloading Module.symvers");
        self.fetcher
            .download(url, &symvers)
            .context("Module.symvers for this kernel is not available upstream")?;
        fs::copy(&symvers, &backup).with_context(|| {
            format!(
                "copying '{}' -> '{}'",
                symvers.display(),
                backup.display()
            )
        })?;
        Ok(())
    }

    fn make(&self, source_dir: &Path, architecture: ArchitectureType, targets: &[String]) -> Cmd {
        let goal = targets.join(" ");
        Cmd::new("make")
            .arg("-C")
            .arg(source_dir)
            .arg(format!("ARCH={}", architecture.kernel_arch()))
            .args(targets)
            .error_msg(format!("make {} failed", goal))
            .dry_run(self.config.dry_run)
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        if self.config.dry_run {
            info!("[dry-run] write {}", path.display());
            return Ok(());
        }
        fs::write(path, contents).with_context(|| format!("writing '{}'", path.display()))
    }
}

/// Configuration target: a running config only needs new options filled
/// in without prompting; otherwise the variant's defconfig is generated.
pub fn config_targets<'v>(desc: &KernelDescriptor, variant: &'v KernelVariant) -> Vec<&'v str> {
    match desc.config {
        Some(_) => vec!["olddefconfig"],
        None => vec![variant.defconfig],
    }
}

fn make_jobs() -> usize {
    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            warn!("Could not detect CPU count ({}), using 4 cores", e);
            4
        }
    }
}
