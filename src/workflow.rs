//! One end-to-end run: board → variant → firmware revision → source tree.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::board::{identify_board, HostProbe};
use crate::config::Config;
use crate::fetch::Fetch;
use crate::firmware::RevisionSource;
use crate::install::Installer;
use crate::kernel::KernelVariant;

/// How a run ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Tree unpacked, configured and prepared.
    Prepared { source_dir: PathBuf },
    /// `--download-only`: tree unpacked and left alone.
    Downloaded { source_dir: PathBuf },
    /// The tree for this kernel already exists; nothing was downloaded.
    AlreadyInstalled { source_dir: PathBuf },
}

impl RunOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Prepared { .. } | RunOutcome::Downloaded { .. } => 0,
            RunOutcome::AlreadyInstalled { .. } => 1,
        }
    }
}

/// Resolve the running kernel's source and install it under the destination.
pub fn run(config: &Config, probe: &dyn HostProbe, fetcher: &dyn Fetch) -> Result<RunOutcome> {
    let board = identify_board(probe, &config.overrides).context("identifying board")?;
    let variant = KernelVariant::for_board(&board)?;
    info!(
        "Board: {}; kernel variant '{}' ({})",
        board, variant.suffix, variant.defconfig
    );

    let source = RevisionSource::detect(probe)?;
    let desc = source.resolve(probe, fetcher, config, &variant)?;
    info!("Kernel source commit {}", desc.git_hash);

    let installer = Installer::new(config, fetcher, config.canonical_dest()?);
    let source_dir = installer.source_dir(&desc);
    if source_dir.exists() {
        return Ok(RunOutcome::AlreadyInstalled { source_dir });
    }

    installer.fetch_source(&desc)?;
    if config.download_only {
        return Ok(RunOutcome::Downloaded { source_dir });
    }

    let release = probe.kernel_release()?;
    installer.prepare(&desc, &variant, board.architecture, &release)?;
    Ok(RunOutcome::Prepared { source_dir })
}
