//! Preflight checks run before anything is downloaded.
//!
//! Validates that the host has the tools and free space a run needs, so a
//! failure shows up as a remediation hint instead of halfway through `make`.
//!
//! # Example
//!
//! ```rust
//! use rpi_source::preflight::{check_required_tools, command_exists};
//!
//! if !command_exists("make") {
//!     println!("make not installed");
//! }
//!
//! let tools = &[("make", "make"), ("bc", "bc")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::config::Config;

/// Free space needed for the unpacked tree plus `modules_prepare` output.
pub const MIN_FREE_BYTES: u64 = 800 * 1024 * 1024;

/// Tools needed to configure the tree (kconfig host programs).
///
/// Each tuple is (command_name, package_name).
pub const CONFIG_TOOLS: &[(&str, &str)] = &[
    ("make", "make"),
    ("gcc", "gcc"),
    ("flex", "flex"),
    ("bison", "bison"),
];

/// Extra tools `make modules_prepare` needs.
pub const PREPARE_TOOLS: &[(&str, &str)] = &[("bc", "bc")];

/// Check if a command exists in PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!(
            "Missing required host tools:\n{}\nRun: sudo apt install {}",
            msg,
            missing
                .iter()
                .map(|(_, p)| *p)
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    Ok(())
}

/// Tools a run with this configuration will invoke.
pub fn required_tools(config: &Config) -> Vec<(&'static str, &'static str)> {
    if config.download_only {
        return Vec::new();
    }
    let mut tools = CONFIG_TOOLS.to_vec();
    if !config.skip_make {
        tools.extend_from_slice(PREPARE_TOOLS);
    }
    tools
}

/// Fail unless `dir`'s filesystem has at least `min_bytes` available.
pub fn check_disk_space(dir: &Path, min_bytes: u64) -> Result<()> {
    let available = fs2::available_space(dir)
        .with_context(|| format!("querying free space on '{}'", dir.display()))?;

    if available < min_bytes {
        bail!(
            "Not enough free space on '{}': {} MB available, {} MB needed\n\
             Free some space or pass --skip-space",
            dir.display(),
            available / (1024 * 1024),
            min_bytes / (1024 * 1024)
        );
    }
    Ok(())
}

/// Run every preflight check the configuration asks for.
pub fn check_host(config: &Config) -> Result<()> {
    check_required_tools(&required_tools(config))?;
    if !config.skip_space_check {
        check_disk_space(&config.dest, MIN_FREE_BYTES)?;
    }
    Ok(())
}
