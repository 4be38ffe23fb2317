//! Running kernel configuration snapshot (`/proc/config.gz`).

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::board::HostProbe;

/// Compressed config exposed by the `configs` module.
pub const RUNNING_CONFIG: &str = "/proc/config.gz";

const CONFIGS_MODULE: &str = "configs";

/// Read the running kernel's `.config`.
///
/// Returns `None` when the kernel does not expose one; the installer then
/// generates a default config instead.
pub fn read_running_config(probe: &dyn HostProbe) -> Result<Option<String>> {
    if let Err(e) = probe.load_module(CONFIGS_MODULE) {
        // Built-in or missing module; the file may still be there.
        debug!("modprobe {}: {:#}", CONFIGS_MODULE, e);
    }

    let path = Path::new(RUNNING_CONFIG);
    match probe.read(path)? {
        Some(compressed) => {
            let config = super::gunzip(&compressed)
                .with_context(|| format!("decompressing {}", RUNNING_CONFIG))?;
            Ok(Some(config))
        }
        None => {
            warn!(
                "{} not found; a default config will be generated",
                RUNNING_CONFIG
            );
            Ok(None)
        }
    }
}
