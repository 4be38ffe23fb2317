//! Kernel sources for building Raspberry Pi kernel modules.
//!
//! Raspberry Pi kernels are not built from a tagged upstream release: each
//! firmware release ships a kernel built from some commit of
//! `raspberrypi/linux`. Building an out-of-tree module needs that exact tree,
//! configured like the running kernel and carrying its `Module.symvers`.
//! This crate finds and prepares it:
//!
//! - **Board identification** - SoC family, word size and page size
//! - **Kernel variant** - which `kernel*.img` / `Module*.symvers` applies
//! - **Firmware revision** - from the Debian changelog or `rpi-update` marker
//! - **Installation** - download, unpack, link, configure, `modules_prepare`
//!
//! # Architecture
//!
//! ```text
//! board::identify_board ──► kernel::KernelVariant
//!                                 │
//! firmware::RevisionSource ──────►├──► kernel::KernelDescriptor
//!                                 │
//!                                 ▼
//!                        install::Installer ──► <dest>/linux-<hash>
//! ```
//!
//! Host access sits behind [`board::HostProbe`] and network access behind
//! [`fetch::Fetch`], so resolution can be driven without a Pi.
//!
//! # Example
//!
//! ```rust,ignore
//! use rpi_source::{board::SystemProbe, fetch::HttpFetcher, workflow};
//!
//! let outcome = workflow::run(&config, &SystemProbe::new(false), &HttpFetcher::new()?)?;
//! std::process::exit(outcome.exit_code());
//! ```

pub mod board;
pub mod config;
pub mod fetch;
pub mod firmware;
pub mod install;
pub mod kernel;
pub mod preflight;
pub mod process;
pub mod self_update;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use board::{ArchitectureType, BoardProfile, ProcessorType};
pub use config::Config;
pub use kernel::{KernelDescriptor, KernelVariant};
pub use workflow::RunOutcome;
