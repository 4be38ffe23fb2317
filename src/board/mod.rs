//! Board identification.
//!
//! Classifies the running device into a [`BoardProfile`]: the SoC family,
//! whether userland is 32- or 64-bit, and the kernel page size. Everything
//! the identifier needs from the host goes through [`HostProbe`].

pub mod revision;

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::Path;

use crate::process::Cmd;

/// Device-tree node holding the board revision as a big-endian u32.
pub const DEVICE_TREE_REVISION: &str = "/proc/device-tree/system/linux,revision";

/// CPU info pseudo-file; fallback source for the board revision.
pub const CPUINFO: &str = "/proc/cpuinfo";

const PAGE_SIZE_UNIT: u64 = 4096;

/// Broadcom SoC family, numbered as in the board revision encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorType {
    Bcm2835,
    Bcm2836,
    Bcm2837,
    Bcm2711,
    Bcm2712,
}

impl ProcessorType {
    pub const ALL: [ProcessorType; 5] = [
        ProcessorType::Bcm2835,
        ProcessorType::Bcm2836,
        ProcessorType::Bcm2837,
        ProcessorType::Bcm2711,
        ProcessorType::Bcm2712,
    ];

    /// Map a processor index (revision bits 12-15, or `--processor`).
    pub fn from_index(index: u32) -> Result<Self> {
        match index {
            0 => Ok(ProcessorType::Bcm2835),
            1 => Ok(ProcessorType::Bcm2836),
            2 => Ok(ProcessorType::Bcm2837),
            3 => Ok(ProcessorType::Bcm2711),
            4 => Ok(ProcessorType::Bcm2712),
            other => bail!(
                "unsupported processor type {} (expected 0-4: {})",
                other,
                Self::ALL
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessorType::Bcm2835 => "BCM2835",
            ProcessorType::Bcm2836 => "BCM2836",
            ProcessorType::Bcm2837 => "BCM2837",
            ProcessorType::Bcm2711 => "BCM2711",
            ProcessorType::Bcm2712 => "BCM2712",
        };
        f.write_str(name)
    }
}

/// Userland word size the kernel was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchitectureType {
    Bit32,
    Bit64,
}

impl ArchitectureType {
    /// Map an `--architecture` override (32 or 64).
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            32 => Ok(ArchitectureType::Bit32),
            64 => Ok(ArchitectureType::Bit64),
            other => bail!("unsupported architecture {} (expected 32 or 64)", other),
        }
    }

    /// Classify a `uname -m` machine string.
    pub fn from_machine(machine: &str) -> Self {
        match machine {
            "aarch64" | "arm64" => ArchitectureType::Bit64,
            _ => ArchitectureType::Bit32,
        }
    }

    /// Kernel `ARCH=` value for this word size.
    pub fn kernel_arch(&self) -> &'static str {
        match self {
            ArchitectureType::Bit32 => "arm",
            ArchitectureType::Bit64 => "arm64",
        }
    }
}

impl fmt::Display for ArchitectureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchitectureType::Bit32 => f.write_str("32-bit"),
            ArchitectureType::Bit64 => f.write_str("64-bit"),
        }
    }
}

/// What the running board is, as far as kernel selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardProfile {
    pub processor: ProcessorType,
    pub architecture: ArchitectureType,
    pub page_size: u64,
}

impl fmt::Display for BoardProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} byte pages)",
            self.processor, self.architecture, self.page_size
        )
    }
}

/// Explicit overrides from the command line, as raw integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardOverrides {
    pub processor: Option<u32>,
    pub architecture: Option<u32>,
}

/// Host facts needed to identify the board and install into it.
pub trait HostProbe {
    /// Machine hardware name (`uname -m`).
    fn machine(&self) -> Result<String>;

    /// Running kernel release (`uname -r`).
    fn kernel_release(&self) -> Result<String>;

    /// System page size in bytes.
    fn page_size(&self) -> Result<u64>;

    /// Read a file, returning `None` if it does not exist.
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Whether a path exists on the host.
    fn exists(&self, path: &Path) -> bool;

    /// Load a kernel module (`modprobe`).
    fn load_module(&self, name: &str) -> Result<()>;
}

/// [`HostProbe`] backed by the real system.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe {
    dry_run: bool,
}

impl SystemProbe {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl HostProbe for SystemProbe {
    fn machine(&self) -> Result<String> {
        Cmd::new("uname")
            .arg("-m")
            .error_msg("uname -m failed")
            .output()
    }

    fn kernel_release(&self) -> Result<String> {
        Cmd::new("uname")
            .arg("-r")
            .error_msg("uname -r failed")
            .output()
    }

    fn page_size(&self) -> Result<u64> {
        let raw = Cmd::new("getconf")
            .arg("PAGESIZE")
            .error_msg("getconf PAGESIZE failed")
            .output()?;
        raw.parse::<u64>()
            .with_context(|| format!("unparseable page size '{}'", raw))
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading '{}'", path.display())),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn load_module(&self, name: &str) -> Result<()> {
        Cmd::new("modprobe")
            .arg(name)
            .error_msg(format!("modprobe {} failed", name))
            .dry_run(self.dry_run)
            .run()
    }
}

/// Identify the running board, honouring explicit overrides.
pub fn identify_board(probe: &dyn HostProbe, overrides: &BoardOverrides) -> Result<BoardProfile> {
    let processor = match overrides.processor {
        Some(index) => ProcessorType::from_index(index)?,
        None => detect_processor(probe)?,
    };

    let architecture = match overrides.architecture {
        Some(bits) => ArchitectureType::from_bits(bits)?,
        None => ArchitectureType::from_machine(&probe.machine()?),
    };

    let page_size = probe.page_size()?;
    if page_size == 0 || page_size % PAGE_SIZE_UNIT != 0 {
        bail!(
            "unsupported page size {} (must be a multiple of {})",
            page_size,
            PAGE_SIZE_UNIT
        );
    }

    Ok(BoardProfile {
        processor,
        architecture,
        page_size,
    })
}

fn detect_processor(probe: &dyn HostProbe) -> Result<ProcessorType> {
    // ARMv6 boards predate the detailed revision encoding.
    if probe.machine()?.starts_with("armv6") {
        return Ok(ProcessorType::Bcm2835);
    }

    let revision = read_board_revision(probe)?;
    revision::processor_from_revision(revision)
}

fn read_board_revision(probe: &dyn HostProbe) -> Result<u32> {
    if let Some(bytes) = probe.read(Path::new(DEVICE_TREE_REVISION))? {
        if let Some(revision) = revision::parse_device_tree_revision(&bytes) {
            return Ok(revision);
        }
    }

    if let Some(bytes) = probe.read(Path::new(CPUINFO))? {
        if let Some(revision) = revision::parse_cpuinfo_revision(&String::from_utf8_lossy(&bytes))
        {
            return Ok(revision);
        }
    }

    bail!(
        "cannot determine board revision: neither {} nor a Revision line in {} is readable\n\
         Pass the processor type explicitly with --processor (0=BCM2835 .. 4=BCM2712)",
        DEVICE_TREE_REVISION,
        CPUINFO
    )
}
