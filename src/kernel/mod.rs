//! Kernel source identity.
//!
//! - [`variant`] - board to kernel image variant mapping
//! - [`KernelDescriptor`] - the resolved upstream commit and its artifacts

pub mod variant;

pub use variant::KernelVariant;

/// Everything needed to fetch and configure the matching kernel source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDescriptor {
    /// Commit of `raspberrypi/linux` the running kernel was built from.
    pub git_hash: String,
    /// Where the `Module.symvers` for this variant and revision lives.
    pub symvers_url: String,
    /// Running kernel `.config`, when the host exposes one.
    pub config: Option<String>,
}

impl KernelDescriptor {
    /// Directory name of the unpacked source tree (`linux-<hash>`).
    pub fn source_dir_name(&self) -> String {
        format!("linux-{}", self.git_hash)
    }

    /// File name the source tarball is saved under.
    pub fn tarball_name(&self) -> String {
        format!("rpi-linux-{}.tar.gz", self.git_hash)
    }
}
