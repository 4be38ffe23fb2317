//! Kernel variant resolution.
//!
//! The Raspberry Pi firmware ships one kernel image per variant
//! (`kernel.img`, `kernel7.img`, `kernel7l.img`, `kernel8.img`,
//! `kernel_2712.img`), and the matching `Module*.symvers` and defconfig
//! follow the same suffix. The table below is the only place that mapping
//! lives.

use anyhow::{bail, Result};

use crate::board::{ArchitectureType, BoardProfile, ProcessorType};

const PAGE_4K: u64 = 4096;
const PAGE_16K: u64 = 16384;

/// Kernel image variant for a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelVariant {
    /// Appended to `kernel`/`Module` in firmware file names.
    pub suffix: &'static str,
    /// `make` target used when no running config is available.
    pub defconfig: &'static str,
}

impl KernelVariant {
    /// Resolve the variant for a processor/architecture/page-size triple.
    pub fn resolve(
        processor: ProcessorType,
        architecture: ArchitectureType,
        page_size: u64,
    ) -> Result<Self> {
        use crate::board::ArchitectureType::{Bit32, Bit64};
        use crate::board::ProcessorType::*;

        let (suffix, defconfig) = match (processor, architecture, page_size) {
            (Bcm2835, Bit32, _) => ("", "bcmrpi_defconfig"),
            (Bcm2836, Bit32, _) => ("7", "bcm2709_defconfig"),
            (Bcm2837, Bit32, _) => ("7", "bcm2709_defconfig"),
            (Bcm2837, Bit64, _) => ("8", "bcm2711_defconfig"),
            (Bcm2711, Bit32, _) => ("7l", "bcm2711_defconfig"),
            (Bcm2711, Bit64, _) => ("8", "bcm2711_defconfig"),
            (Bcm2712, Bit64, PAGE_4K) => ("8", "bcm2711_defconfig"),
            (Bcm2712, Bit64, PAGE_16K) => ("_2712", "bcm2712_defconfig"),
            (processor, architecture, page_size) => bail!(
                "no kernel variant for processor {} with {} architecture and {} byte pages; \
                 pass --processor/--architecture to override detection",
                processor,
                architecture,
                page_size
            ),
        };

        Ok(Self { suffix, defconfig })
    }

    pub fn for_board(board: &BoardProfile) -> Result<Self> {
        Self::resolve(board.processor, board.architecture, board.page_size)
    }

    /// File name of the symbol versions published for this variant.
    pub fn symvers_filename(&self) -> String {
        format!("Module{}.symvers", self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ArchitectureType::{Bit32, Bit64};
    use crate::board::ProcessorType::*;

    #[test]
    fn test_table_rows() {
        let rows: &[(ProcessorType, ArchitectureType, u64, &str, &str)] = &[
            (Bcm2835, Bit32, 4096, "", "bcmrpi_defconfig"),
            (Bcm2836, Bit32, 4096, "7", "bcm2709_defconfig"),
            (Bcm2837, Bit32, 4096, "7", "bcm2709_defconfig"),
            (Bcm2837, Bit64, 4096, "8", "bcm2711_defconfig"),
            (Bcm2711, Bit32, 4096, "7l", "bcm2711_defconfig"),
            (Bcm2711, Bit64, 4096, "8", "bcm2711_defconfig"),
            (Bcm2712, Bit64, 4096, "8", "bcm2711_defconfig"),
            (Bcm2712, Bit64, 16384, "_2712", "bcm2712_defconfig"),
        ];
        for &(processor, arch, page_size, suffix, defconfig) in rows {
            let variant = KernelVariant::resolve(processor, arch, page_size).unwrap();
            assert_eq!(variant.suffix, suffix, "{processor} {arch} {page_size}");
            assert_eq!(variant.defconfig, defconfig, "{processor} {arch} {page_size}");
        }
    }

    #[test]
    fn test_page_size_only_matters_for_bcm2712() {
        for page_size in [4096, 8192, 16384, 65536] {
            assert!(KernelVariant::resolve(Bcm2711, Bit64, page_size).is_ok());
        }
        assert!(KernelVariant::resolve(Bcm2712, Bit64, 8192).is_err());
        assert!(KernelVariant::resolve(Bcm2712, Bit64, 65536).is_err());
    }

    #[test]
    fn test_unsupported_combinations_fail() {
        for (processor, arch) in [(Bcm2835, Bit64), (Bcm2836, Bit64), (Bcm2712, Bit32)] {
            let err = KernelVariant::resolve(processor, arch, 4096).unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains(&processor.to_string()), "{msg}");
            assert!(msg.contains(&arch.to_string()), "{msg}");
        }
    }

    #[test]
    fn test_symvers_filename() {
        let pi1 = KernelVariant::resolve(Bcm2835, Bit32, 4096).unwrap();
        assert_eq!(pi1.symvers_filename(), "Module.symvers");

        let pi5 = KernelVariant::resolve(Bcm2712, Bit64, 16384).unwrap();
        assert_eq!(pi5.symvers_filename(), "Module_2712.symvers");
    }
}
