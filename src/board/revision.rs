//! Board revision word decoding.
//!
//! New-style revision codes (bit 23 set) pack the board description into a
//! 32-bit word:
//!
//! ```text
//! NOQuuuWuFMMMCCCCPPPPTTTTTTTTRRRR
//!         |   |   |   |       `- revision
//!         |   |   |   `--------- type
//!         |   |   `------------- processor (bits 12-15)
//!         |   `----------------- manufacturer
//!         `--------------------- F: new-style flag (bit 23)
//! ```

use anyhow::{bail, Result};

use super::ProcessorType;

/// Bit 23: set on every board that uses the new-style revision encoding.
pub const NEW_STYLE_FLAG: u32 = 1 << 23;

const PROCESSOR_SHIFT: u32 = 12;
const PROCESSOR_MASK: u32 = 0xf;

/// Decode the processor type from a new-style revision word.
pub fn processor_from_revision(revision: u32) -> Result<ProcessorType> {
    if revision & NEW_STYLE_FLAG == 0 {
        bail!(
            "board revision 0x{:08x} uses the old-style encoding (bit 23 clear); \
             cannot determine processor, pass --processor",
            revision
        );
    }
    let index = (revision >> PROCESSOR_SHIFT) & PROCESSOR_MASK;
    ProcessorType::from_index(index)
}

/// Parse the device-tree `linux,revision` property (a big-endian u32 cell).
pub fn parse_device_tree_revision(bytes: &[u8]) -> Option<u32> {
    let cell: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(cell))
}

/// Parse the `Revision` line of `/proc/cpuinfo` as hexadecimal.
pub fn parse_cpuinfo_revision(cpuinfo: &str) -> Option<u32> {
    cpuinfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "Revision")
        .and_then(|(_, value)| u32::from_str_radix(value.trim(), 16).ok())
}
