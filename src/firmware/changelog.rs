//! Firmware revision extraction from the packaged Debian changelog.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// Older raspberrypi-bootloader entries: "* firmware as of 1a2b3c4d..."
static FIRMWARE_AS_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"firmware as of ([0-9a-fA-F]+)").expect("Invalid firmware-as-of regex")
});

// raspi-firmware entry header: "raspi-firmware (2:1.20240529-1) bookworm; ..."
static PACKAGE_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"raspi-firmware \((?:\d+:)?([^)\s]+)\)").expect("Invalid raspi-firmware regex")
});

/// Extract the firmware revision of the newest changelog entry.
///
/// Entries are newest-first, so the first line that matches either form
/// wins. On a single line the `firmware as of` form is tried first.
pub fn parse_firmware_revision(changelog: &str) -> Result<String> {
    for line in changelog.lines() {
        let captures = FIRMWARE_AS_OF
            .captures(line)
            .or_else(|| PACKAGE_VERSION.captures(line));
        if let Some(revision) = captures.and_then(|c| c.get(1)) {
            return Ok(revision.as_str().to_string());
        }
    }

    bail!("no firmware revision found in changelog (expected 'firmware as of <hash>' or 'raspi-firmware (<version>)')")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOTLOADER_CHANGELOG: &str = "\
raspberrypi-firmware (1:1.20230405-1) bullseye; urgency=medium

  * firmware as of 055e044d5359ded1aacc5a17a8e35365373d0b8b

 -- Serge Schneider <serge@raspberrypi.com>  Wed, 05 Apr 2023 12:00:00 +0100

raspberrypi-firmware (1:1.20230317-1) bullseye; urgency=medium

  * firmware as of 1a2b3c4d

 -- Serge Schneider <serge@raspberrypi.com>  Fri, 17 Mar 2023 12:00:00 +0100
";

    #[test]
    fn test_firmware_as_of() {
        let rev = parse_firmware_revision("  * firmware as of 1a2b3c4d\n").unwrap();
        assert_eq!(rev, "1a2b3c4d");
    }

    #[test]
    fn test_raspi_firmware_version_drops_epoch() {
        let rev = parse_firmware_revision("raspi-firmware (2:1.20240529-1) bookworm; urgency=medium\n")
            .unwrap();
        assert_eq!(rev, "1.20240529-1");
    }

    #[test]
    fn test_topmost_entry_wins() {
        let rev = parse_firmware_revision(BOOTLOADER_CHANGELOG).unwrap();
        assert_eq!(rev, "055e044d5359ded1aacc5a17a8e35365373d0b8b");
    }

    #[test]
    fn test_first_matching_line_wins_across_forms() {
        let text = "raspi-firmware (1:1.20240924-1) bookworm; urgency=medium\n\n  * firmware as of deadbeef\n";
        assert_eq!(parse_firmware_revision(text).unwrap(), "1.20240924-1");
    }

    #[test]
    fn test_repeated_parse_is_deterministic() {
        let first = parse_firmware_revision(BOOTLOADER_CHANGELOG).unwrap();
        let second = parse_firmware_revision(BOOTLOADER_CHANGELOG).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_match_fails() {
        assert!(parse_firmware_revision("nothing to see here\n").is_err());
        assert!(parse_firmware_revision("").is_err());
    }
}
