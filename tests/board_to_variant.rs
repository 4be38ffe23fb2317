use rpi_source::board::revision::processor_from_revision;
use rpi_source::firmware::changelog::parse_firmware_revision;
use rpi_source::{ArchitectureType, KernelVariant, ProcessorType};

#[test]
fn pi4_64bit_uses_kernel8() {
    let variant = KernelVariant::resolve(ProcessorType::Bcm2711, ArchitectureType::Bit64, 4096)
        .expect("Pi 4 64-bit must resolve");
    assert_eq!(variant.suffix, "8");
    assert_eq!(variant.defconfig, "bcm2711_defconfig");
}

#[test]
fn pi5_16k_pages_uses_kernel_2712() {
    let variant = KernelVariant::resolve(ProcessorType::Bcm2712, ArchitectureType::Bit64, 16384)
        .expect("Pi 5 16K must resolve");
    assert_eq!(variant.suffix, "_2712");
    assert_eq!(variant.defconfig, "bcm2712_defconfig");
}

#[test]
fn pi1_uses_bare_kernel() {
    let variant = KernelVariant::resolve(ProcessorType::Bcm2835, ArchitectureType::Bit32, 4096)
        .expect("Pi 1 must resolve");
    assert_eq!(variant.suffix, "");
    assert_eq!(variant.defconfig, "bcmrpi_defconfig");
}

#[test]
fn every_processor_architecture_pair_resolves_or_fails_explicitly() {
    let supported = [
        (ProcessorType::Bcm2835, ArchitectureType::Bit32),
        (ProcessorType::Bcm2836, ArchitectureType::Bit32),
        (ProcessorType::Bcm2837, ArchitectureType::Bit32),
        (ProcessorType::Bcm2837, ArchitectureType::Bit64),
        (ProcessorType::Bcm2711, ArchitectureType::Bit32),
        (ProcessorType::Bcm2711, ArchitectureType::Bit64),
        (ProcessorType::Bcm2712, ArchitectureType::Bit64),
    ];
    for processor in ProcessorType::ALL {
        for arch in [ArchitectureType::Bit32, ArchitectureType::Bit64] {
            let result = KernelVariant::resolve(processor, arch, 4096);
            assert_eq!(
                result.is_ok(),
                supported.contains(&(processor, arch)),
                "{processor} {arch}"
            );
        }
    }
}

#[test]
fn revision_word_feeds_variant() {
    // Raspberry Pi 3 Model B+ (a020d3) running a 64-bit kernel.
    let processor = processor_from_revision(0xa020d3).expect("new-style revision");
    let variant = KernelVariant::resolve(processor, ArchitectureType::Bit64, 4096)
        .expect("Pi 3 64-bit must resolve");
    assert_eq!(variant.symvers_filename(), "Module8.symvers");
}

#[test]
fn changelog_forms() {
    assert_eq!(
        parse_firmware_revision("  * firmware as of 1a2b3c4d\n").unwrap(),
        "1a2b3c4d"
    );
    assert_eq!(
        parse_firmware_revision("raspi-firmware (2:1.20240529-1) bookworm; urgency=medium\n")
            .unwrap(),
        "1.20240529-1"
    );
}
