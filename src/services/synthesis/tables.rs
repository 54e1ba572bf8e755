//! Hardware lookup tables used by the synthesizer.
//!
//! Keys are matched against normalized input (see [`normalize_token`]), so
//! entries are written in normalized form: uppercase without separators for
//! model names, lowercase without separators for generation names.

use crate::models::{CpuVendor, FormFactor};

/// Uppercase and drop everything that is not ASCII alphanumeric.
pub fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Lowercase form used for generation keys.
pub fn normalize_generation(input: &str) -> String {
    normalize_token(input).to_ascii_lowercase()
}

/// Value of the longest table key contained in `haystack`.
///
/// `haystack` must already be normalized. Ties keep the earlier entry.
pub fn longest_match<T: Copy>(table: &[(&str, T)], haystack: &str) -> Option<T> {
    table
        .iter()
        .filter(|(key, _)| haystack.contains(key))
        .fold(None::<(usize, T)>, |best, (key, value)| match best {
            Some((len, _)) if len >= key.len() => best,
            _ => Some((key.len(), *value)),
        })
        .map(|(_, value)| value)
}

// ===== Audio =====

/// Layout used when neither the caller nor the table provides one.
pub const DEFAULT_LAYOUT_ID: u32 = 1;

/// Codec → AppleALC layout-id.
pub const AUDIO_LAYOUTS: &[(&str, u32)] = &[
    ("ALC255", 3),
    ("ALC256", 5),
    ("ALC257", 11),
    ("ALC269", 3),
    ("ALC270", 3),
    ("ALC295", 1),
    ("ALC887", 1),
    ("ALC888", 1),
    ("ALC889", 1),
    ("ALC892", 1),
    ("ALC897", 11),
    ("ALC1150", 1),
    ("ALC1200", 1),
    ("ALC1220", 7),
    ("ALC1220VB", 11),
    ("ALCS1200A", 1),
    ("CX20751", 3),
];

// ===== Graphics =====

/// Intel iGPU family → `AAPL,ig-platform-id`.
pub const IGPU_PLATFORM_IDS: &[(&str, u32)] = &[
    ("HD4600", 0x0D22_0003),
    ("HD530", 0x1912_0001),
    ("HD620", 0x591B_0000),
    ("HD630", 0x5912_0003),
    ("UHD620", 0x3EA5_0009),
    ("UHD630", 0x3E9B_0007),
    ("IRISPLUS640", 0x5926_0002),
    ("IRISPLUS655", 0x3EA5_0009),
];

/// Normalized iGPU model with vendor and marketing words removed, so
/// "Intel UHD Graphics 630" becomes `UHD630`.
pub fn normalize_gpu_model(model: &str) -> String {
    normalize_token(model)
        .replace("INTEL", "")
        .replace("GRAPHICS", "")
}

pub const IGPU_PCI_PATH: &str = "PciRoot(0x0)/Pci(0x2,0x0)";
pub const DGPU_PCI_PATH: &str = "PciRoot(0x0)/Pci(0x1,0x0)/Pci(0x0,0x0)";
pub const AUDIO_PCI_PATH: &str = "PciRoot(0x0)/Pci(0x1f,0x3)";

/// Matches AMD discrete card names ("Radeon RX 6600", "Vega 56", "RX580").
pub const AMD_DGPU_PATTERN: &str = r"(?i)\b(amd|ati|radeon|vega|firepro|rx\s*-?\d)";

// ===== Network =====

/// Ethernet model token → kext. Order matters: first match wins, so
/// specific chips precede vendor-wide tokens.
pub const ETHERNET_KEXTS: &[(&str, &str)] = &[
    ("I225", "AppleIGC.kext"),
    ("I226", "AppleIGC.kext"),
    ("RTL8125", "LucyRTL8125Ethernet.kext"),
    ("REALTEK25G", "LucyRTL8125Ethernet.kext"),
    ("I211", "IntelMausi.kext"),
    ("I217", "IntelMausi.kext"),
    ("I218", "IntelMausi.kext"),
    ("I219", "IntelMausi.kext"),
    ("82574", "IntelMausi.kext"),
    ("82579", "IntelMausi.kext"),
    ("INTEL", "IntelMausi.kext"),
    ("RTL8111", "RealtekRTL8111.kext"),
    ("RTL8168", "RealtekRTL8111.kext"),
    ("REALTEK", "RealtekRTL8111.kext"),
    ("E2200", "AtherosE2200Ethernet.kext"),
    ("E2400", "AtherosE2200Ethernet.kext"),
    ("E2500", "AtherosE2200Ethernet.kext"),
    ("KILLER", "AtherosE2200Ethernet.kext"),
    ("ATHEROS", "AtherosE2200Ethernet.kext"),
];

/// First ethernet kext whose token occurs in the model, case-insensitively.
pub fn ethernet_kext_for(model: &str) -> Option<&'static str> {
    let normalized = normalize_token(model);
    ETHERNET_KEXTS
        .iter()
        .find(|(token, _)| normalized.contains(token))
        .map(|(_, kext)| *kext)
}

pub const WIFI_KEXTS: &[(&str, &[&str])] = &[
    ("INTEL", &["AirportItlwm.kext"]),
    ("BROADCOM", &["AirportBrcmFixup.kext"]),
    ("BCM", &["AirportBrcmFixup.kext"]),
];

pub const BLUETOOTH_KEXTS: &[(&str, &[&str])] = &[
    ("INTEL", &["IntelBluetoothFirmware.kext", "BlueToolFixup.kext"]),
    (
        "BROADCOM",
        &["BrcmFirmwareData.kext", "BrcmPatchRAM3.kext", "BlueToolFixup.kext"],
    ),
    (
        "BCM",
        &["BrcmFirmwareData.kext", "BrcmPatchRAM3.kext", "BlueToolFixup.kext"],
    ),
];

pub fn wireless_kexts_for(
    table: &[(&str, &'static [&'static str])],
    model: &str,
) -> &'static [&'static str] {
    let normalized = normalize_token(model);
    table
        .iter()
        .find(|(token, _)| normalized.contains(token))
        .map(|(_, kexts)| *kexts)
        .unwrap_or(&[])
}

/// Kexts that carry no executable.
pub const CODELESS_KEXTS: &[&str] = &["BrcmFirmwareData.kext"];

/// Short description written into each Kernel.Add `Comment`.
pub fn kext_comment(bundle: &str) -> &'static str {
    match bundle {
        "Lilu.kext" => "Patch engine",
        "VirtualSMC.kext" => "SMC emulator",
        "WhateverGreen.kext" => "Video patches",
        "AppleALC.kext" => "Audio patches",
        "SMCProcessor.kext" => "CPU temperature sensors",
        "SMCSuperIO.kext" => "Fan speed sensors",
        "SMCBatteryManager.kext" => "Battery status",
        "AMDRyzenCPUPowerManagement.kext" => "AMD CPU power management",
        "SMCAMDProcessor.kext" => "AMD CPU sensors",
        "NVMeFix.kext" => "NVMe power management",
        "VoodooPS2Controller.kext" => "PS/2 keyboard and trackpad",
        "AirportItlwm.kext" | "AirportBrcmFixup.kext" => "Wi-Fi",
        "IntelBluetoothFirmware.kext"
        | "BlueToolFixup.kext"
        | "BrcmPatchRAM3.kext"
        | "BrcmFirmwareData.kext" => "Bluetooth",
        _ => "Ethernet",
    }
}

// ===== Platform identity =====

/// (vendor, form factor, normalized generation, SMBIOS model)
pub const SMBIOS_MODELS: &[(CpuVendor, FormFactor, &str, &str)] = &[
    (CpuVendor::Intel, FormFactor::Desktop, "sandybridge", "iMac12,2"),
    (CpuVendor::Intel, FormFactor::Desktop, "ivybridge", "iMac13,2"),
    (CpuVendor::Intel, FormFactor::Desktop, "haswell", "iMac14,4"),
    (CpuVendor::Intel, FormFactor::Desktop, "broadwell", "iMac16,2"),
    (CpuVendor::Intel, FormFactor::Desktop, "skylake", "iMac17,1"),
    (CpuVendor::Intel, FormFactor::Desktop, "kabylake", "iMac18,3"),
    (CpuVendor::Intel, FormFactor::Desktop, "coffeelake", "iMac19,1"),
    (CpuVendor::Intel, FormFactor::Desktop, "cometlake", "iMac20,1"),
    (CpuVendor::Intel, FormFactor::Desktop, "rocketlake", "iMacPro1,1"),
    (CpuVendor::Intel, FormFactor::Desktop, "alderlake", "MacPro7,1"),
    (CpuVendor::Intel, FormFactor::Laptop, "haswell", "MacBookPro11,1"),
    (CpuVendor::Intel, FormFactor::Laptop, "broadwell", "MacBookPro12,1"),
    (CpuVendor::Intel, FormFactor::Laptop, "skylake", "MacBookPro13,1"),
    (CpuVendor::Intel, FormFactor::Laptop, "kabylake", "MacBookPro14,1"),
    (CpuVendor::Intel, FormFactor::Laptop, "coffeelake", "MacBookPro15,2"),
    (CpuVendor::Intel, FormFactor::Laptop, "whiskeylake", "MacBookPro15,2"),
    (CpuVendor::Intel, FormFactor::Laptop, "cometlake", "MacBookPro16,3"),
    (CpuVendor::Intel, FormFactor::Laptop, "icelake", "MacBookAir9,1"),
    (CpuVendor::Amd, FormFactor::Desktop, "zen", "iMacPro1,1"),
    (CpuVendor::Amd, FormFactor::Desktop, "zenplus", "iMacPro1,1"),
    (CpuVendor::Amd, FormFactor::Desktop, "zen2", "MacPro7,1"),
    (CpuVendor::Amd, FormFactor::Desktop, "zen3", "MacPro7,1"),
    (CpuVendor::Amd, FormFactor::Desktop, "zen4", "MacPro7,1"),
];

pub fn default_smbios_model(vendor: CpuVendor, form_factor: FormFactor) -> &'static str {
    match (vendor, form_factor) {
        (CpuVendor::Intel, FormFactor::Desktop) => "iMac19,1",
        (CpuVendor::Intel, FormFactor::Laptop) => "MacBookPro15,2",
        (CpuVendor::Amd, FormFactor::Desktop) => "MacPro7,1",
        (CpuVendor::Amd, FormFactor::Laptop) => "MacBookPro16,3",
    }
}

/// Exact SMBIOS table hit, if the generation is known.
pub fn smbios_model_for(
    vendor: CpuVendor,
    form_factor: FormFactor,
    generation: &str,
) -> Option<&'static str> {
    let key = normalize_generation(generation);
    SMBIOS_MODELS
        .iter()
        .find(|(v, f, g, _)| *v == vendor && *f == form_factor && *g == key)
        .map(|(_, _, _, model)| *model)
}

/// Intel generations that ship the AWAC clock instead of a legacy RTC.
pub const AWAC_GENERATIONS: &[&str] = &["coffeelake", "cometlake", "rocketlake", "alderlake"];

/// Serial number prefix by CPU brand (lowercase).
pub const SERIAL_PREFIXES: &[(&str, &str)] = &[("intel", "C02"), ("amd", "F5K")];

/// Board serial is the system serial followed by this suffix.
pub const MLB_SUFFIX: &str = "K1FAA";
