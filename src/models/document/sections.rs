//! Typed `config.plist` sections.
//!
//! Field names map onto the OpenCore schema through `rename_all = "PascalCase"`;
//! keys whose capitalization does not follow that rule (`SystemUUID`,
//! `UpdateSMBIOSMode`, ...) carry an explicit rename. Rarely edited lists
//! (patches, block lists, MMIO whitelists) stay untyped dictionaries.

use super::data::PlistData;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ===== ACPI =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Acpi {
    pub add: Vec<AcpiAdd>,
    pub delete: Vec<plist::Dictionary>,
    pub patch: Vec<plist::Dictionary>,
    pub quirks: AcpiQuirks,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AcpiAdd {
    pub comment: String,
    pub enabled: bool,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AcpiQuirks {
    pub fadt_enable_reset: bool,
    pub normalize_headers: bool,
    pub rebase_regions: bool,
    pub reset_hw_sig: bool,
    pub reset_logo_status: bool,
    pub sync_table_ids: bool,
}

// ===== Booter =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Booter {
    pub mmio_whitelist: Vec<plist::Dictionary>,
    pub patch: Vec<plist::Dictionary>,
    pub quirks: BooterQuirks,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BooterQuirks {
    pub allow_relocation_block: bool,
    pub avoid_runtime_defrag: bool,
    pub devirtualise_mmio: bool,
    pub disable_single_user: bool,
    pub disable_variable_write: bool,
    pub discard_hibernate_map: bool,
    pub enable_safe_mode_slide: bool,
    pub enable_write_unprotector: bool,
    pub fixup_apple_efi_images: bool,
    pub force_booter_signature: bool,
    pub force_exit_boot_services: bool,
    pub protect_memory_regions: bool,
    pub protect_secure_boot: bool,
    pub protect_uefi_services: bool,
    pub provide_custom_slide: bool,
    pub provide_max_slide: i64,
    pub rebuild_apple_memory_map: bool,
    pub resize_apple_gpu_bars: i64,
    pub setup_virtual_map: bool,
    #[serde(rename = "SignalAppleOS")]
    pub signal_apple_os: bool,
    pub sync_runtime_permissions: bool,
}

// ===== DeviceProperties =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceProperties {
    /// PCI device path → property name → value.
    pub add: IndexMap<String, plist::Dictionary>,
    pub delete: IndexMap<String, Vec<String>>,
}

// ===== Kernel =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Kernel {
    pub add: Vec<KernelAdd>,
    pub block: Vec<plist::Dictionary>,
    pub emulate: KernelEmulate,
    pub force: Vec<plist::Dictionary>,
    pub patch: Vec<plist::Dictionary>,
    pub quirks: KernelQuirks,
    pub scheme: KernelScheme,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KernelAdd {
    pub arch: String,
    pub bundle_path: String,
    pub comment: String,
    pub enabled: bool,
    pub executable_path: String,
    pub max_kernel: String,
    pub min_kernel: String,
    pub plist_path: String,
}

impl KernelAdd {
    /// Standard entry for a kext with a binary named after its bundle.
    pub fn kext(bundle: &str, comment: &str) -> Self {
        let stem = bundle.strip_suffix(".kext").unwrap_or(bundle);
        Self {
            arch: "x86_64".to_string(),
            bundle_path: bundle.to_string(),
            comment: comment.to_string(),
            enabled: true,
            executable_path: format!("Contents/MacOS/{}", stem),
            max_kernel: String::new(),
            min_kernel: String::new(),
            plist_path: "Contents/Info.plist".to_string(),
        }
    }

    /// Entry for a codeless kext (firmware data or injector only).
    pub fn codeless(bundle: &str, comment: &str) -> Self {
        Self {
            executable_path: String::new(),
            ..Self::kext(bundle, comment)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KernelEmulate {
    pub cpuid1_data: PlistData,
    pub cpuid1_mask: PlistData,
    pub dummy_power_management: bool,
    pub max_kernel: String,
    pub min_kernel: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KernelQuirks {
    pub apple_cpu_pm_cfg_lock: bool,
    pub apple_xcpm_cfg_lock: bool,
    pub apple_xcpm_extra_msrs: bool,
    pub apple_xcpm_force_boost: bool,
    pub custom_pci_serial_device: bool,
    #[serde(rename = "CustomSMBIOSGuid")]
    pub custom_smbios_guid: bool,
    pub disable_io_mapper: bool,
    pub disable_io_mapper_mapping: bool,
    pub disable_linkedit_jettison: bool,
    pub disable_rtc_checksum: bool,
    #[serde(rename = "ExtendBTFeatureFlags")]
    pub extend_bt_feature_flags: bool,
    pub external_disk_icons: bool,
    pub force_aquantia_ethernet: bool,
    pub force_secure_boot_scheme: bool,
    pub increase_pci_bar_size: bool,
    pub lapic_kernel_panic: bool,
    pub legacy_commpage: bool,
    pub panic_no_kext_dump: bool,
    pub power_timeout_kernel_panic: bool,
    pub provide_current_cpu_info: bool,
    pub set_apfs_trim_timeout: i64,
    pub third_party_drives: bool,
    pub xhci_port_limit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KernelScheme {
    pub custom_kernel: bool,
    pub fuzzy_match: bool,
    pub kernel_arch: String,
    pub kernel_cache: String,
}

// ===== Misc =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Misc {
    pub boot: MiscBoot,
    pub debug: MiscDebug,
    pub entries: Vec<plist::Dictionary>,
    pub security: MiscSecurity,
    pub tools: Vec<MiscTool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiscBoot {
    pub console_attributes: i64,
    pub hibernate_mode: String,
    pub hide_auxiliary: bool,
    pub launcher_option: String,
    pub launcher_path: String,
    pub picker_attributes: i64,
    pub picker_audio_assist: bool,
    pub picker_mode: String,
    pub picker_variant: String,
    pub poll_apple_hot_keys: bool,
    pub show_picker: bool,
    pub takeoff_delay: i64,
    pub timeout: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiscDebug {
    pub apple_debug: bool,
    pub apple_panic: bool,
    pub disable_watch_dog: bool,
    pub display_delay: i64,
    pub display_level: i64,
    pub log_modules: String,
    pub sys_report: bool,
    pub target: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiscSecurity {
    pub allow_set_default: bool,
    #[serde(rename = "ApECID")]
    pub ap_ecid: i64,
    pub auth_restart: bool,
    pub blacklist_apple_update: bool,
    pub dmg_loading: String,
    pub enable_password: bool,
    pub expose_sensitive_data: i64,
    pub halt_level: i64,
    pub scan_policy: i64,
    pub secure_boot_model: String,
    pub vault: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiscTool {
    pub arguments: String,
    pub auxiliary: bool,
    pub comment: String,
    pub enabled: bool,
    pub flavour: String,
    pub full_nvram_access: bool,
    pub name: String,
    pub path: String,
    pub real_path: bool,
    pub text_mode: bool,
}

impl MiscTool {
    pub fn new(path: &str, name: &str, comment: &str, enabled: bool) -> Self {
        Self {
            arguments: String::new(),
            auxiliary: true,
            comment: comment.to_string(),
            enabled,
            flavour: "Auto".to_string(),
            full_nvram_access: false,
            name: name.to_string(),
            path: path.to_string(),
            real_path: false,
            text_mode: false,
        }
    }
}

// ===== NVRAM =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Nvram {
    /// Vendor GUID → variable name → value.
    pub add: IndexMap<String, plist::Dictionary>,
    pub delete: IndexMap<String, Vec<String>>,
    pub legacy_overwrite: bool,
    pub legacy_schema: IndexMap<String, Vec<String>>,
    pub write_flash: bool,
}

// ===== PlatformInfo =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlatformInfo {
    pub automatic: bool,
    pub custom_memory: bool,
    pub generic: PlatformGeneric,
    pub update_data_hub: bool,
    #[serde(rename = "UpdateNVRAM")]
    pub update_nvram: bool,
    #[serde(rename = "UpdateSMBIOS")]
    pub update_smbios: bool,
    #[serde(rename = "UpdateSMBIOSMode")]
    pub update_smbios_mode: String,
    pub use_raw_uuid_encoding: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlatformGeneric {
    pub advise_features: bool,
    #[serde(rename = "MaxBIOSVersion")]
    pub max_bios_version: bool,
    #[serde(rename = "MLB")]
    pub mlb: String,
    pub processor_type: i64,
    #[serde(rename = "ROM")]
    pub rom: PlistData,
    pub spoof_vendor: bool,
    pub system_memory_status: String,
    pub system_product_name: String,
    pub system_serial_number: String,
    #[serde(rename = "SystemUUID")]
    pub system_uuid: String,
}

// ===== UEFI =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Uefi {
    #[serde(rename = "APFS")]
    pub apfs: UefiApfs,
    pub connect_drivers: bool,
    pub drivers: Vec<UefiDriver>,
    pub input: UefiInput,
    pub output: UefiOutput,
    pub quirks: UefiQuirks,
    pub reserved_memory: Vec<plist::Dictionary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UefiApfs {
    pub enable_jumpstart: bool,
    pub global_connect: bool,
    pub hide_verbose: bool,
    pub jumpstart_hot_plug: bool,
    pub min_date: i64,
    pub min_version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UefiDriver {
    pub arguments: String,
    pub comment: String,
    pub enabled: bool,
    pub load_early: bool,
    pub path: String,
}

impl UefiDriver {
    pub fn new(path: &str, comment: &str, enabled: bool) -> Self {
        Self {
            arguments: String::new(),
            comment: comment.to_string(),
            enabled,
            load_early: false,
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UefiInput {
    pub key_support: bool,
    pub key_support_mode: String,
    pub pointer_support: bool,
    pub timer_resolution: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UefiOutput {
    pub provide_console_gop: bool,
    pub resolution: String,
    pub text_renderer: String,
    #[serde(rename = "UIScale")]
    pub ui_scale: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UefiQuirks {
    pub activate_hpet_support: bool,
    pub disable_security_policy: bool,
    pub enable_vector_acceleration: bool,
    pub exit_boot_services_delay: i64,
    pub forge_uefi_support: bool,
    pub ignore_invalid_flex_ratio: bool,
    pub release_usb_ownership: bool,
    pub request_boot_var_routing: bool,
    pub resize_gpu_bars: i64,
    pub tsc_sync_timeout: i64,
    pub unblock_fs_connect: bool,
}
