//! Hardware-independent starting point for every generated config.plist.
//!
//! Values follow the Dortania desktop baseline. Hardware branches in the
//! parent module only flip existing quirks and append list entries.

use crate::models::document::*;
use indexmap::IndexMap;

pub fn baseline_document(version: &str) -> ConfigDocument {
    ConfigDocument {
        acpi: acpi(),
        booter: booter(),
        device_properties: DeviceProperties::default(),
        kernel: kernel(),
        misc: misc(),
        nvram: nvram(),
        platform_info: platform_info(),
        uefi: uefi(),
        version: version.to_string(),
    }
}

fn acpi() -> Acpi {
    Acpi {
        add: vec![AcpiAdd {
            comment: "Embedded controller and USB power".to_string(),
            enabled: true,
            path: "SSDT-EC-USBX-DESKTOP.aml".to_string(),
        }],
        ..Default::default()
    }
}

fn booter() -> Booter {
    Booter {
        quirks: BooterQuirks {
            avoid_runtime_defrag: true,
            devirtualise_mmio: true,
            enable_safe_mode_slide: true,
            enable_write_unprotector: true,
            provide_custom_slide: true,
            provide_max_slide: 0,
            rebuild_apple_memory_map: true,
            resize_apple_gpu_bars: -1,
            setup_virtual_map: true,
            sync_runtime_permissions: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn kernel() -> Kernel {
    Kernel {
        add: ["Lilu.kext", "VirtualSMC.kext", "WhateverGreen.kext"]
            .into_iter()
            .map(|bundle| KernelAdd::kext(bundle, super::tables::kext_comment(bundle)))
            .collect(),
        emulate: KernelEmulate {
            cpuid1_data: PlistData::default(),
            cpuid1_mask: PlistData::default(),
            dummy_power_management: false,
            max_kernel: String::new(),
            min_kernel: String::new(),
        },
        quirks: KernelQuirks {
            disable_linkedit_jettison: true,
            panic_no_kext_dump: true,
            power_timeout_kernel_panic: true,
            set_apfs_trim_timeout: -1,
            ..Default::default()
        },
        scheme: KernelScheme {
            custom_kernel: false,
            fuzzy_match: true,
            kernel_arch: "Auto".to_string(),
            kernel_cache: "Auto".to_string(),
        },
        ..Default::default()
    }
}

fn misc() -> Misc {
    Misc {
        boot: MiscBoot {
            console_attributes: 0,
            hibernate_mode: "None".to_string(),
            hide_auxiliary: true,
            launcher_option: "Disabled".to_string(),
            launcher_path: "Default".to_string(),
            picker_attributes: 17,
            picker_audio_assist: false,
            picker_mode: "External".to_string(),
            picker_variant: "Auto".to_string(),
            poll_apple_hot_keys: false,
            show_picker: true,
            takeoff_delay: 0,
            timeout: 5,
        },
        debug: MiscDebug {
            apple_debug: false,
            apple_panic: false,
            disable_watch_dog: true,
            display_delay: 0,
            display_level: 2_147_483_650,
            log_modules: "*".to_string(),
            sys_report: false,
            target: 3,
        },
        entries: Vec::new(),
        security: MiscSecurity {
            allow_set_default: true,
            ap_ecid: 0,
            auth_restart: false,
            blacklist_apple_update: true,
            dmg_loading: "Signed".to_string(),
            enable_password: false,
            expose_sensitive_data: 6,
            halt_level: 2_147_483_648,
            scan_policy: 0,
            secure_boot_model: "Default".to_string(),
            vault: "Optional".to_string(),
        },
        tools: vec![
            MiscTool::new("OpenShell.efi", "UEFI Shell", "UEFI shell", true),
            MiscTool::new("ResetSystem.efi", "Reset System", "Firmware reset", true),
            MiscTool::new("CleanNvram.efi", "Clean NVRAM", "Legacy NVRAM reset", false),
        ],
    }
}

fn nvram() -> Nvram {
    let mut vendor_vars = plist::Dictionary::new();
    vendor_vars.insert(
        "DefaultBackgroundColor".to_string(),
        plist::Value::Data(vec![0, 0, 0, 0]),
    );

    let mut boot_vars = plist::Dictionary::new();
    boot_vars.insert(
        "boot-args".to_string(),
        plist::Value::String("-v keepsyms=1".to_string()),
    );
    boot_vars.insert(
        "csr-active-config".to_string(),
        plist::Value::Data(vec![0, 0, 0, 0]),
    );
    boot_vars.insert(
        "prev-lang:kbd".to_string(),
        plist::Value::String("en-US:0".to_string()),
    );
    boot_vars.insert(
        "run-efi-updater".to_string(),
        plist::Value::String("No".to_string()),
    );

    let mut add = IndexMap::new();
    add.insert(APPLE_VENDOR_VARIABLE_GUID.to_string(), vendor_vars);
    add.insert(APPLE_BOOT_VARIABLE_GUID.to_string(), boot_vars);

    let mut delete = IndexMap::new();
    delete.insert(
        APPLE_VENDOR_VARIABLE_GUID.to_string(),
        vec!["DefaultBackgroundColor".to_string()],
    );
    delete.insert(
        APPLE_BOOT_VARIABLE_GUID.to_string(),
        vec![
            "boot-args".to_string(),
            "csr-active-config".to_string(),
            "prev-lang:kbd".to_string(),
        ],
    );

    Nvram {
        add,
        delete,
        legacy_overwrite: false,
        legacy_schema: IndexMap::new(),
        write_flash: true,
    }
}

fn platform_info() -> PlatformInfo {
    PlatformInfo {
        automatic: true,
        custom_memory: false,
        generic: PlatformGeneric {
            advise_features: false,
            max_bios_version: false,
            processor_type: 0,
            spoof_vendor: true,
            system_memory_status: "Auto".to_string(),
            ..Default::default()
        },
        update_data_hub: true,
        update_nvram: true,
        update_smbios: true,
        update_smbios_mode: "Create".to_string(),
        use_raw_uuid_encoding: false,
    }
}

fn uefi() -> Uefi {
    Uefi {
        apfs: UefiApfs {
            enable_jumpstart: true,
            global_connect: false,
            hide_verbose: true,
            jumpstart_hot_plug: false,
            min_date: 0,
            min_version: 0,
        },
        connect_drivers: true,
        drivers: vec![
            UefiDriver::new("HfsPlus.efi", "HFS+ file system", true),
            UefiDriver::new("OpenRuntime.efi", "Runtime services", true),
            UefiDriver::new("ResetNvramEntry.efi", "NVRAM reset picker entry", true),
            UefiDriver::new("OpenCanopy.efi", "Graphical picker", false),
        ],
        input: UefiInput {
            key_support: true,
            key_support_mode: "Auto".to_string(),
            pointer_support: false,
            timer_resolution: 50000,
        },
        output: UefiOutput {
            provide_console_gop: true,
            resolution: "Max".to_string(),
            text_renderer: "BuiltinGraphics".to_string(),
            ui_scale: 0,
        },
        quirks: UefiQuirks {
            request_boot_var_routing: true,
            resize_gpu_bars: -1,
            ..Default::default()
        },
        reserved_memory: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_contains_identity_emulation() {
        let doc = baseline_document("1.0.2");
        assert!(doc.has_enabled_kext("Lilu.kext"));
        assert!(doc.has_enabled_kext("VirtualSMC.kext"));
        assert_eq!(doc.kernel.add[0].bundle_path, "Lilu.kext");
    }

    #[test]
    fn test_baseline_quirks() {
        let doc = baseline_document("1.0.2");
        assert!(doc.booter.quirks.setup_virtual_map);
        assert!(!doc.kernel.quirks.apple_cpu_pm_cfg_lock);
        assert!(!doc.kernel.quirks.apple_xcpm_cfg_lock);
        assert!(!doc.kernel.emulate.dummy_power_management);
        assert_eq!(doc.kernel.quirks.set_apfs_trim_timeout, -1);
        assert_eq!(doc.boot_args(), "-v keepsyms=1");
        assert_eq!(doc.version, "1.0.2");
    }

    #[test]
    fn test_baseline_drivers() {
        let doc = baseline_document("1.0.2");
        let enabled: Vec<_> = doc
            .uefi
            .drivers
            .iter()
            .filter(|d| d.enabled)
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(enabled, vec!["HfsPlus.efi", "OpenRuntime.efi", "ResetNvramEntry.efi"]);
    }
}
