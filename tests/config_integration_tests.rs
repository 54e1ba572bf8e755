//! Integration tests for ConfigManager and settings file handling
//!
//! These tests verify:
//! - Settings defaults, saving and reloading
//! - Hardware profile save / load / list round trips
//! - Parsing hand-written profile YAML
//! - Settings feeding generation options and the asset catalog

use camino::Utf8PathBuf;
use efiforge::models::{
    Audio, FormFactor, GenerationOptions, HardwareProfile, Network, NetworkDevice, RequiredPolicy,
};
use efiforge::{ConfigManager, Settings};
use std::fs;
use tempfile::TempDir;

fn create_test_data_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, data_dir)
}

fn sample_profile() -> HardwareProfile {
    let mut profile = HardwareProfile::new("Intel", "Gigabyte");
    profile.cpu.generation = Some("Coffee Lake".to_string());
    profile.audio = Some(Audio {
        codec: "ALC1220".to_string(),
        layout_id: Some(7),
    });
    profile.network = Some(Network {
        ethernet: Some(NetworkDevice {
            model: "Intel I219-V".to_string(),
        }),
        ..Default::default()
    });
    profile
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let nested = data_dir.join("nested").join("data");

    let manager = ConfigManager::new(&nested).unwrap();

    assert!(nested.exists());
    assert_eq!(manager.data_dir(), nested);
    assert_eq!(manager.settings_path(), nested.join("efiforge.yaml"));
}

#[test]
fn test_load_default_settings() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let manager = ConfigManager::new(&data_dir).unwrap();

    // Settings file doesn't exist, should return defaults
    let settings = manager.load_settings().unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_save_and_reload_settings() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let manager = ConfigManager::new(&data_dir).unwrap();

    let settings = Settings {
        download_concurrency: 6,
        request_timeout_secs: 15,
        opencore_version: "0.9.9".to_string(),
        required_policy: RequiredPolicy::BestEffort,
        debug: true,
        ..Settings::default()
    };
    manager.save_settings(&settings).unwrap();

    assert!(manager.settings_path().exists());
    let reloaded = manager.load_settings().unwrap();
    assert_eq!(reloaded, settings);
}

#[test]
fn test_partial_settings_file() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let manager = ConfigManager::new(&data_dir).unwrap();
    fs::write(
        manager.settings_path(),
        "request_timeout_secs: 5\nrequired_policy: all_items\n",
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.request_timeout_secs, 5);
    assert_eq!(settings.required_policy, RequiredPolicy::AllItems);
    assert_eq!(settings.download_concurrency, 3);
}

#[test]
fn test_malformed_settings_rejected() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let manager = ConfigManager::new(&data_dir).unwrap();
    fs::write(manager.settings_path(), "download_concurrency: many\n").unwrap();

    assert!(manager.load_settings().is_err());
}

#[test]
fn test_profile_roundtrip() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let manager = ConfigManager::new(&data_dir).unwrap();
    let profile = sample_profile();

    let path = manager.save_profile("z390", &profile).unwrap();
    assert_eq!(path, data_dir.join("profiles").join("z390.yaml"));

    let loaded = manager.load_profile(&path).unwrap();
    assert_eq!(loaded, profile);
}

#[test]
fn test_list_profiles_sorted() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let manager = ConfigManager::new(&data_dir).unwrap();
    assert!(manager.list_profiles().unwrap().is_empty());

    manager.save_profile("workstation", &sample_profile()).unwrap();
    manager
        .save_profile("laptop", &HardwareProfile::new("Intel", "Dell"))
        .unwrap();
    fs::write(data_dir.join("profiles").join("notes.txt"), "not a profile").unwrap();

    assert_eq!(
        manager.list_profiles().unwrap(),
        vec!["laptop".to_string(), "workstation".to_string()]
    );
}

#[test]
fn test_load_handwritten_profile() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let manager = ConfigManager::new(&data_dir).unwrap();
    let path = data_dir.join("machine.yaml");
    fs::write(
        &path,
        r#"
cpu:
  brand: AMD
  generation: Zen 3
  model: Ryzen 7 5800X
motherboard:
  brand: MSI
  model: B550 Tomahawk
network:
  ethernet:
    model: Realtek RTL8125
formFactor: desktop
"#,
    )
    .unwrap();

    let profile = manager.load_profile(&path).unwrap();

    assert_eq!(profile.cpu.brand, "AMD");
    assert_eq!(profile.cpu.generation.as_deref(), Some("Zen 3"));
    assert_eq!(profile.motherboard.unwrap().model, "B550 Tomahawk");
    assert_eq!(
        profile.network.unwrap().ethernet.unwrap().model,
        "Realtek RTL8125"
    );
    assert_eq!(profile.form_factor, FormFactor::Desktop);
}

#[test]
fn test_load_missing_profile_fails() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let manager = ConfigManager::new(&data_dir).unwrap();

    let err = manager.load_profile(&data_dir.join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn test_settings_feed_generation() {
    let settings = Settings {
        opencore_version: "0.9.7".to_string(),
        ..Settings::default()
    };

    let options = settings.apply_defaults(GenerationOptions::default());
    assert_eq!(options.opencore_version(), "0.9.7");

    let pinned = settings.apply_defaults(GenerationOptions {
        opencore_version: Some("1.0.1".to_string()),
        ..Default::default()
    });
    assert_eq!(pinned.opencore_version(), "1.0.1");

    assert!(settings.catalog().is_ok());
}

#[test]
fn test_custom_catalog_path() {
    let (_temp_dir, data_dir) = create_test_data_dir();
    let catalog_path = data_dir.join("catalog.yaml");
    fs::write(
        &catalog_path,
        r#"
fallback:
  core: "https://mirror.test/{version}/{name}"
  driver: "https://mirror.test/drivers/{name}"
  kext: "https://mirror.test/kexts/{stem}.zip"
  tool: "https://mirror.test/tools/{name}"
  acpi-patch: "https://mirror.test/acpi/{name}"
"#,
    )
    .unwrap();

    let settings = Settings {
        catalog_path: Some(catalog_path),
        ..Settings::default()
    };
    let catalog = settings.catalog().unwrap();

    assert_eq!(
        catalog.resolve_url(efiforge::models::AssetKind::Driver, "HfsPlus.efi", "1.0.2"),
        "https://mirror.test/drivers/HfsPlus.efi"
    );

    let missing = Settings {
        catalog_path: Some(data_dir.join("nope.yaml")),
        ..Settings::default()
    };
    assert!(missing.catalog().is_err());
}
