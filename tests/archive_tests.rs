//! Integration tests for ArchiveAssembler
//!
//! These tests verify:
//! - One archive entry per downloaded asset plus config.plist and optional docs
//! - The EFI/ directory layout
//! - config.plist inside the archive parses back to the document
//! - ISO requests degrade to zip contents with a warning

use efiforge::models::{
    ArchiveFormat, AssetDescriptor, ConfigDocument, GenerationOptions, HardwareProfile,
};
use efiforge::services::archive::{CONFIG_PATH, GUIDE_PATH, SUMMARY_PATH};
use efiforge::services::{ArchiveAssembler, ConfigSynthesizer, ManifestBuilder, PackagingWarning};
use indexmap::IndexMap;
use std::io::{Cursor, Read};

struct Fixture {
    profile: HardwareProfile,
    document: ConfigDocument,
    manifest: Vec<AssetDescriptor>,
    assets: IndexMap<String, Vec<u8>>,
}

fn fixture(options: &GenerationOptions) -> Fixture {
    let profile = HardwareProfile::new("Intel", "Gigabyte");
    let document = ConfigSynthesizer::seeded(11)
        .synthesize(&profile, options)
        .unwrap()
        .document;
    let manifest = ManifestBuilder::with_embedded_catalog()
        .unwrap()
        .build(&document, options);
    let assets = manifest
        .iter()
        .map(|a| (a.id.clone(), a.name.as_bytes().to_vec()))
        .collect();

    Fixture {
        profile,
        document,
        manifest,
        assets,
    }
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    content
}

#[test]
fn test_entry_count_matches_document() {
    let options = GenerationOptions::default();
    let f = fixture(&options);

    let archive = ArchiveAssembler::new()
        .assemble(&f.document, &f.profile, &f.assets, &options)
        .unwrap();

    let drivers = f.document.uefi.drivers.iter().filter(|d| d.enabled).count();
    let kexts = f.document.kernel.add.iter().filter(|k| k.enabled).count();
    let tools = f.document.misc.tools.iter().filter(|t| t.enabled).count();
    let tables = f.document.acpi.add.iter().filter(|a| a.enabled).count();

    let names = entry_names(&archive.bytes);
    assert_eq!(names.len(), 2 + drivers + kexts + tools + tables + 1);
    assert_eq!(names, archive.entries);
    assert_eq!(f.manifest.len() + 1, names.len());
    assert!(archive.warnings.is_empty());
}

#[test]
fn test_documentation_adds_two_entries() {
    let options = GenerationOptions {
        include_documentation: true,
        ..Default::default()
    };
    let f = fixture(&options);

    let archive = ArchiveAssembler::new()
        .assemble(&f.document, &f.profile, &f.assets, &options)
        .unwrap();

    assert_eq!(archive.entries.len(), f.manifest.len() + 3);
    let summary = String::from_utf8(read_entry(&archive.bytes, SUMMARY_PATH)).unwrap();
    assert!(summary.contains(&f.document.platform_info.generic.system_product_name));
    assert!(summary.contains("Lilu.kext"));

    let guide = String::from_utf8(read_entry(&archive.bytes, GUIDE_PATH)).unwrap();
    assert!(guide.starts_with("# Installation Guide"));
}

#[test]
fn test_layout() {
    let options = GenerationOptions::default();
    let f = fixture(&options);

    let archive = ArchiveAssembler::new()
        .assemble(&f.document, &f.profile, &f.assets, &options)
        .unwrap();

    assert_eq!(archive.entries[0], "EFI/BOOT/BOOTx64.efi");
    assert_eq!(archive.entries[1], "EFI/OC/OpenCore.efi");
    assert_eq!(archive.entries[2], CONFIG_PATH);
    assert!(archive.entries.contains(&"EFI/OC/Kexts/Lilu.kext".to_string()));
    assert!(archive.entries.contains(&"EFI/OC/Drivers/OpenRuntime.efi".to_string()));
    assert!(
        archive.entries[3..]
            .iter()
            .all(|path| path.starts_with("EFI/OC/Drivers/")
                || path.starts_with("EFI/OC/Kexts/")
                || path.starts_with("EFI/OC/Tools/")
                || path.starts_with("EFI/OC/ACPI/"))
    );
    assert_eq!(read_entry(&archive.bytes, "EFI/OC/Kexts/Lilu.kext"), b"Lilu.kext");
}

#[test]
fn test_config_plist_parses_back() {
    let options = GenerationOptions::default();
    let f = fixture(&options);

    let archive = ArchiveAssembler::new()
        .assemble(&f.document, &f.profile, &f.assets, &options)
        .unwrap();

    let parsed = ConfigDocument::from_xml(&read_entry(&archive.bytes, CONFIG_PATH)).unwrap();
    assert_eq!(parsed, f.document);
}

#[test]
fn test_iso_degrades_to_zip_contents() {
    let zip_options = GenerationOptions::default();
    let iso_options = GenerationOptions {
        format: ArchiveFormat::Iso,
        ..Default::default()
    };
    let f = fixture(&zip_options);
    let assembler = ArchiveAssembler::new();

    let zip = assembler
        .assemble(&f.document, &f.profile, &f.assets, &zip_options)
        .unwrap();
    let iso = assembler
        .assemble(&f.document, &f.profile, &f.assets, &iso_options)
        .unwrap();

    assert_eq!(iso.format, ArchiveFormat::Iso);
    assert!(iso.file_name.ends_with(".iso"));
    assert_eq!(entry_names(&iso.bytes), zip.entries);
    assert_eq!(
        iso.warnings,
        vec![PackagingWarning::FormatDegraded {
            requested: ArchiveFormat::Iso,
            produced: ArchiveFormat::Zip,
        }]
    );
}

#[test]
fn test_tools_dropped_when_excluded() {
    let with_tools = GenerationOptions::default();
    let f = fixture(&with_tools);
    let without_tools = GenerationOptions {
        include_tools: false,
        ..Default::default()
    };

    let archive = ArchiveAssembler::new()
        .assemble(&f.document, &f.profile, &f.assets, &without_tools)
        .unwrap();

    assert!(archive.entries.iter().all(|p| !p.starts_with("EFI/OC/Tools/")));
}

#[test]
fn test_custom_name_used() {
    let options = GenerationOptions {
        custom_name: Some("Z390-Build".to_string()),
        ..Default::default()
    };
    let f = fixture(&options);

    let archive = ArchiveAssembler::new()
        .assemble(&f.document, &f.profile, &f.assets, &options)
        .unwrap();

    assert_eq!(archive.file_name, "Z390-Build.zip");
}
