//! Packs a document and its downloaded assets into the `EFI/` layout.

use crate::models::{
    ArchiveFormat, AssetKind, ConfigDocument, DocumentError, GenerationOptions, HardwareProfile,
    parse_asset_id,
};
use crate::services::manifest::CORE_ENTRY_POINT;
use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CONFIG_PATH: &str = "EFI/OC/config.plist";
pub const SUMMARY_PATH: &str = "EFI-Summary.md";
pub const GUIDE_PATH: &str = "Installation-Guide.md";

#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error while writing archive: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialize(#[from] DocumentError),
}

/// Non-fatal packaging problems, recorded on the result.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PackagingWarning {
    #[error("{requested} output is not supported, wrote {produced} contents instead")]
    FormatDegraded {
        requested: ArchiveFormat,
        produced: ArchiveFormat,
    },

    #[error("Skipped asset with unrecognized id {id}")]
    UnknownAsset { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    Text(String),
    Binary(Vec<u8>),
}

impl EntryContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn encoding(&self) -> &'static str {
        match self {
            Self::Text(_) => "utf-8",
            Self::Binary(_) => "binary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub content: EntryContent,
}

#[derive(Debug, Clone)]
pub struct AssembledArchive {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub format: ArchiveFormat,
    /// Entry paths in archive order.
    pub entries: Vec<String>,
    pub warnings: Vec<PackagingWarning>,
}

/// Destination of an asset inside the bundle.
pub fn entry_path(kind: AssetKind, name: &str) -> String {
    match kind {
        AssetKind::Core if name == CORE_ENTRY_POINT => format!("EFI/BOOT/{}", name),
        AssetKind::Core => format!("EFI/OC/{}", name),
        AssetKind::Driver => format!("EFI/OC/Drivers/{}", name),
        AssetKind::Kext => format!("EFI/OC/Kexts/{}", name),
        AssetKind::Tool => format!("EFI/OC/Tools/{}", name),
        AssetKind::AcpiPatch => format!("EFI/OC/ACPI/{}", name),
    }
}

/// `custom_name` if set, else `OpenCore-EFI-<cpu brand>-<YYYYMMDD-HHMMSS>`,
/// with the format's extension.
pub fn archive_file_name(
    profile: &HardwareProfile,
    options: &GenerationOptions,
    timestamp: NaiveDateTime,
) -> String {
    let extension = options.format.extension();
    let stem = match options.custom_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name
            .strip_suffix(&format!(".{}", extension))
            .unwrap_or(name)
            .to_string(),
        _ => {
            let brand: String = profile
                .cpu
                .brand
                .trim()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                .collect();
            format!("OpenCore-EFI-{}-{}", brand, timestamp.format("%Y%m%d-%H%M%S"))
        }
    };
    format!("{}.{}", stem, extension)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveAssembler;

impl ArchiveAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Collect the archive entries in their final order: core binaries,
    /// config.plist, drivers, kexts, tools, ACPI tables, documentation.
    pub fn entries(
        &self,
        doc: &ConfigDocument,
        profile: &HardwareProfile,
        assets: &IndexMap<String, Vec<u8>>,
        options: &GenerationOptions,
        warnings: &mut Vec<PackagingWarning>,
    ) -> Result<Vec<ArchiveEntry>, PackagingError> {
        let mut binaries: Vec<(AssetKind, &str, &Vec<u8>)> = Vec::with_capacity(assets.len());
        for (id, bytes) in assets {
            match parse_asset_id(id) {
                Some((AssetKind::Tool, _)) if !options.include_tools => {}
                Some((kind, name)) => binaries.push((kind, name, bytes)),
                None => {
                    tracing::warn!("Skipping asset with unrecognized id {}", id);
                    warnings.push(PackagingWarning::UnknownAsset { id: id.clone() });
                }
            }
        }
        // Stable: manifest order survives within a kind.
        binaries.sort_by_key(|(kind, name, _)| {
            (*kind, *kind == AssetKind::Core && *name != CORE_ENTRY_POINT)
        });

        let split = binaries
            .iter()
            .position(|(kind, _, _)| *kind != AssetKind::Core)
            .unwrap_or(binaries.len());

        let to_entry = |(kind, name, bytes): &(AssetKind, &str, &Vec<u8>)| ArchiveEntry {
            path: entry_path(*kind, name),
            content: EntryContent::Binary((*bytes).clone()),
        };

        let mut entries: Vec<ArchiveEntry> = binaries[..split].iter().map(to_entry).collect();
        entries.push(ArchiveEntry {
            path: CONFIG_PATH.to_string(),
            content: EntryContent::Binary(doc.to_xml()?),
        });
        entries.extend(binaries[split..].iter().map(to_entry));

        if options.include_documentation {
            entries.push(ArchiveEntry {
                path: SUMMARY_PATH.to_string(),
                content: EntryContent::Text(summary_document(doc, profile)),
            });
            entries.push(ArchiveEntry {
                path: GUIDE_PATH.to_string(),
                content: EntryContent::Text(installation_guide(doc)),
            });
        }

        Ok(entries)
    }

    pub fn assemble(
        &self,
        doc: &ConfigDocument,
        profile: &HardwareProfile,
        assets: &IndexMap<String, Vec<u8>>,
        options: &GenerationOptions,
    ) -> Result<AssembledArchive, PackagingError> {
        let mut warnings = Vec::new();
        let entries = self.entries(doc, profile, assets, options, &mut warnings)?;

        if options.format == ArchiveFormat::Iso {
            tracing::warn!("ISO output is not supported, packaging as zip");
            warnings.push(PackagingWarning::FormatDegraded {
                requested: ArchiveFormat::Iso,
                produced: ArchiveFormat::Zip,
            });
        }

        let bytes = write_zip(&entries)?;
        let file_name = archive_file_name(profile, options, Local::now().naive_local());

        tracing::info!(
            "Assembled {} ({} entries, {} bytes)",
            file_name,
            entries.len(),
            bytes.len()
        );

        Ok(AssembledArchive {
            bytes,
            file_name,
            format: options.format,
            entries: entries.into_iter().map(|e| e.path).collect(),
            warnings,
        })
    }
}

fn write_zip(entries: &[ArchiveEntry]) -> Result<Vec<u8>, PackagingError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        writer.start_file(entry.path.as_str(), file_options)?;
        writer.write_all(entry.content.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

fn summary_document(doc: &ConfigDocument, profile: &HardwareProfile) -> String {
    let board = profile
        .motherboard
        .as_ref()
        .map(|m| format!("{} {}", m.brand, m.model).trim().to_string())
        .unwrap_or_default();

    let mut lines = vec![
        "# OpenCore EFI Summary".to_string(),
        String::new(),
        format!("- OpenCore version: {}", doc.version),
        format!("- SMBIOS: {}", doc.platform_info.generic.system_product_name),
        format!("- CPU: {}", profile.cpu.brand),
    ];
    if let Some(generation) = &profile.cpu.generation {
        lines.push(format!("- CPU generation: {}", generation));
    }
    lines.push(format!("- Motherboard: {}", board));
    lines.push(format!("- boot-args: `{}`", doc.boot_args()));

    lines.extend(section("Kexts"));
    lines.extend(
        doc.kernel
            .add
            .iter()
            .filter(|k| k.enabled)
            .map(|k| format!("- {} ({})", k.bundle_path, k.comment)),
    );

    lines.extend(section("UEFI drivers"));
    lines.extend(
        doc.uefi
            .drivers
            .iter()
            .filter(|d| d.enabled)
            .map(|d| format!("- {}", d.path)),
    );

    lines.extend(section("ACPI tables"));
    lines.extend(
        doc.acpi
            .add
            .iter()
            .filter(|a| a.enabled)
            .map(|a| format!("- {} ({})", a.path, a.comment)),
    );

    if !doc.device_properties.add.is_empty() {
        lines.extend(section("Device properties"));
        for (path, props) in &doc.device_properties.add {
            let keys: Vec<&str> = props.keys().map(String::as_str).collect();
            lines.push(format!("- `{}`: {}", path, keys.join(", ")));
        }
    }

    to_markdown(lines)
}

fn installation_guide(doc: &ConfigDocument) -> String {
    let product = &doc.platform_info.generic.system_product_name;
    let lines = vec![
        "# Installation Guide".to_string(),
        String::new(),
        "1. Format a USB drive (16 GB or larger) as FAT32 with a GUID partition map.".to_string(),
        "2. Copy the `EFI` folder from this archive to the root of the drive.".to_string(),
        "3. In firmware setup disable CFG-Lock, VT-d and CSM, and enable XHCI hand-off."
            .to_string(),
        "4. Boot from the USB drive and pick the macOS installer in the OpenCore picker."
            .to_string(),
        "5. Once installed, copy the same `EFI` folder to the EFI partition of the system disk."
            .to_string(),
        String::new(),
        format!(
            "The generated SMBIOS ({}) carries a random serial number. Check it is not in use",
            product
        ),
        "on Apple's coverage site before signing in to iCloud or iMessage.".to_string(),
        String::new(),
        "Verbose boot (`-v`) is enabled. Remove it from `boot-args` in `EFI/OC/config.plist`"
            .to_string(),
        "once the system boots reliably.".to_string(),
    ];
    to_markdown(lines)
}

/// Blank line, heading, blank line.
fn section(title: &str) -> [String; 3] {
    [String::new(), format!("## {}", title), String::new()]
}

fn to_markdown(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
