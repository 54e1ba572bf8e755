//! Derive the list of binaries a [`ConfigDocument`] needs.

use crate::catalog::{AssetCatalog, CatalogError};
use crate::models::{AssetDescriptor, AssetKind, ConfigDocument, GenerationOptions, asset_id};
use indexmap::IndexMap;

/// Firmware entry point, copied to `EFI/BOOT/`.
pub const CORE_ENTRY_POINT: &str = "BOOTx64.efi";

/// The bootloader itself, copied to `EFI/OC/`.
pub const CORE_RUNTIME: &str = "OpenCore.efi";

/// Builds ordered, deduplicated asset manifests.
///
/// The order is core, drivers, kexts, tools, ACPI tables, each in document
/// order. Identical input always yields the identical list.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    catalog: AssetCatalog,
}

impl ManifestBuilder {
    pub fn new(catalog: AssetCatalog) -> Self {
        Self { catalog }
    }

    pub fn with_embedded_catalog() -> Result<Self, CatalogError> {
        Ok(Self::new(AssetCatalog::embedded()?))
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn build(&self, doc: &ConfigDocument, options: &GenerationOptions) -> Vec<AssetDescriptor> {
        let version = options.opencore_version();
        let mut entries: IndexMap<String, AssetDescriptor> = IndexMap::new();

        let mut push = |kind: AssetKind, name: &str| {
            let id = asset_id(kind, name);
            if entries.contains_key(&id) {
                tracing::debug!("Skipping duplicate asset {}", id);
                return;
            }
            let descriptor = AssetDescriptor {
                id: id.clone(),
                name: name.to_string(),
                kind,
                resolved_url: self.catalog.resolve_url(kind, name, version),
                estimated_size_bytes: self.catalog.estimated_size(kind, name),
                required: self.catalog.is_required(kind, name),
                category: self.catalog.category(kind, name),
            };
            entries.insert(id, descriptor);
        };

        push(AssetKind::Core, CORE_ENTRY_POINT);
        push(AssetKind::Core, CORE_RUNTIME);

        for driver in doc.uefi.drivers.iter().filter(|d| d.enabled) {
            push(AssetKind::Driver, &driver.path);
        }
        for kext in doc.kernel.add.iter().filter(|k| k.enabled) {
            push(AssetKind::Kext, &kext.bundle_path);
        }
        if options.include_tools {
            for tool in doc.misc.tools.iter().filter(|t| t.enabled) {
                push(AssetKind::Tool, &tool.path);
            }
        }
        for table in doc.acpi.add.iter().filter(|a| a.enabled) {
            push(AssetKind::AcpiPatch, &table.path);
        }

        let manifest: Vec<_> = entries.into_values().collect();
        tracing::info!(
            "Built asset manifest: {} items, ~{} KiB",
            manifest.len(),
            manifest.iter().map(|a| a.estimated_size_bytes).sum::<u64>() / 1024
        );
        manifest
    }
}
