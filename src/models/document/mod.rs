//! The OpenCore configuration tree.
//!
//! [`ConfigDocument`] mirrors `config.plist` section by section. Keys are
//! serialized with the exact casing OpenCore expects, so the XML written by
//! [`ConfigDocument::to_xml`] can be dropped into `EFI/OC/` unchanged.

pub mod data;
pub mod sections;

pub use data::PlistData;
pub use sections::*;

use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// NVRAM vendor GUID holding `boot-args` and the other Apple boot variables.
pub const APPLE_BOOT_VARIABLE_GUID: &str = "7C436110-AB2A-4BBB-A880-FE41995C9F82";

/// NVRAM vendor GUID for the boot picker background colour.
pub const APPLE_VENDOR_VARIABLE_GUID: &str = "4D1EDE05-38C7-4A6A-9CC6-4BCCA8B38C14";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to encode config.plist: {0}")]
    Encode(#[source] plist::Error),

    #[error("Failed to decode config.plist: {0}")]
    Decode(#[source] plist::Error),

    #[error("Override does not fit the config.plist schema: {0}")]
    InvalidOverride(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "ACPI")]
    pub acpi: Acpi,

    #[serde(rename = "Booter")]
    pub booter: Booter,

    #[serde(rename = "DeviceProperties")]
    pub device_properties: DeviceProperties,

    #[serde(rename = "Kernel")]
    pub kernel: Kernel,

    #[serde(rename = "Misc")]
    pub misc: Misc,

    #[serde(rename = "NVRAM")]
    pub nvram: Nvram,

    #[serde(rename = "PlatformInfo")]
    pub platform_info: PlatformInfo,

    #[serde(rename = "UEFI")]
    pub uefi: Uefi,

    /// OpenCore release this document targets.
    pub version: String,
}

impl ConfigDocument {
    /// Serialize as an XML property list.
    pub fn to_xml(&self) -> Result<Vec<u8>, DocumentError> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, self).map_err(DocumentError::Encode)?;
        Ok(buf)
    }

    pub fn from_xml(bytes: &[u8]) -> Result<Self, DocumentError> {
        plist::from_bytes(bytes).map_err(DocumentError::Decode)
    }

    /// Untyped view of the document, used for structural merges.
    pub fn to_value(&self) -> Result<plist::Value, DocumentError> {
        let xml = self.to_xml()?;
        plist::Value::from_reader(Cursor::new(xml)).map_err(DocumentError::Decode)
    }

    pub fn from_value(value: &plist::Value) -> Result<Self, DocumentError> {
        let mut buf = Vec::new();
        value.to_writer_xml(&mut buf).map_err(DocumentError::Encode)?;
        plist::from_bytes(&buf).map_err(|e| DocumentError::InvalidOverride(e.to_string()))
    }

    /// Copy of this document with `overlay` structurally merged on top.
    pub fn with_override(&self, overlay: plist::Value) -> Result<Self, DocumentError> {
        crate::services::merge::apply_override(self, overlay)
    }

    // ===== Kernel.Add helpers =====

    pub fn kext(&self, bundle: &str) -> Option<&KernelAdd> {
        self.kernel
            .add
            .iter()
            .find(|k| k.bundle_path.eq_ignore_ascii_case(bundle))
    }

    pub fn has_enabled_kext(&self, bundle: &str) -> bool {
        self.kext(bundle).is_some_and(|k| k.enabled)
    }

    /// Append a kext unless an entry with the same bundle path already exists.
    pub fn add_kext(&mut self, entry: KernelAdd) -> bool {
        if self.kext(&entry.bundle_path).is_some() {
            return false;
        }
        self.kernel.add.push(entry);
        true
    }

    pub fn add_acpi(&mut self, path: &str, comment: &str) -> bool {
        if self.acpi.add.iter().any(|a| a.path.eq_ignore_ascii_case(path)) {
            return false;
        }
        self.acpi.add.push(AcpiAdd {
            comment: comment.to_string(),
            enabled: true,
            path: path.to_string(),
        });
        true
    }

    pub fn remove_acpi(&mut self, path: &str) {
        self.acpi.add.retain(|a| !a.path.eq_ignore_ascii_case(path));
    }

    // ===== NVRAM helpers =====

    pub fn boot_args(&self) -> &str {
        self.nvram
            .add
            .get(APPLE_BOOT_VARIABLE_GUID)
            .and_then(|vars| vars.get("boot-args"))
            .and_then(plist::Value::as_string)
            .unwrap_or("")
    }

    /// Append a boot argument, skipping it when already present.
    pub fn append_boot_arg(&mut self, arg: &str) {
        let current = self.boot_args().to_string();
        if current.split_whitespace().any(|a| a == arg) {
            return;
        }
        let updated = if current.is_empty() {
            arg.to_string()
        } else {
            format!("{} {}", current, arg)
        };
        self.nvram
            .add
            .entry(APPLE_BOOT_VARIABLE_GUID.to_string())
            .or_default()
            .insert("boot-args".to_string(), plist::Value::String(updated));
    }

    // ===== DeviceProperties helpers =====

    pub fn set_device_property(&mut self, pci_path: &str, key: &str, value: plist::Value) {
        self.device_properties
            .add
            .entry(pci_path.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn device_property(&self, pci_path: &str, key: &str) -> Option<&plist::Value> {
        self.device_properties
            .add
            .get(pci_path)
            .and_then(|props| props.get(key))
    }
}
