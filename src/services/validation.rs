//! Structural checks on a finished [`ConfigDocument`].
//!
//! Validation never fails: every problem becomes an entry in the returned
//! [`ValidationReport`]. Errors make the document unbootable; warnings are
//! hardware the generator could not fully support.

use crate::models::ConfigDocument;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kexts without which macOS refuses to boot on non-Apple hardware.
pub const IDENTITY_EMULATION_KEXTS: [&str; 2] = ["Lilu.kext", "VirtualSMC.kext"];

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationError {
    #[error("Required kext {bundle} is missing or disabled")]
    MissingKext { bundle: String },

    #[error("No UEFI driver is enabled")]
    NoEnabledDriver,

    #[error("PlatformInfo.Generic.SystemProductName is empty")]
    MissingProductName,

    #[error("{section} contains an entry without a path")]
    EmptyEntryPath { section: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationWarning {
    #[error("No macOS ethernet driver matches {model}")]
    NoEthernetDriver { model: String },

    #[error("Discrete GPU {model} is not supported by macOS and should be disabled")]
    UnsupportedDiscreteGpu { model: String },

    #[error("Unknown CPU generation {generation}, using SMBIOS {model}")]
    UnknownCpuGeneration { generation: String, model: String },

    #[error("No layout-id known for codec {codec}, using {layout_id}")]
    AudioLayoutDefaulted { codec: String, layout_id: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// Attach warnings collected during synthesis.
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = ValidationWarning>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

pub fn validate(doc: &ConfigDocument) -> ValidationReport {
    let mut errors = Vec::new();

    for bundle in IDENTITY_EMULATION_KEXTS {
        if !doc.has_enabled_kext(bundle) {
            errors.push(ValidationError::MissingKext {
                bundle: bundle.to_string(),
            });
        }
    }

    if !doc.uefi.drivers.iter().any(|d| d.enabled) {
        errors.push(ValidationError::NoEnabledDriver);
    }

    if doc.platform_info.generic.system_product_name.trim().is_empty() {
        errors.push(ValidationError::MissingProductName);
    }

    let blank_paths = [
        ("ACPI.Add", doc.acpi.add.iter().any(|a| a.path.trim().is_empty())),
        (
            "Kernel.Add",
            doc.kernel.add.iter().any(|k| k.bundle_path.trim().is_empty()),
        ),
        ("Misc.Tools", doc.misc.tools.iter().any(|t| t.path.trim().is_empty())),
        (
            "UEFI.Drivers",
            doc.uefi.drivers.iter().any(|d| d.path.trim().is_empty()),
        ),
    ];
    for (section, blank) in blank_paths {
        if blank {
            errors.push(ValidationError::EmptyEntryPath {
                section: section.to_string(),
            });
        }
    }

    if !errors.is_empty() {
        tracing::warn!("Config validation found {} error(s)", errors.len());
        for error in &errors {
            tracing::debug!("Validation error: {}", error);
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KernelAdd, UefiDriver};

    fn valid_document() -> ConfigDocument {
        let mut doc = ConfigDocument::default();
        doc.add_kext(KernelAdd::kext("Lilu.kext", "Patch engine"));
        doc.add_kext(KernelAdd::kext("VirtualSMC.kext", "SMC emulator"));
        doc.uefi
            .drivers
            .push(UefiDriver::new("OpenRuntime.efi", "Runtime services", true));
        doc.platform_info.generic.system_product_name = "iMac19,1".to_string();
        doc
    }

    #[test]
    fn test_valid_document() {
        let report = validate(&valid_document());
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_each_missing_kext_reported() {
        let mut doc = valid_document();
        doc.kernel.add.clear();

        let report = validate(&doc);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                ValidationError::MissingKext {
                    bundle: "Lilu.kext".to_string()
                },
                ValidationError::MissingKext {
                    bundle: "VirtualSMC.kext".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_disabled_kext_counts_as_missing() {
        let mut doc = valid_document();
        doc.kernel.add[1].enabled = false;

        let report = validate(&doc);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_drivers_and_product_name() {
        let mut doc = valid_document();
        doc.uefi.drivers[0].enabled = false;
        doc.platform_info.generic.system_product_name.clear();

        let report = validate(&doc);
        assert!(report.errors.contains(&ValidationError::NoEnabledDriver));
        assert!(report.errors.contains(&ValidationError::MissingProductName));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let report = validate(&valid_document()).with_warnings([
            ValidationWarning::NoEthernetDriver {
                model: "Aquantia AQC107".to_string(),
            },
        ]);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].to_string(),
            "No macOS ethernet driver matches Aquantia AQC107"
        );
    }
}
