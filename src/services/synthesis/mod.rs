//! Hardware profile → `config.plist` synthesis.
//!
//! [`ConfigSynthesizer`] starts from the fixed baseline in [`baseline`] and
//! applies one branch per hardware area. Branches only flip quirks that
//! already exist in the baseline and append list or dictionary entries, so
//! their order does not change the result beyond the order of list entries.
//!
//! Platform identity values come from an injected random number generator.
//! A seeded generator makes the whole synthesis reproducible:
//!
//! ```ignore
//! let mut synthesizer = ConfigSynthesizer::seeded(42);
//! let synthesis = synthesizer.synthesize(&profile, &GenerationOptions::default())?;
//! println!("{}", synthesis.identity.serial);
//! ```

pub mod baseline;
pub mod identity;
pub mod tables;

pub use baseline::baseline_document;
pub use identity::PlatformIdentity;

use crate::models::{
    ConfigDocument, CpuVendor, FormFactor, GenerationOptions, HardwareProfile, KernelAdd,
    PlistData,
};
use crate::services::validation::ValidationWarning;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::sync::LazyLock;
use tables::*;
use thiserror::Error;

static AMD_DGPU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(AMD_DGPU_PATTERN).expect("Invalid AMD GPU regex"));

const EC_USBX_DESKTOP: &str = "SSDT-EC-USBX-DESKTOP.aml";
const EC_USBX_LAPTOP: &str = "SSDT-EC-USBX-LAPTOP.aml";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Hardware profile is missing required field {0}")]
    MissingField(&'static str),
}

/// Result of one synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub document: ConfigDocument,
    pub identity: PlatformIdentity,
    pub warnings: Vec<ValidationWarning>,
}

/// Builds a [`ConfigDocument`] from a [`HardwareProfile`].
///
/// Generic over the RNG so tests and benches can inject a deterministic one.
pub struct ConfigSynthesizer<R: Rng = StdRng> {
    rng: R,
}

impl ConfigSynthesizer<StdRng> {
    /// Synthesizer drawing identity values from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Seeded when `options.seed` is set, entropy-backed otherwise.
    pub fn for_options(options: &GenerationOptions) -> Self {
        match options.seed {
            Some(seed) => Self::seeded(seed),
            None => Self::new(),
        }
    }
}

impl Default for ConfigSynthesizer<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ConfigSynthesizer<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn synthesize(
        &mut self,
        profile: &HardwareProfile,
        options: &GenerationOptions,
    ) -> Result<Synthesis, SynthesisError> {
        check_required_fields(profile)?;

        tracing::info!(
            "Synthesizing config.plist for {} CPU on {} board (OpenCore {})",
            profile.cpu.brand,
            profile.motherboard.as_ref().map_or("", |m| m.brand.as_str()),
            options.opencore_version()
        );

        let mut doc = baseline_document(options.opencore_version());
        let mut warnings = Vec::new();

        apply_cpu(&mut doc, profile);
        apply_graphics(&mut doc, profile, &mut warnings);
        apply_audio(&mut doc, profile, &mut warnings);
        apply_network(&mut doc, profile, &mut warnings);
        apply_storage(&mut doc, profile);
        apply_form_factor(&mut doc, profile);
        let identity = self.apply_identity(&mut doc, profile, &mut warnings);

        tracing::info!(
            "Synthesized {} kexts, {} ACPI tables, SMBIOS {} ({} warning(s))",
            doc.kernel.add.len(),
            doc.acpi.add.len(),
            identity.model,
            warnings.len()
        );

        Ok(Synthesis {
            document: doc,
            identity,
            warnings,
        })
    }

    fn apply_identity(
        &mut self,
        doc: &mut ConfigDocument,
        profile: &HardwareProfile,
        warnings: &mut Vec<ValidationWarning>,
    ) -> PlatformIdentity {
        let vendor = profile.cpu.vendor();
        let form_factor = profile.form_factor;
        let generation = profile
            .cpu
            .generation
            .as_deref()
            .filter(|g| !g.trim().is_empty());

        let model = match generation {
            Some(generation) => smbios_model_for(vendor, form_factor, generation).unwrap_or_else(|| {
                let fallback = default_smbios_model(vendor, form_factor);
                tracing::warn!(
                    "Unknown CPU generation '{}', falling back to {}",
                    generation,
                    fallback
                );
                warnings.push(ValidationWarning::UnknownCpuGeneration {
                    generation: generation.to_string(),
                    model: fallback.to_string(),
                });
                fallback
            }),
            None => default_smbios_model(vendor, form_factor),
        };

        let identity = PlatformIdentity::generate(model, &profile.cpu.brand, &mut self.rng);

        let generic = &mut doc.platform_info.generic;
        generic.system_product_name = identity.model.clone();
        generic.system_serial_number = identity.serial.clone();
        generic.mlb = identity.mlb.clone();
        generic.system_uuid = identity.uuid.clone();
        generic.rom = PlistData::new(identity.rom.to_vec());

        tracing::debug!("Platform identity: {} serial {}", identity.model, identity.serial);
        identity
    }
}

fn check_required_fields(profile: &HardwareProfile) -> Result<(), SynthesisError> {
    if profile.cpu.brand.trim().is_empty() {
        tracing::error!("Rejected hardware profile without cpu.brand");
        return Err(SynthesisError::MissingField("cpu.brand"));
    }
    let has_board_brand = profile
        .motherboard
        .as_ref()
        .is_some_and(|m| !m.brand.trim().is_empty());
    if !has_board_brand {
        tracing::error!("Rejected hardware profile without motherboard.brand");
        return Err(SynthesisError::MissingField("motherboard.brand"));
    }
    Ok(())
}

fn add_kext(doc: &mut ConfigDocument, bundle: &str) {
    let comment = kext_comment(bundle);
    let entry = if CODELESS_KEXTS.contains(&bundle) {
        KernelAdd::codeless(bundle, comment)
    } else {
        KernelAdd::kext(bundle, comment)
    };
    if doc.add_kext(entry) {
        tracing::debug!("Added kext {}", bundle);
    }
}

fn apply_cpu(doc: &mut ConfigDocument, profile: &HardwareProfile) {
    match profile.cpu.vendor() {
        CpuVendor::Amd => {
            doc.kernel.emulate.dummy_power_management = true;
            doc.kernel.quirks.apple_cpu_pm_cfg_lock = true;
            doc.kernel.quirks.apple_xcpm_cfg_lock = true;
            doc.kernel.quirks.provide_current_cpu_info = true;
            add_kext(doc, "AMDRyzenCPUPowerManagement.kext");
            add_kext(doc, "SMCAMDProcessor.kext");
        }
        CpuVendor::Intel => {
            doc.kernel.quirks.apple_cpu_pm_cfg_lock = false;
            doc.kernel.quirks.apple_xcpm_cfg_lock = false;
            add_kext(doc, "SMCProcessor.kext");
            add_kext(doc, "SMCSuperIO.kext");
            doc.add_acpi("SSDT-PLUG.aml", "CPU power management");

            let needs_awac = profile.form_factor == FormFactor::Desktop
                && profile
                    .cpu
                    .generation
                    .as_deref()
                    .map(normalize_generation)
                    .is_some_and(|g| AWAC_GENERATIONS.contains(&g.as_str()));
            if needs_awac {
                doc.add_acpi("SSDT-AWAC.aml", "AWAC system clock");
            }
        }
    }
}

fn apply_graphics(
    doc: &mut ConfigDocument,
    profile: &HardwareProfile,
    warnings: &mut Vec<ValidationWarning>,
) {
    if let Some(igpu) = &profile.gpu.integrated {
        match longest_match(IGPU_PLATFORM_IDS, &normalize_gpu_model(&igpu.model)) {
            Some(platform_id) => {
                doc.set_device_property(
                    IGPU_PCI_PATH,
                    "AAPL,ig-platform-id",
                    PlistData::from_u32_le(platform_id).into(),
                );
                doc.set_device_property(
                    IGPU_PCI_PATH,
                    "framebuffer-patch-enable",
                    PlistData::from_u32_le(1).into(),
                );
                tracing::debug!("iGPU {} uses platform id {:08X}", igpu.model, platform_id);
            }
            None => tracing::debug!("No framebuffer data for iGPU {}", igpu.model),
        }
    }

    if let Some(dgpu) = &profile.gpu.discrete {
        let is_amd = dgpu.brand.as_deref().is_some_and(|b| AMD_DGPU.is_match(b))
            || AMD_DGPU.is_match(&dgpu.model);
        if is_amd {
            doc.set_device_property(
                DGPU_PCI_PATH,
                "agdpmod",
                plist::Value::String("pikera".to_string()),
            );
            doc.append_boot_arg("agdpmod=pikera");
        } else {
            tracing::warn!("Discrete GPU {} is not supported by macOS", dgpu.model);
            warnings.push(ValidationWarning::UnsupportedDiscreteGpu {
                model: dgpu.model.clone(),
            });
        }
    }
}

fn apply_audio(
    doc: &mut ConfigDocument,
    profile: &HardwareProfile,
    warnings: &mut Vec<ValidationWarning>,
) {
    let Some(audio) = profile.audio.as_ref().filter(|a| !a.codec.trim().is_empty()) else {
        return;
    };

    let layout_id = match audio
        .layout_id
        .or_else(|| longest_match(AUDIO_LAYOUTS, &normalize_token(&audio.codec)))
    {
        Some(id) => id,
        None => {
            warnings.push(ValidationWarning::AudioLayoutDefaulted {
                codec: audio.codec.clone(),
                layout_id: DEFAULT_LAYOUT_ID,
            });
            DEFAULT_LAYOUT_ID
        }
    };

    doc.set_device_property(
        AUDIO_PCI_PATH,
        "layout-id",
        PlistData::from_u32_le(layout_id).into(),
    );
    add_kext(doc, "AppleALC.kext");
    tracing::debug!("Audio codec {} uses layout-id {}", audio.codec, layout_id);
}

fn apply_network(
    doc: &mut ConfigDocument,
    profile: &HardwareProfile,
    warnings: &mut Vec<ValidationWarning>,
) {
    if let Some(model) = profile.ethernet_model() {
        match ethernet_kext_for(model) {
            Some(kext) => add_kext(doc, kext),
            None => {
                tracing::warn!("No ethernet kext matches {}", model);
                warnings.push(ValidationWarning::NoEthernetDriver {
                    model: model.to_string(),
                });
            }
        }
    }

    let Some(network) = &profile.network else {
        return;
    };
    if let Some(wifi) = &network.wifi {
        for kext in wireless_kexts_for(WIFI_KEXTS, &wifi.model) {
            add_kext(doc, kext);
        }
    }
    if let Some(bluetooth) = &network.bluetooth {
        for kext in wireless_kexts_for(BLUETOOTH_KEXTS, &bluetooth.model) {
            add_kext(doc, kext);
        }
    }
}

fn apply_storage(doc: &mut ConfigDocument, profile: &HardwareProfile) {
    if profile.has_nvme() {
        add_kext(doc, "NVMeFix.kext");
    }
}

fn apply_form_factor(doc: &mut ConfigDocument, profile: &HardwareProfile) {
    if profile.form_factor != FormFactor::Laptop {
        return;
    }
    add_kext(doc, "SMCBatteryManager.kext");
    add_kext(doc, "VoodooPS2Controller.kext");
    doc.remove_acpi(EC_USBX_DESKTOP);
    doc.add_acpi(EC_USBX_LAPTOP, "Embedded controller and USB power");
    doc.add_acpi("SSDT-PNLF.aml", "Backlight control");
}
