use serde::{Deserialize, Serialize};

/// Declarative description of the machine an EFI is generated for.
///
/// Field names follow the camelCase keys produced by the form layer
/// (`sizeGB`, `layoutId`, ...). Only `cpu.brand` and `motherboard.brand`
/// are required; every other field only enables or suppresses a branch
/// of the synthesized configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    #[serde(default)]
    pub cpu: Cpu,

    #[serde(default)]
    pub gpu: Gpu,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motherboard: Option<Motherboard>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Memory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Audio>,

    #[serde(default)]
    pub form_factor: FormFactor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
    #[serde(default)]
    pub brand: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gpu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrated: Option<GpuDevice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrete: Option<GpuDevice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuDevice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Motherboard {
    #[serde(default)]
    pub brand: String,

    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chipset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    #[serde(rename = "sizeGB")]
    pub size_gb: u32,

    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub drives: Vec<Drive>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "sizeGB")]
    pub size_gb: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Drive {
    pub fn is_nvme(&self) -> bool {
        self.kind.eq_ignore_ascii_case("nvme")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethernet: Option<NetworkDevice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi: Option<NetworkDevice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bluetooth: Option<NetworkDevice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDevice {
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audio {
    #[serde(default)]
    pub codec: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<u32>,
}

/// Physical form factor, used for SMBIOS selection and laptop-only kexts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    #[default]
    Desktop,
    Laptop,
}

/// CPU vendor as far as the configuration cares.
///
/// Intel is the default vendor; AMD is the alternate vendor that needs
/// power-management emulation and the CPU lock quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuVendor {
    Intel,
    Amd,
}

impl Cpu {
    pub fn vendor(&self) -> CpuVendor {
        if self.brand.trim().eq_ignore_ascii_case("amd") {
            CpuVendor::Amd
        } else {
            CpuVendor::Intel
        }
    }
}

impl HardwareProfile {
    /// Minimal profile with only the two required brand fields filled in.
    pub fn new(cpu_brand: impl Into<String>, motherboard_brand: impl Into<String>) -> Self {
        Self {
            cpu: Cpu {
                brand: cpu_brand.into(),
                ..Default::default()
            },
            motherboard: Some(Motherboard {
                brand: motherboard_brand.into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn ethernet_model(&self) -> Option<&str> {
        self.network
            .as_ref()
            .and_then(|n| n.ethernet.as_ref())
            .map(|e| e.model.as_str())
            .filter(|m| !m.trim().is_empty())
    }

    pub fn has_nvme(&self) -> bool {
        self.storage
            .as_ref()
            .is_some_and(|s| s.drives.iter().any(Drive::is_nvme) || s.kind.eq_ignore_ascii_case("nvme"))
    }
}
