use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OpenCore release used when the caller does not pin one.
pub const DEFAULT_OPENCORE_VERSION: &str = "1.0.2";

/// Container format of the generated bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    Zip,
    /// Accepted but encoded as zip, see [`crate::services::archive`].
    Iso,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Iso => "iso",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "iso" => Ok(Self::Iso),
            other => Err(format!("unsupported archive format: {}", other)),
        }
    }
}

/// Switches controlling a single generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(rename = "openCoreVersion", default, skip_serializing_if = "Option::is_none")]
    pub opencore_version: Option<String>,

    #[serde(default)]
    pub include_documentation: bool,

    #[serde(default = "default_include_tools")]
    pub include_tools: bool,

    #[serde(default)]
    pub format: ArchiveFormat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,

    /// Seed for platform-identity generation. `None` draws from OS entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_include_tools() -> bool {
    true
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            opencore_version: None,
            include_documentation: false,
            include_tools: true,
            format: ArchiveFormat::Zip,
            custom_name: None,
            seed: None,
        }
    }
}

impl GenerationOptions {
    pub fn opencore_version(&self) -> &str {
        self.opencore_version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_OPENCORE_VERSION)
    }
}
