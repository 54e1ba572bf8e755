//! Download locations and size heuristics for every asset kind.
//!
//! The table data lives in `data/catalog.yaml` so release bumps never touch
//! synthesis or manifest code. A settings file can point at a replacement
//! catalog with the same shape.

use crate::models::AssetKind;
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.yaml");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read asset catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse asset catalog: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("Asset catalog has no fallback URL template for {0}")]
    MissingFallback(AssetKind),
}

/// Exact-match metadata for one named asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCatalog {
    /// One URL template per kind, used when no exact entry exists.
    pub fallback: IndexMap<AssetKind, String>,

    #[serde(default)]
    pub size_estimates: IndexMap<AssetKind, u64>,

    #[serde(default)]
    pub assets: IndexMap<AssetKind, IndexMap<String, CatalogEntry>>,
}

impl AssetCatalog {
    /// The catalog shipped with the crate.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_yaml_str(EMBEDDED_CATALOG)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let catalog: AssetCatalog = serde_yaml_ng::from_str(yaml)?;

        // Every kind must resolve to something.
        if let Some(kind) = AssetKind::ALL
            .into_iter()
            .find(|k| !catalog.fallback.contains_key(k))
        {
            return Err(CatalogError::MissingFallback(kind));
        }

        Ok(catalog)
    }

    pub fn load(path: &Utf8Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_string(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&contents)?;
        tracing::info!("Loaded asset catalog from {}", path);
        Ok(catalog)
    }

    pub fn entry(&self, kind: AssetKind, name: &str) -> Option<&CatalogEntry> {
        self.assets.get(&kind).and_then(|entries| entries.get(name))
    }

    /// Exact table URL if present, else the kind's fallback template.
    pub fn resolve_url(&self, kind: AssetKind, name: &str, version: &str) -> String {
        let template = self
            .entry(kind, name)
            .and_then(|e| e.url.as_deref())
            .or_else(|| self.fallback.get(&kind).map(String::as_str))
            .unwrap_or("{name}");

        expand_template(template, name, version)
    }

    pub fn estimated_size(&self, kind: AssetKind, name: &str) -> u64 {
        self.entry(kind, name)
            .and_then(|e| e.size)
            .or_else(|| self.size_estimates.get(&kind).copied())
            .unwrap_or_else(|| default_size_estimate(kind))
    }

    pub fn category(&self, kind: AssetKind, name: &str) -> String {
        self.entry(kind, name)
            .and_then(|e| e.category.clone())
            .unwrap_or_else(|| kind.as_str().to_string())
    }

    pub fn is_required(&self, kind: AssetKind, name: &str) -> bool {
        kind == AssetKind::Core || self.entry(kind, name).is_some_and(|e| e.required)
    }
}

fn default_size_estimate(kind: AssetKind) -> u64 {
    match kind {
        AssetKind::Core => 512 * 1024,
        AssetKind::Driver => 256 * 1024,
        AssetKind::Kext => 1024 * 1024,
        AssetKind::Tool => 512 * 1024,
        AssetKind::AcpiPatch => 4 * 1024,
    }
}

fn expand_template(template: &str, name: &str, version: &str) -> String {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    template
        .replace("{name}", name)
        .replace("{stem}", stem)
        .replace("{version}", version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_parses() {
        let catalog = AssetCatalog::embedded().unwrap();
        for kind in AssetKind::ALL {
            assert!(catalog.fallback.contains_key(&kind));
        }
        assert!(catalog.entry(AssetKind::Kext, "Lilu.kext").is_some());
    }

    #[test]
    fn test_exact_url_wins() {
        let catalog = AssetCatalog::embedded().unwrap();
        let url = catalog.resolve_url(AssetKind::Kext, "Lilu.kext", "1.0.2");
        assert!(url.contains("Lilu-1.6.9-RELEASE.zip"));
    }

    #[test]
    fn test_fallback_template() {
        let catalog = AssetCatalog::embedded().unwrap();
        let url = catalog.resolve_url(AssetKind::Kext, "NVMeFix.kext", "1.0.2");
        assert_eq!(
            url,
            "https://github.com/acidanthera/NVMeFix/releases/latest/download/NVMeFix-RELEASE.zip"
        );

        let url = catalog.resolve_url(AssetKind::Core, "OpenCore.efi", "0.9.9");
        assert!(url.contains("/0.9.9/"));
        assert!(url.ends_with("OpenCore.efi"));
    }

    #[test]
    fn test_size_estimates() {
        let catalog = AssetCatalog::embedded().unwrap();
        assert_eq!(catalog.estimated_size(AssetKind::Kext, "NVMeFix.kext"), 1024 * 1024);
        assert_eq!(catalog.estimated_size(AssetKind::Driver, "OpenRuntime.efi"), 256 * 1024);
        assert_eq!(catalog.estimated_size(AssetKind::Driver, "HfsPlus.efi"), 40960);
    }

    #[test]
    fn test_missing_fallback_rejected() {
        let yaml = "fallback:\n  core: \"{name}\"\n";
        let err = AssetCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::MissingFallback(AssetKind::Driver)));
    }

    #[test]
    fn test_required_flags() {
        let catalog = AssetCatalog::embedded().unwrap();
        assert!(catalog.is_required(AssetKind::Core, "Anything.efi"));
        assert!(catalog.is_required(AssetKind::Kext, "VirtualSMC.kext"));
        assert!(!catalog.is_required(AssetKind::Kext, "AppleALC.kext"));
        assert_eq!(catalog.category(AssetKind::Tool, "Unknown.efi"), "tool");
    }
}
