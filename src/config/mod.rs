use crate::catalog::AssetCatalog;
use crate::models::{DEFAULT_OPENCORE_VERSION, GenerationOptions, HardwareProfile, RequiredPolicy};
use crate::services::fetch::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// File name of the settings file inside the data directory.
pub const SETTINGS_FILE: &str = "efiforge.yaml";

/// Prefix of environment variables overriding settings (`EFIFORGE_DOWNLOAD_CONCURRENCY=4`).
pub const ENV_PREFIX: &str = "EFIFORGE";

/// Application settings.
///
/// Layered with the `config` crate: built-in defaults, then the optional
/// settings file, then `EFIFORGE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Downloads running at once
    pub download_concurrency: usize,

    pub request_timeout_secs: u64,

    pub user_agent: String,

    /// OpenCore release used when a request does not name one
    pub opencore_version: String,

    pub required_policy: RequiredPolicy,

    /// Replaces the embedded asset catalog when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<Utf8PathBuf>,

    pub log_dir: Utf8PathBuf,

    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_concurrency: DEFAULT_CONCURRENCY,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            opencore_version: DEFAULT_OPENCORE_VERSION.to_string(),
            required_policy: RequiredPolicy::default(),
            catalog_path: None,
            log_dir: Utf8PathBuf::from("logs"),
            debug: false,
        }
    }
}

impl Settings {
    /// Load settings from defaults, `file` (if it exists) and the process environment.
    pub fn load(file: Option<&Utf8Path>) -> Result<Self> {
        Self::build(file, None)
    }

    /// Like [`load`](Self::load) but reads overrides from `env` instead of the
    /// process environment.
    pub fn load_with_env(file: Option<&Utf8Path>, env: config::Map<String, String>) -> Result<Self> {
        Self::build(file, Some(env))
    }

    fn build(file: Option<&Utf8Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let defaults = Settings::default();

        let mut builder = config::Config::builder()
            .set_default("download_concurrency", defaults.download_concurrency as i64)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("opencore_version", defaults.opencore_version)?
            .set_default("required_policy", "required_only")?
            .set_default("log_dir", defaults.log_dir.as_str())?
            .set_default("debug", defaults.debug)?;

        if let Some(path) = file {
            if path.exists() {
                tracing::info!("Loading settings from {}", path);
            } else {
                tracing::debug!("Settings file {} not found, using defaults", path);
            }
            builder = builder
                .add_source(config::File::new(path.as_str(), config::FileFormat::Yaml).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let settings: Settings = builder
            .build()
            .context("Failed to assemble settings")?
            .try_deserialize()
            .context("Failed to parse settings")?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.download_concurrency == 0 {
            bail!("download_concurrency must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The configured catalog file, or the embedded one.
    pub fn catalog(&self) -> Result<AssetCatalog> {
        match &self.catalog_path {
            Some(path) => AssetCatalog::load(path)
                .with_context(|| format!("Failed to load asset catalog: {}", path)),
            None => AssetCatalog::embedded().context("Embedded asset catalog is malformed"),
        }
    }

    /// Fill in request options the caller left unset.
    pub fn apply_defaults(&self, mut options: GenerationOptions) -> GenerationOptions {
        if options
            .opencore_version
            .as_deref()
            .is_none_or(|v| v.trim().is_empty())
        {
            options.opencore_version = Some(self.opencore_version.clone());
        }
        options
    }
}

/// Loads and saves the YAML files efiforge works with.
///
/// - Settings (`efiforge.yaml`) in the data directory
/// - Hardware profiles, anywhere on disk or under `profiles/`
#[derive(Debug, Clone)]
pub struct ConfigManager {
    data_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    profiles_dir: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager rooted at `data_dir`, creating it if needed.
    pub fn new<P: AsRef<Utf8Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)
                .with_context(|| format!("Failed to create data directory: {}", data_dir))?;
        }

        Ok(Self {
            settings_path: data_dir.join(SETTINGS_FILE),
            profiles_dir: data_dir.join("profiles"),
            data_dir,
        })
    }

    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Load settings, falling back to defaults when the file is missing.
    pub fn load_settings(&self) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }
        Settings::load(Some(&self.settings_path))
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load a hardware profile from a YAML file.
    pub fn load_profile(&self, path: &Utf8Path) -> Result<HardwareProfile> {
        let file_contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read hardware profile: {}", path))?;

        let profile: HardwareProfile = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse hardware profile: {}", path))?;

        tracing::info!("Loaded hardware profile from {}", path);
        Ok(profile)
    }

    /// Save `profile` as `profiles/<name>.yaml` and return its path.
    pub fn save_profile(&self, name: &str, profile: &HardwareProfile) -> Result<Utf8PathBuf> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            bail!("Invalid profile name: {:?}", name);
        }

        if !self.profiles_dir.exists() {
            fs::create_dir_all(&self.profiles_dir).with_context(|| {
                format!("Failed to create profiles directory: {}", self.profiles_dir)
            })?;
        }

        let path = self.profiles_dir.join(format!("{}.yaml", name));
        let yaml_string = serde_yaml_ng::to_string(profile)
            .context("Failed to serialize hardware profile to YAML")?;

        fs::write(&path, yaml_string)
            .with_context(|| format!("Failed to write hardware profile: {}", path))?;

        tracing::info!("Saved hardware profile to {}", path);
        Ok(path)
    }

    /// Names of the saved profiles, sorted.
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        if !self.profiles_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in self
            .profiles_dir
            .read_dir_utf8()
            .with_context(|| format!("Failed to list profiles in {}", self.profiles_dir))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.extension() == Some("yaml") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
