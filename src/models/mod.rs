//! Data models for efiforge.
//!
//! - [`HardwareProfile`]: the declarative machine description everything starts from
//! - [`GenerationOptions`]: per-request switches (OpenCore version, archive format, seed)
//! - [`ConfigDocument`]: the typed `config.plist` tree
//! - [`AssetDescriptor`] / [`DownloadState`]: manifest entries and their transfer progress
//! - [`GenerationState`]: the per-request record held by [`StateManager`](crate::state::StateManager)
//!
//! All models derive `Serialize`/`Deserialize`; hardware profiles and options are
//! read from YAML with camelCase keys.

pub mod asset;
pub mod document;
pub mod generation_state;
pub mod hardware;
pub mod options;

pub use asset::{
    AssetDescriptor, AssetKind, DownloadState, DownloadStatus, asset_id, parse_asset_id,
};
pub use document::*;
pub use generation_state::{
    ArtifactInfo, GenerationState, Phase, RequiredPolicy, Step, StepStatus, Steps,
};
pub use hardware::{
    Audio, Cpu, CpuVendor, Drive, FormFactor, Gpu, GpuDevice, HardwareProfile, Memory,
    Motherboard, Network, NetworkDevice, Storage,
};
pub use options::{ArchiveFormat, DEFAULT_OPENCORE_VERSION, GenerationOptions};
