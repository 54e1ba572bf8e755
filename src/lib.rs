// efiforge - OpenCore EFI bundle generator
//
// This is the library crate containing the generation pipeline and its data model.
// The binary crate (main.rs) provides the command line entry point.

pub mod catalog;
pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use catalog::AssetCatalog;
pub use config::{ConfigManager, Settings};
pub use models::{ConfigDocument, GenerationOptions, HardwareProfile};
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
