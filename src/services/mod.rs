//! Services module - the generation pipeline, one service per stage.
//!
//! The services are framework-agnostic: no terminal output and no global
//! state. Every service is constructed per request and handed what it needs.
//!
//! # Components
//!
//! - [`ConfigSynthesizer`]: hardware profile → [`ConfigDocument`](crate::models::ConfigDocument)
//!   plus [`PlatformIdentity`]
//! - [`merge`]: structural merge of caller overrides onto a document
//! - [`validation`]: structural checks producing a [`ValidationReport`]
//! - [`ManifestBuilder`]: document → ordered, deduplicated asset list
//! - [`AssetFetcher`]: bounded-concurrency downloads with progress and cancellation
//! - [`ArchiveAssembler`]: document + downloaded bytes → `EFI/` bundle
//!
//! # Usage Example
//!
//! ```ignore
//! use efiforge::services::{AssetFetcher, ConfigSynthesizer, FetchControl, ManifestBuilder, NoopObserver};
//!
//! let synthesis = ConfigSynthesizer::seeded(7).synthesize(&profile, &options)?;
//! let manifest = ManifestBuilder::with_embedded_catalog()?.build(&synthesis.document, &options);
//!
//! let fetcher = AssetFetcher::http(DEFAULT_USER_AGENT)?;
//! let outcome = fetcher.fetch(&manifest, &FetchControl::new(), &NoopObserver).await;
//! ```
//!
//! The [`Orchestrator`](crate::orchestrator::Orchestrator) runs these stages
//! in order and tracks progress.

pub mod archive;
pub mod fetch;
pub mod manifest;
pub mod merge;
pub mod synthesis;
pub mod validation;

pub use archive::{ArchiveAssembler, AssembledArchive, PackagingError, PackagingWarning};
pub use fetch::{
    AssetFetcher, AssetTransport, DEFAULT_USER_AGENT, FetchControl, FetchError, FetchOutcome,
    NoopObserver, ProgressObserver, ReqwestTransport, TransferBody,
};
pub use manifest::ManifestBuilder;
pub use synthesis::{ConfigSynthesizer, PlatformIdentity, Synthesis, SynthesisError};
pub use validation::{ValidationError, ValidationReport, ValidationWarning, validate};
