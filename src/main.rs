//! efiforge - OpenCore EFI bundle generator
//!
//! Command line entry point.
//!
//! # Overview
//!
//! - `efiforge generate --profile machine.yaml` synthesizes `config.plist`, downloads
//!   every asset it references and writes the packaged `EFI/` archive
//! - `efiforge validate --profile machine.yaml` synthesizes and prints the validation report
//! - `efiforge manifest --profile machine.yaml` prints the assets a bundle would contain
//!
//! Settings come from `<data dir>/efiforge.yaml` and `EFIFORGE_*` environment
//! variables. Logs go to the settings' log directory.

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use efiforge::models::{ArchiveFormat, GenerationOptions, Phase, RequiredPolicy};
use efiforge::services::{AssetFetcher, ConfigSynthesizer, ManifestBuilder, validate};
use efiforge::{APP_NAME, ConfigManager, Orchestrator, Settings, StateChange, StateManager, VERSION};
use std::fs;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "efiforge", version)]
#[command(about = "Generate OpenCore EFI bundles from a hardware description", long_about = None)]
struct Cli {
    /// Directory holding efiforge.yaml and saved profiles
    #[arg(long, global = true, default_value = "efiforge-data")]
    data_dir: Utf8PathBuf,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Mirror log output to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build config.plist, download its assets and write the archive
    Generate(GenerateArgs),

    /// Synthesize config.plist and report problems
    Validate(ProfileArgs),

    /// List the assets a bundle for this profile would contain
    Manifest(ProfileArgs),
}

#[derive(Args)]
struct ProfileArgs {
    /// Hardware profile (YAML)
    #[arg(long)]
    profile: Utf8PathBuf,

    /// OpenCore release to target
    #[arg(long)]
    opencore_version: Option<String>,

    /// Seed for reproducible platform identity values
    #[arg(long)]
    seed: Option<u64>,

    /// Leave Misc.Tools out of the bundle
    #[arg(long)]
    no_tools: bool,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    profile: ProfileArgs,

    /// Directory the archive is written to
    #[arg(long, default_value = ".")]
    output: Utf8PathBuf,

    /// Archive format (zip or iso)
    #[arg(long, default_value = "zip")]
    format: ArchiveFormat,

    /// Archive file name instead of the generated one
    #[arg(long)]
    name: Option<String>,

    /// Add EFI-Summary.md and Installation-Guide.md
    #[arg(long)]
    docs: bool,

    /// XML plist merged onto the generated config.plist
    #[arg(long = "override")]
    overlay: Option<Utf8PathBuf>,

    /// Which download failures abort (all-items, required-only, best-effort)
    #[arg(long)]
    policy: Option<RequiredPolicy>,
}

impl ProfileArgs {
    fn options(&self, settings: &Settings) -> GenerationOptions {
        settings.apply_defaults(GenerationOptions {
            opencore_version: self.opencore_version.clone(),
            include_tools: !self.no_tools,
            seed: self.seed,
            ..GenerationOptions::default()
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.data_dir)?;
    let settings = config_manager.load_settings()?;

    let _guard = efiforge::logging::setup_logging_with_console(
        &settings.log_dir,
        cli.debug || settings.debug,
        cli.verbose,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("efiforge-worker")
        .build()?;

    let result = match cli.command {
        Command::Generate(args) => runtime.block_on(generate(&config_manager, &settings, args)),
        Command::Validate(args) => validate_profile(&config_manager, &settings, &args),
        Command::Manifest(args) => print_manifest(&config_manager, &settings, &args),
    };

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    tracing::info!("Shutdown complete");
    result
}

async fn generate(config_manager: &ConfigManager, settings: &Settings, args: GenerateArgs) -> Result<()> {
    let profile = config_manager.load_profile(&args.profile.profile)?;
    let options = GenerationOptions {
        include_documentation: args.docs,
        format: args.format,
        custom_name: args.name.clone(),
        ..args.profile.options(settings)
    };

    let fetcher = AssetFetcher::http(&settings.user_agent)
        .context("Failed to create HTTP client")?
        .with_concurrency(settings.download_concurrency)
        .with_timeout(settings.request_timeout());
    let manifest_builder = ManifestBuilder::new(settings.catalog()?);

    let state = StateManager::new();
    let printer = tokio::spawn(print_progress(state.subscribe()));

    let mut orchestrator = Orchestrator::new(state, manifest_builder, fetcher)
        .with_policy(args.policy.unwrap_or(settings.required_policy));

    let report = orchestrator.configure(profile, options)?;
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }

    if let Some(path) = &args.overlay {
        let overlay = plist::Value::from_file(path)
            .with_context(|| format!("Failed to read override plist: {}", path))?;
        orchestrator.apply_override(overlay)?;
    }

    let control = orchestrator.control();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, cancelling downloads...");
            control.cancel_all();
        }
    });

    let outcome = orchestrator.confirm_and_download().await;
    interrupt.abort();
    outcome?;

    let archive = orchestrator.package()?;
    drop(orchestrator);
    let _ = printer.await;

    write_archive(&args.output, &archive.file_name, &archive.bytes)?;
    println!(
        "Wrote {} ({} entries, {} bytes)",
        args.output.join(&archive.file_name),
        archive.entries.len(),
        archive.bytes.len()
    );
    Ok(())
}

fn write_archive(dir: &Utf8Path, file_name: &str, bytes: &[u8]) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir))?;
    }
    let path = dir.join(file_name);
    fs::write(&path, bytes).with_context(|| format!("Failed to write archive: {}", path))?;
    tracing::info!("Archive written to {}", path);
    Ok(())
}

fn validate_profile(config_manager: &ConfigManager, settings: &Settings, args: &ProfileArgs) -> Result<()> {
    let profile = config_manager.load_profile(&args.profile)?;
    let options = args.options(settings);

    let synthesis = ConfigSynthesizer::for_options(&options).synthesize(&profile, &options)?;
    let report = validate(&synthesis.document).with_warnings(synthesis.warnings);

    println!("SMBIOS:  {}", synthesis.identity.model);
    println!("Serial:  {}", synthesis.identity.serial);
    println!("MLB:     {}", synthesis.identity.mlb);
    println!("UUID:    {}", synthesis.identity.uuid);
    println!("ROM:     {}", synthesis.identity.rom_text());
    for error in &report.errors {
        println!("error:   {}", error);
    }
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }

    if !report.is_valid {
        bail!("{} validation error(s)", report.errors.len());
    }
    println!("Configuration is valid");
    Ok(())
}

fn print_manifest(config_manager: &ConfigManager, settings: &Settings, args: &ProfileArgs) -> Result<()> {
    let profile = config_manager.load_profile(&args.profile)?;
    let options = args.options(settings);

    let synthesis = ConfigSynthesizer::for_options(&options).synthesize(&profile, &options)?;
    let manifest = ManifestBuilder::new(settings.catalog()?).build(&synthesis.document, &options);

    for asset in &manifest {
        println!(
            "{:<40} {:>9} {:<8} {}",
            asset.id,
            asset.estimated_size_bytes,
            if asset.required { "required" } else { "" },
            asset.resolved_url
        );
    }
    println!("{} assets", manifest.len());
    Ok(())
}

/// Print phase changes and download progress until the request settles.
async fn print_progress(mut rx: broadcast::Receiver<StateChange>) {
    loop {
        match rx.recv().await {
            Ok(StateChange::PhaseChanged { to, .. }) => {
                eprintln!("==> {}", to);
                if to == Phase::Completed {
                    break;
                }
            }
            Ok(StateChange::OverallProgress { completed, total }) if total > 0 => {
                eprintln!("    {}/{} assets", completed, total);
            }
            Ok(StateChange::WarningRaised { message }) => eprintln!("warning: {}", message),
            Ok(StateChange::Failed { phase, message }) => {
                eprintln!("failed during {}: {}", phase, message);
                break;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Progress printer skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
