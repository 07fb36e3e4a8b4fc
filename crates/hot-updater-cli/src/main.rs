// crates/hot-updater-cli/src/main.rs
// ============================================================================
// Module: Hot Updater CLI Entry Point
// Description: Command dispatcher for the update server and offline tooling.
// Purpose: Serve updates and sign, verify, hash, resolve, and migrate locally.
// Dependencies: clap, hot-updater-config, hot-updater-core, hot-updater-server,
// hot-updater-signing, tokio, tracing-subscriber.
// ============================================================================

//! ## Overview
//! The `hot-updater` binary runs the HTTP update server and provides offline
//! helpers for release pipelines: hashing and signing artifacts, verifying
//! signatures, dry-running the resolution engine against a bundle file, and
//! applying storage migrations to a filesystem object store. Inputs are
//! untrusted and read with size limits.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use hot_updater_config::HotUpdaterConfig;
use hot_updater_config::LogConfig;
use hot_updater_config::LogFormat;
use hot_updater_core::Bundle;
use hot_updater_core::ChannelLayoutMigration;
use hot_updater_core::Migration;
use hot_updater_core::Migrator;
use hot_updater_core::RequestParts;
use hot_updater_core::ResolutionRequest;
use hot_updater_core::create_signed_file_hash;
use hot_updater_core::parse_signed_file_hash;
use hot_updater_core::resolve_update;
use hot_updater_core::sha256_file_hash;
use hot_updater_server::FsObjectStore;
use hot_updater_server::HotUpdaterServer;
use hot_updater_signing::sign_file_hash;
use hot_updater_signing::verify_file_hash;
use hot_updater_signing::verify_signed_file_hash;
use serde_json::json;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum artifact size accepted by `hash` and `sign --file`.
const MAX_ARTIFACT_BYTES: usize = 256 * 1024 * 1024;
/// Maximum PEM key file size.
const MAX_KEY_BYTES: usize = 64 * 1024;
/// Maximum bundle listing size accepted by `resolve`.
const MAX_BUNDLES_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "hot-updater", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the update server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print the SHA-256 file hash of an artifact.
    Hash(HashCommand),
    /// Sign a file hash with an RSA private key.
    Sign(SignCommand),
    /// Verify a file hash signature with an RSA public key.
    Verify(VerifyCommand),
    /// Resolve an update offline against a bundle listing.
    Resolve(ResolveCommand),
    /// Apply storage migrations to a filesystem object store.
    Migrate(MigrateCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to hot-updater.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to hot-updater.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for artifact hashing.
#[derive(Args, Debug)]
struct HashCommand {
    /// Artifact to hash.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
}

/// File hash taken literally or computed from an artifact.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct HashSource {
    /// Hex file hash, or an inline `sig:<b64>;sha256:<hex>` value.
    #[arg(long, value_name = "HEX")]
    hash: Option<String>,
    /// Artifact whose hash is computed.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

/// Arguments for signing.
#[derive(Args, Debug)]
struct SignCommand {
    /// Hash input.
    #[command(flatten)]
    source: HashSource,
    /// PKCS#8 private key PEM file.
    #[arg(long, value_name = "PATH")]
    private_key: PathBuf,
    /// Print the inline signed file hash instead of the bare signature.
    #[arg(long, action = ArgAction::SetTrue)]
    inline: bool,
}

/// Arguments for signature verification.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Hash input.
    #[command(flatten)]
    source: HashSource,
    /// Base64 signature; omit when `--hash` carries an inline signature.
    #[arg(long, value_name = "BASE64")]
    signature: Option<String>,
    /// SPKI public key PEM file.
    #[arg(long, value_name = "PATH")]
    public_key: PathBuf,
}

/// Arguments for offline resolution.
#[derive(Args, Debug)]
struct ResolveCommand {
    /// JSON file holding an array of bundles.
    #[arg(long, value_name = "PATH")]
    bundles: PathBuf,
    /// Requesting platform (`ios` or `android`).
    #[arg(long)]
    platform: String,
    /// Installed bundle id.
    #[arg(long)]
    bundle_id: String,
    /// Installed app version.
    #[arg(long, conflicts_with = "fingerprint_hash")]
    app_version: Option<String>,
    /// Native build fingerprint.
    #[arg(long)]
    fingerprint_hash: Option<String>,
    /// Release channel.
    #[arg(long)]
    channel: Option<String>,
    /// Native build floor.
    #[arg(long)]
    min_bundle_id: Option<String>,
    /// Device identifier for rollout gating.
    #[arg(long)]
    device_id: Option<String>,
}

/// Arguments for storage migrations.
#[derive(Args, Debug)]
struct MigrateCommand {
    /// Object store root directory.
    #[arg(long, value_name = "DIR")]
    root: PathBuf,
    /// Report what would run without writing.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => command_config_validate(&command),
        Commands::Hash(command) => command_hash(&command),
        Commands::Sign(command) => command_sign(&command),
        Commands::Verify(command) => command_verify(&command),
        Commands::Resolve(command) => command_resolve(&command),
        Commands::Migrate(command) => command_migrate(&command),
    }
}

// ============================================================================
// SECTION: Serve and Config
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = HotUpdaterConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    init_tracing(&config.log)?;
    let server = tokio::task::spawn_blocking(move || HotUpdaterServer::from_config(&config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = HotUpdaterConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&format!(
        "config ok: store={} adapters={}",
        config.store.store_type.as_str(),
        config.storage.len()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Installs the global tracing subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log: &LogConfig) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .map_err(|err| CliError::new(format!("invalid log level: {err}")))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = match log.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    result.map_err(|err| CliError::new(format!("failed to initialize logging: {err}")))
}

// ============================================================================
// SECTION: Integrity Commands
// ============================================================================

/// Executes the `hash` command.
fn command_hash(command: &HashCommand) -> CliResult<ExitCode> {
    let bytes = read_file_limited(&command.file, MAX_ARTIFACT_BYTES)?;
    write_stdout_line(&sha256_file_hash(&bytes))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `sign` command.
fn command_sign(command: &SignCommand) -> CliResult<ExitCode> {
    let file_hash = resolve_hash(&command.source)?;
    let file_hash = parse_signed_file_hash(&file_hash)
        .map_err(|err| CliError::new(err.to_string()))?
        .file_hash;
    let private_key = read_text_limited(&command.private_key, MAX_KEY_BYTES)?;
    let signature = sign_file_hash(&file_hash, &private_key)
        .map_err(|err| CliError::new(format!("signing failed: {err}")))?;
    if command.inline {
        let signed = create_signed_file_hash(&file_hash, &signature)
            .map_err(|err| CliError::new(err.to_string()))?;
        write_stdout_line(&signed)?;
    } else {
        write_stdout_line(&signature)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `verify` command; an invalid signature exits with failure.
fn command_verify(command: &VerifyCommand) -> CliResult<ExitCode> {
    let file_hash = resolve_hash(&command.source)?;
    let public_key = read_text_limited(&command.public_key, MAX_KEY_BYTES)?;
    let valid = match command.signature.as_deref() {
        Some(signature) => verify_file_hash(&file_hash, signature, &public_key),
        None => verify_signed_file_hash(&file_hash, &public_key),
    };
    if valid {
        write_stdout_line("signature valid")?;
        Ok(ExitCode::SUCCESS)
    } else {
        write_stdout_line("signature invalid")?;
        Ok(ExitCode::FAILURE)
    }
}

/// Returns the literal hash or the hash of the named artifact.
fn resolve_hash(source: &HashSource) -> CliResult<String> {
    match (&source.hash, &source.file) {
        (Some(hash), _) => Ok(hash.trim().to_string()),
        (None, Some(path)) => Ok(sha256_file_hash(&read_file_limited(path, MAX_ARTIFACT_BYTES)?)),
        (None, None) => Err(CliError::new("either --hash or --file is required")),
    }
}

// ============================================================================
// SECTION: Resolve Command
// ============================================================================

/// Executes the `resolve` command, printing the update or `null`.
fn command_resolve(command: &ResolveCommand) -> CliResult<ExitCode> {
    let request = ResolutionRequest::from_parts(&RequestParts {
        platform: Some(&command.platform),
        bundle_id: Some(&command.bundle_id),
        min_bundle_id: command.min_bundle_id.as_deref(),
        channel: command.channel.as_deref(),
        app_version: command.app_version.as_deref(),
        fingerprint_hash: command.fingerprint_hash.as_deref(),
        device_id: command.device_id.as_deref(),
    })
    .map_err(|err| CliError::new(err.to_string()))?;
    let bundles = load_bundles(&command.bundles)?;
    let info = resolve_update(&bundles, &request);
    let output = serde_json::to_string_pretty(&info)
        .map_err(|err| CliError::new(format!("failed to render result: {err}")))?;
    write_stdout_line(&output)?;
    Ok(ExitCode::SUCCESS)
}

/// Reads and validates a JSON array of bundles.
fn load_bundles(path: &Path) -> CliResult<Vec<Bundle>> {
    let bytes = read_file_limited(path, MAX_BUNDLES_BYTES)?;
    let bundles: Vec<Bundle> = serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(format!("invalid bundles file {}: {err}", path.display()))
    })?;
    for bundle in &bundles {
        bundle.validate().map_err(|err| CliError::new(err.to_string()))?;
    }
    Ok(bundles)
}

// ============================================================================
// SECTION: Migrate Command
// ============================================================================

/// Executes the `migrate` command.
fn command_migrate(command: &MigrateCommand) -> CliResult<ExitCode> {
    init_tracing(&LogConfig::default())?;
    let store = FsObjectStore::new(&command.root)
        .map_err(|err| CliError::new(format!("failed to open object store: {err}")))?;
    let migrations: [&dyn Migration; 1] = [&ChannelLayoutMigration];
    let report = Migrator::new(&store)
        .dry_run(command.dry_run)
        .run(&migrations)
        .map_err(|err| CliError::new(err.to_string()))?;
    let output = json!({
        "applied": report.applied,
        "skipped": report.skipped,
        "dryRun": report.dry_run,
    });
    write_stdout_line(&output.to_string())?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: I/O Helpers
// ============================================================================

/// Reads a file, failing when it exceeds `limit` bytes.
fn read_file_limited(path: &Path, limit: usize) -> CliResult<Vec<u8>> {
    let file = fs::File::open(path)
        .map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))?;
    let mut bytes = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    file.take(cap)
        .read_to_end(&mut bytes)
        .map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))?;
    if bytes.len() > limit {
        return Err(CliError::new(format!(
            "{} exceeds size limit of {limit} bytes",
            path.display()
        )));
    }
    Ok(bytes)
}

/// Reads a UTF-8 text file with a size limit.
fn read_text_limited(path: &Path, limit: usize) -> CliResult<String> {
    String::from_utf8(read_file_limited(path, limit)?)
        .map_err(|_| CliError::new(format!("{} must be utf-8", path.display())))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "error: {message}");
    ExitCode::FAILURE
}
