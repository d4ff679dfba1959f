//! Halldyll queues CLI entrypoint.
//!
//! This is the main entrypoint for the halldyll-queues command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use halldyll_queues::aws::{AwsApiTarget, SqsClient};
use halldyll_queues::cli::{Cli, Commands, OutputFormatter, StateCommands};
use halldyll_queues::config::{
    find_config_file, ConfigParser, ConfigValidator, QueuesConfig, StateBackend,
};
use halldyll_queues::error::{HalldyllError, Result};
use halldyll_queues::reconciler::Reconciler;
use halldyll_queues::state::{LocalStateStore, S3StateStore, StateStore};
use halldyll_queues::target::{DryRunTarget, Target};
use halldyll_queues::terraform::TerraformTarget;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` wins over the verbosity flag when set.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings),
        Commands::Plan => cmd_plan(cli.config.as_ref(), &formatter).await,
        Commands::Apply { yes } => cmd_apply(cli.config.as_ref(), yes, &formatter).await,
        Commands::Export { out } => cmd_export(cli.config.as_ref(), out, &formatter).await,
        Commands::State { command } => cmd_state(cli.config.as_ref(), command, &formatter).await,
    }
}

/// Validate configuration.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    let result = ConfigValidator::new().validate(&config)?;

    if result.is_valid() {
        eprintln!("Configuration is valid!");
        if show_warnings && !result.warnings.is_empty() {
            eprintln!("\nWarnings:");
            for warning in &result.warnings {
                eprintln!("  - {warning}");
            }
        }
    }

    eprintln!("\nConfiguration summary:");
    eprintln!("  Project: {}", config.project.name);
    eprintln!(
        "  Region: {}",
        config.project.region.as_deref().unwrap_or("(default)")
    );
    eprintln!("  Queues: {}", config.queues.len());
    eprintln!("  Warnings: {}", result.warning_count());

    Ok(())
}

/// Show pending changes without applying them.
async fn cmd_plan(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, base_dir, state_store) = load_config_and_state(config_path).await?;
    let client = SqsClient::new(config.project.region.as_deref()).await;

    let mut target = Target::DryRun(DryRunTarget::new(Arc::new(client)));
    let reconciler = Reconciler::new(&config, &base_dir, &state_store);
    reconciler.reconcile(&mut target).await?;

    if let Target::DryRun(dry_run) = &target {
        println!("{}", formatter.format_plan(dry_run.pending()));
    }

    Ok(())
}

/// Create missing queues.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, base_dir, state_store) = load_config_and_state(config_path).await?;
    let cloud = Arc::new(SqsClient::new(config.project.region.as_deref()).await);

    let mut dry_run = Target::DryRun(DryRunTarget::new(cloud.clone()));
    Reconciler::new(&config, &base_dir, &state_store)
        .reconcile(&mut dry_run)
        .await?;

    let (creates, skipped) = match &dry_run {
        Target::DryRun(target) => (target.creates(), target.pending().len()),
        _ => (Vec::new(), 0),
    };
    let skipped = skipped.saturating_sub(creates.len());

    if skipped > 0 {
        eprintln!("{skipped} existing queue(s) differ; apply only creates, use `export` to converge them.");
    }

    if creates.is_empty() {
        eprintln!("No queues to create.");
        return Ok(());
    }

    eprintln!("{}", formatter.format_plan(&creates));

    if !auto_approve {
        eprint!("Do you want to apply this plan? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let mut target = Target::Aws(AwsApiTarget::new(cloud));
    let result = Reconciler::new(&config, &base_dir, &state_store)
        .reconcile(&mut target)
        .await?;

    println!("{}", formatter.format_reconciliation(&result));

    Ok(())
}

/// Write Terraform configuration.
async fn cmd_export(
    config_path: Option<&PathBuf>,
    out: Option<PathBuf>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, base_dir, state_store) = load_config_and_state(config_path).await?;
    let out_dir = out.unwrap_or_else(|| config.terraform_output_dir(&base_dir));

    let mut target = Target::Terraform(TerraformTarget::new());
    let result = Reconciler::new(&config, &base_dir, &state_store)
        .reconcile(&mut target)
        .await?;
    debug!("Exported {} queue(s)", result.touched().len());

    if let Target::Terraform(terraform) = &target {
        let written = terraform.finish(&out_dir).await?;
        println!("{}", formatter.format_export(&written));
    }

    Ok(())
}

/// State management commands.
async fn cmd_state(
    config_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, _base_dir, state_store) = load_config_and_state(config_path).await?;

    match command {
        StateCommands::Show => {
            if let Some(state) = state_store.load().await? {
                println!("{}", formatter.format_state(&state));
            } else {
                eprintln!("No state found.");
            }
        }
        StateCommands::Forget { queue } => {
            let Some(mut state) = state_store.load().await? else {
                eprintln!("No state found.");
                return Ok(());
            };

            match state.forget(&queue) {
                Some(identity) => {
                    state_store.save(&state).await?;
                    eprintln!("Forgot {queue} ({}).", identity.arn);
                }
                None => eprintln!("No identity stored for {queue}."),
            }
        }
        StateCommands::Clear { yes } => {
            if !state_store.exists().await? {
                eprintln!("No state found.");
                return Ok(());
            }

            if !yes {
                eprint!("Stored queue identities will be forgotten. Continue? [y/N]: ");
                std::io::stderr().flush()?;

                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;

                if !input.trim().eq_ignore_ascii_case("y") {
                    eprintln!("Clear cancelled.");
                    return Ok(());
                }
            }

            state_store.delete().await?;
            eprintln!("State cleared ({} backend).", state_store.backend_type());
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Directory relative paths in the configuration are resolved against.
fn config_dir(config_file: &Path) -> PathBuf {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Loads configuration and creates the matching state store.
async fn load_config_and_state(
    config_path: Option<&PathBuf>,
) -> Result<(QueuesConfig, PathBuf, Box<dyn StateStore>)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let base_dir = config_dir(&config_file);
    let parser = ConfigParser::new().with_base_path(&base_dir);
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    ConfigValidator::new().validate(&config)?;

    let state_store: Box<dyn StateStore> = match config.state.backend {
        StateBackend::Local => match config.state.path.as_deref() {
            Some(path) => Box::new(LocalStateStore::with_state_path(base_dir.join(path))),
            None => Box::new(LocalStateStore::with_base_dir(base_dir.join(".halldyll"))),
        },
        StateBackend::S3 => {
            let bucket = config
                .state
                .bucket
                .as_deref()
                .ok_or_else(|| HalldyllError::internal("S3 bucket not configured"))?;
            let prefix = config.state.prefix.as_deref();
            let region = config
                .state
                .region
                .as_deref()
                .or(config.project.region.as_deref());
            Box::new(S3StateStore::new(bucket, prefix, region).await)
        }
    };

    Ok((config, base_dir, state_store))
}
