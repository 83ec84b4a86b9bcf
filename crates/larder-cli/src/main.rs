//! Larder - recipe resolution and installation
//!
//! Usage:
//!   larder install                    # install recommendations for this host
//!   larder install --recipe redis     # install named recipes
//!   larder recommend                  # list recommendations for this host
//!   larder show ./recipes/redis.yml   # inspect one recipe document

mod output;
mod prompt;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use larder_core::config::SourceKind;
use larder_core::context::AppContext;
use larder_core::install::{NonInteractivePrompter, Prompter, RecipeInstaller};
use larder_core::resolve::ResolutionDepth;
use larder_core::source::RecipeFetcher;
use larder_core::types::DiscoveryManifest;

use crate::output::ConsoleStatus;
use crate::prompt::TerminalPrompter;

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "Resolve and install recipes for this host", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Credentials profile to use
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install recipes (named, by path, or the host's recommendations)
    Install(InstallArgs),

    /// List recipes recommended for this host
    Recommend {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Normalize and display a single recipe document
    Show {
        /// Path or URL of the recipe
        location: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct InstallArgs {
    /// Recipe file path or URL (repeatable; takes priority over --recipe)
    #[arg(long = "recipe-path", value_name = "PATH")]
    recipe_paths: Vec<String>,

    /// Recipe name to install (repeatable)
    #[arg(long = "recipe", value_name = "NAME")]
    recipes: Vec<String>,

    /// Do not install the infrastructure agent
    #[arg(long)]
    skip_infra: bool,

    /// Follow dependencies of dependencies
    #[arg(long)]
    transitive: bool,

    /// Stop at the first failed recipe
    #[arg(long)]
    fail_fast: bool,

    /// Never prompt; missing inputs without defaults fail
    #[arg(long)]
    no_input: bool,

    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args)]
struct SourceArgs {
    /// Discovery manifest (JSON); defaults to a minimal manifest for this host
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Read recipes from a local directory
    #[arg(long, value_name = "DIR", conflicts_with = "service_url")]
    recipes_dir: Option<PathBuf>,

    /// Query a recommendation service endpoint
    #[arg(long, value_name = "URL")]
    service_url: Option<String>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "larder_core=debug,larder_cli=debug,info"
    } else {
        "larder_core=info,larder_cli=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cancel = CancellationToken::new();
    watch_ctrl_c(cancel.clone());

    let mut ctx = AppContext::from_default_dir()?.with_profile(cli.profile);

    match cli.command {
        Commands::Install(args) => run_install(&mut ctx, args, &cancel),
        Commands::Recommend { source, format } => run_recommend(&mut ctx, source, format, &cancel),
        Commands::Show { location, format } => run_show(&ctx, &location, format, &cancel),
    }
}

/// Cancel the token on the first Ctrl-C.
fn watch_ctrl_c(cancel: CancellationToken) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "could not install Ctrl-C handler");
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling...");
                cancel.cancel();
            }
        });
    });
}

fn run_install(ctx: &mut AppContext, args: InstallArgs, cancel: &CancellationToken) -> Result<()> {
    apply_source_overrides(ctx, &args.source)?;
    let manifest = load_manifest(args.source.manifest.as_deref())?;

    let mut options = ctx
        .install_options()
        .with_recipe_paths(args.recipe_paths)
        .with_recipe_names(args.recipes);
    if args.skip_infra {
        options = options.with_skip_infra(true);
    }
    if args.transitive {
        options = options.with_resolution(ResolutionDepth::Transitive);
    }
    if args.fail_fast {
        options = options.with_fail_fast(true);
    }

    let source = ctx.recipe_source()?;
    let loader = ctx.file_fetcher()?;
    let executor = ctx.task_executor();
    let prompter: Box<dyn Prompter> = if args.no_input || !console::user_attended() {
        Box::new(NonInteractivePrompter)
    } else {
        Box::new(TerminalPrompter::new())
    };
    let status = ConsoleStatus;

    let installer = RecipeInstaller::new(&source, &loader, &executor, prompter.as_ref())
        .with_status(&status)
        .with_license_key(ctx.license_key());

    let report = installer.install(&manifest, &options, cancel)?;
    output::print_report(&report);

    if !report.is_success() {
        anyhow::bail!("{} recipe(s) failed to install", report.failed().count());
    }
    Ok(())
}

fn run_recommend(
    ctx: &mut AppContext,
    args: SourceArgs,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    apply_source_overrides(ctx, &args)?;
    let manifest = load_manifest(args.manifest.as_deref())?;

    let source = ctx.recipe_source()?;
    let recipes = source
        .fetch_recommendations(&manifest, cancel)
        .context("Failed to fetch recommendations")?;

    match format {
        OutputFormat::Table => output::print_recipe_table(&recipes),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&recipes)?),
    }
    Ok(())
}

fn run_show(
    ctx: &AppContext,
    location: &str,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let recipe = ctx
        .file_fetcher()?
        .load(location, cancel)
        .with_context(|| format!("Failed to load recipe from {}", location))?;

    match format {
        OutputFormat::Table => output::print_recipe_details(&recipe),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&recipe)?),
    }
    Ok(())
}

fn apply_source_overrides(ctx: &mut AppContext, args: &SourceArgs) -> Result<()> {
    let source = &mut ctx.config_mut().source;
    if let Some(dir) = &args.recipes_dir {
        source.kind = SourceKind::Local;
        source.directory = Some(dir.clone());
    }
    if let Some(url) = &args.service_url {
        source.kind = SourceKind::Service;
        source.service_url =
            Some(url.parse().with_context(|| format!("Invalid service URL: {}", url))?);
    }
    Ok(())
}

fn load_manifest(path: Option<&Path>) -> Result<DiscoveryManifest> {
    let Some(path) = path else {
        let manifest = DiscoveryManifest::from_host();
        debug!(os = %manifest.os, arch = %manifest.arch, "using host manifest");
        return Ok(manifest);
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    DiscoveryManifest::from_json(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}
