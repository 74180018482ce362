//! modcat CLI entry point

use clap::{Parser, Subcommand};
use modcat::{
    config::Config,
    error::{Error, Result},
    github::GithubClient,
    store::CatalogDb,
    sync::{
        print_link_stats, print_run_report, print_sync_stats, reconcile_links, run_full_sync,
        sync_modules, sync_pipelines,
    },
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "modcat")]
#[command(version, about = "Synchronize a workflow module and pipeline catalog from GitHub into SQLite", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full synchronization (modules, pipelines, links)
    Run,

    /// Refresh the module catalog only
    Modules,

    /// Refresh the pipeline catalog only
    Pipelines,

    /// Reconcile pipeline-module links only (reads keys produced by the
    /// catalog refreshes, so run those first)
    Links,

    /// Show catalog row counts
    Status,

    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle init specially (doesn't need an existing config)
    if matches!(cli.command, Commands::Init { .. }) {
        return handle_init(cli);
    }

    let config = load_config(cli.config.as_deref())?;

    let db = CatalogDb::connect(&config.storage.db_file).await?;
    db.ensure_schema().await?;
    let client = GithubClient::new(&config.github)?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Run => {
            let report = run_full_sync(&config, &client, &db).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_run_report(&report);
            }
        }

        Commands::Modules => {
            let stats = sync_modules(&config, &client, &db).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_sync_stats("module", &stats);
            }
        }

        Commands::Pipelines => {
            let stats = sync_pipelines(&config, &client, &db).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_sync_stats("pipeline", &stats);
            }
        }

        Commands::Links => {
            let stats = reconcile_links(&config, &client, &db).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_link_stats(&stats);
            }
        }

        Commands::Status => {
            let counts = db.counts().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                println!("Catalog status:");
                println!("  Config:    {}", config.config_path.display());
                println!("  Database:  {}", config.storage.db_file.display());
                println!("  Modules:   {}", counts.modules);
                println!("  Pipelines: {}", counts.pipelines);
                println!("  Links:     {}", counts.links);
            }
        }
    }

    Ok(())
}

fn handle_init(cli: Cli) -> Result<()> {
    let Commands::Init { force } = cli.command else {
        unreachable!()
    };

    let config_path = cli.config.unwrap_or_else(Config::default_config_path);
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config file already exists at {}; use --force to overwrite",
            config_path.display()
        )));
    }

    let config = Config::default();
    config.save(&config_path)?;

    println!("✓ modcat initialized");
    println!("  Config: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Edit the config (organization, ignored_repos)");
    println!("  2. Export an API token in the configured variable (GITHUB_TOKEN)");
    println!("  3. Run the sync: modcat run");

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}; run 'modcat init' first",
            config_path.display()
        )));
    }

    Config::load(&config_path)
}
