use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use fp_pipeline::app::IdentityStorePort;
use fp_pipeline::config::{Config, SupabaseCredentials};
use fp_pipeline::infra::SupabaseStore;
use fp_pipeline::logging;
use fp_pipeline::observability::metrics;
use fp_pipeline::pipeline::{ImportStats, Importer, Exporter, SyncStats};
use fp_pipeline::storage::InMemoryStore;

#[derive(Parser)]
#[command(name = "fp_pipeline")]
#[command(about = "FamousPeople vault pipeline: CSV import and Supabase sync")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML config file (defaults to fp-pipeline.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn the CSV export into Markdown documents
    Import {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Rows per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Sync vault documents to Supabase
    Export {
        #[arg(long)]
        vault: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        workers: Option<usize>,
        /// Parse and batch against an in-memory store instead of Supabase
        #[arg(long)]
        dry_run: bool,
    },
    /// Import, then export the same vault
    Run {
        #[arg(long)]
        dry_run: bool,
    },
}

fn print_import_summary(stats: &ImportStats) {
    println!("\n📄 Import Results:");
    println!("   Rows read: {}", stats.rows);
    println!("   Created: {}", stats.created);
    println!("   Skipped: {}", stats.skipped);
    for (reason, count) in &stats.skip_reasons {
        println!("     - {}: {}", reason, count);
    }
    println!("   Malformed: {}", stats.malformed);
    println!("   Errors: {}", stats.errors);
}

fn print_sync_summary(stats: &SyncStats) {
    println!("\n🔄 Sync Results:");
    println!("   Processed: {}", stats.processed);
    println!("   Synced: {}", stats.synced);
    println!("   Skipped: {}", stats.skipped);
    println!("   Errors: {}", stats.errors);
    println!("   Relationship errors: {}", stats.relationship_errors);
    println!("   Batches: {}", stats.batches);
}

fn run_import(config: &Config) -> anyhow::Result<ImportStats> {
    let importer = Importer::new(&config.import);
    let stats = importer
        .run(&config.import.csv_path)
        .context("import failed")?;
    print_import_summary(&stats);
    Ok(stats)
}

/// `credentials` is `None` for a dry run.
async fn run_export(
    config: &Config,
    credentials: Option<&SupabaseCredentials>,
) -> anyhow::Result<SyncStats> {
    let store: Arc<dyn IdentityStorePort> = match credentials {
        Some(credentials) => Arc::new(SupabaseStore::new(credentials)?),
        None => {
            info!("Dry run: syncing into an in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let exporter = Exporter::new(store, config.export.clone());
    let stats = exporter.run().await.context("export failed")?;
    print_sync_summary(&stats);
    Ok(stats)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    metrics::init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    let outcome = match cli.command {
        Commands::Import { input, output, chunk_size } => {
            if let Some(input) = input {
                config.import.csv_path = input;
            }
            if let Some(output) = output {
                config.import.output_dir = output;
            }
            if let Some(n) = chunk_size {
                config.import.chunk_size = n;
            }
            config.clamp();
            run_import(&config).map(|_| ())
        }
        Commands::Export { vault, batch_size, workers, dry_run } => {
            if let Some(vault) = vault {
                config.export.vault_path = vault;
            }
            if let Some(n) = batch_size {
                config.export.batch_size = n;
            }
            if let Some(n) = workers {
                config.export.max_workers = n;
            }
            config.clamp();
            let credentials = config.export_credentials(dry_run)?;
            run_export(&config, credentials.as_ref()).await.map(|_| ())
        }
        Commands::Run { dry_run } => {
            config.clamp();
            config.export.vault_path = config.import.output_dir.clone();
            // Unusable credentials abort before the vault is written
            let credentials = config.export_credentials(dry_run)?;
            match run_import(&config) {
                Ok(_) => run_export(&config, credentials.as_ref()).await.map(|_| ()),
                Err(e) => Err(e),
            }
        }
    };

    if let Some(url) = config.metrics.pushgateway_url.as_deref() {
        let instance = std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string());
        metrics::push_to_gateway(url, &instance).await;
    }

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}
