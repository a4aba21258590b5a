use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use catalog_url_rewrite::domain::{EntityId, EntityKind, ReconcileReport, ReconciliationRequest};
use catalog_url_rewrite::infrastructure::{
    AppConfig, DatabaseConnection, init_logging_with_config, sqlite_indexer,
};

#[derive(Parser)]
#[command(name = "catalog-url-rewrite")]
#[command(about = "Remove URL rewrites orphaned by deleted categories and products")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user config when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `database.url`
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Override `reconcile.batch_size`
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the catalog and rewrite tables if missing
    Migrate,
    /// Reconcile every rewrite of one kind, or of all configured kinds
    Full {
        #[arg(long)]
        kind: Option<EntityKind>,
    },
    /// Reconcile against the given entity ids only
    List {
        #[arg(long)]
        kind: EntityKind,
        /// Entity ids; non-numeric values count as 0
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Reconcile against a single entity id
    Row {
        #[arg(long)]
        kind: EntityKind,
        id: String,
    },
}

/// Resolve and load the configuration, returning the file it came from
fn load_config(cli: &Cli) -> Result<(AppConfig, Option<PathBuf>)> {
    let path = cli
        .config
        .clone()
        .or_else(|| AppConfig::default_path().filter(|path| path.exists()));

    let mut config = AppConfig::load(path.as_deref())
        .with_context(|| format!("Failed to load configuration from {path:?}"))?;

    if let Some(url) = &cli.database_url {
        config.database.url.clone_from(url);
    }
    if let Some(batch_size) = cli.batch_size {
        config.reconcile.batch_size = batch_size;
    }
    config.validate()?;

    Ok((config, path))
}

fn log_reports(reports: &[ReconcileReport]) {
    for report in reports {
        info!(
            kind = %report.kind,
            mode = %report.mode,
            candidate_ids = report.candidate_ids,
            live_ids = report.live_ids,
            orphaned = report.orphaned,
            deleted = report.deleted,
            batches = report.batches,
            "url rewrite reconciliation report"
        );
    }
}

async fn run(command: Command, config: &AppConfig) -> Result<Vec<ReconcileReport>> {
    let db = DatabaseConnection::new(&config.database.url, config.database.max_connections).await?;
    let indexer = sqlite_indexer(db.pool().clone(), &config.reconcile)?;

    let reports = match command {
        Command::Migrate => {
            db.migrate().await?;
            info!(database_url = %config.database.url, "schema ready");
            Vec::new()
        }
        Command::Full { kind: None } => indexer.reindex_all().await?,
        Command::Full { kind: Some(kind) } => {
            vec![indexer.reconciler(kind)?.reconcile_full().await?]
        }
        Command::List { kind, ids } => {
            let request = ReconciliationRequest::from_raw(&ids);
            vec![indexer.reconciler(kind)?.reconcile(&request).await?]
        }
        Command::Row { kind, id } => {
            vec![indexer.reconciler(kind)?.reconcile_row(EntityId::coerce(&id)).await?]
        }
    };

    Ok(reports)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(&cli)?;
    init_logging_with_config(&config.logging)?;

    if let Some(path) = &config_path {
        info!("Loaded configuration from: {:?}", path);
    }
    let kinds: Vec<EntityKind> = config.reconcile.kinds.iter().map(|d| d.kind).collect();
    info!(?kinds, batch_size = config.reconcile.batch_size, "starting url rewrite reconciliation");

    match run(cli.command, &config).await {
        Ok(reports) => {
            log_reports(&reports);
            Ok(())
        }
        Err(e) => {
            error!("url rewrite reconciliation failed: {e:#}");
            Err(e)
        }
    }
}
