//! Petitions service entry point

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use petitions::backfill::BackfillSignatureUuids;
use petitions::config::AppConfig;
use petitions::logging::init_structured_logging;
use petitions::mailer::{LogDelivery, MailQueue, run_delivery_worker};
use petitions::store::PetitionStore;
use petitions::web::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "petitions")]
#[command(about = "Petition creation and confirmation service")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $PETITIONS_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve,
    /// Assign uuids to signatures that have none
    BackfillUuids(BackfillArgs),
    /// Load and validate the configuration, then print it
    CheckConfig,
}

#[derive(Args)]
struct BackfillArgs {
    /// Signatures read per batch (defaults to backfill_batch_size)
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_structured_logging(&config.environment);

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::BackfillUuids(args) => {
            let store = open_store(&config)?;
            let batch_size = args.batch_size.unwrap_or(config.backfill_batch_size);
            let report = BackfillSignatureUuids::new(batch_size).perform(&store)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::CheckConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<PetitionStore> {
    PetitionStore::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path.display()
        )
    })
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let store = Arc::new(open_store(&config)?);
    let constituencies = Arc::new(config.constituency_lookup());
    info!(
        constituencies = constituencies.len(),
        "constituency table loaded"
    );

    let (queue, receiver) = MailQueue::new(config.mail_from.clone());
    let worker = tokio::spawn(run_delivery_worker(receiver, LogDelivery));

    let state = AppState::new(&config, store, constituencies, Arc::new(queue))?;
    web::serve(&config.bind_address, state).await?;

    // the router, and with it the last queue handle, is gone once serve returns
    worker.await?;
    Ok(())
}
