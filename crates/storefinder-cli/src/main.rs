mod output;
mod track;

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use storefinder_client::{BackendClient, FileStore, StoreAggregator};
use storefinder_core::{ClientConfig, Coordinate, DEFAULT_CENTER};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "storefinder")]
#[command(about = "Find guitar stores near a location")]
struct Cli {
    /// Backend base URL (overrides `STOREFINDER_BACKEND_URL`)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List stores near a position
    Nearby {
        #[command(flatten)]
        position: PositionArgs,
    },
    /// Save a store discovered near a position
    Save {
        /// Places-provider identifier of the store to save
        #[arg(long)]
        place_id: String,
        #[command(flatten)]
        position: PositionArgs,
    },
    /// List saved stores
    Saved {
        /// Maximum number of stores to show
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Follow positions from stdin, one `lat,lng` or `error:<code>` per line
    Track,
}

/// Position to search around; the default map center when omitted.
#[derive(Debug, Clone, Copy, Args)]
struct PositionArgs {
    #[arg(long, allow_negative_numbers = true, requires = "lng")]
    lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lng: Option<f64>,
}

impl PositionArgs {
    fn coordinate(self) -> Coordinate {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng),
            _ => DEFAULT_CENTER,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = storefinder_core::load_client_config()?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        println!("storefinder ready; run `storefinder --help` for commands");
        return Ok(());
    };

    let cache = Arc::new(FileStore::new(&config.cache_dir));
    let aggregator = StoreAggregator::from_config(&config, cache)?;

    match command {
        Commands::Nearby { position } => run_nearby(&aggregator, position.coordinate()).await,
        Commands::Save { place_id, position } => {
            run_save(&aggregator, position.coordinate(), &place_id).await
        }
        Commands::Saved { limit } => run_saved(&config, limit).await,
        Commands::Track => track::run_track(&aggregator).await,
    }
}

async fn run_nearby(aggregator: &StoreAggregator, location: Coordinate) -> anyhow::Result<()> {
    aggregator.fetch_nearby(location).await;
    output::print_state(location, &aggregator.state(), None);
    Ok(())
}

async fn run_save(
    aggregator: &StoreAggregator,
    location: Coordinate,
    place_id: &str,
) -> anyhow::Result<()> {
    aggregator.fetch_nearby(location).await;
    let state = aggregator.state();
    let record = state
        .stores
        .iter()
        .find(|store| store.place_id == place_id)
        .with_context(|| format!("no store with place id {place_id} near {location}"))?;

    let outcome = aggregator.save_store(record).await?;
    tracing::debug!(place_id, created = outcome.is_new(), "save finished");
    println!("{}", output::format_save_outcome(&record.name, &outcome));
    Ok(())
}

async fn run_saved(config: &ClientConfig, limit: Option<u32>) -> anyhow::Result<()> {
    let backend = BackendClient::new(&config.backend_url, config.request_timeout_secs)?;
    let stores = backend.saved_stores(limit).await?;
    if stores.is_empty() {
        println!("No saved stores.");
    }
    for doc in &stores {
        println!("{}", output::format_saved(doc));
    }
    Ok(())
}
