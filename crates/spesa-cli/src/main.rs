mod discover;
mod harvest;
mod output;
mod resolve;
mod topology;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "spesa")]
#[command(about = "Grocery storefront catalog harvesting and store matching")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Discover delivery streets and pickup points for postal codes
    Discover {
        /// Postal code to look up (repeatable)
        #[arg(long = "postcode", required = true)]
        postcodes: Vec<String>,
    },
    /// Map delivery streets to the store that serves them
    Topology {
        /// Street id to probe (repeatable); defaults to every known street
        #[arg(long = "street")]
        streets: Vec<u64>,
    },
    /// Fetch and normalize store catalogs
    Harvest {
        /// Only harvest this store id
        #[arg(long)]
        store: Option<String>,
        /// Print the harvest plan without fetching anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Match delivery stores to their pickup-point catalogs
    Resolve {
        /// Only resolve this store id
        #[arg(long)]
        store: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse before loading config so --help works with a broken environment.
    let cli = Cli::parse();
    let config = spesa_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Discover { postcodes }) => {
            discover::run_discover(&config, &postcodes).await?;
        }
        Some(Commands::Topology { streets }) => {
            topology::run_topology(&config, &streets).await?;
        }
        Some(Commands::Harvest { store, dry_run }) => {
            harvest::run_harvest(&config, store.as_deref(), dry_run).await?;
        }
        Some(Commands::Resolve { store }) => {
            resolve::run_resolve(&config, store.as_deref()).await?;
        }
        None => println!("spesa: no command given, see --help"),
    }

    Ok(())
}

/// Builds the storefront client and task runner from configuration.
pub(crate) fn build_collaborators(
    config: &spesa_core::AppConfig,
) -> anyhow::Result<(spesa_scraper::SpesaClient, spesa_scraper::TaskRunner)> {
    let client = spesa_scraper::SpesaClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build storefront client: {e}"))?;
    let runner = spesa_scraper::TaskRunner::from_config(config);
    Ok((client, runner))
}

#[cfg(test)]
mod tests;
