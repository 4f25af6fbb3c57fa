//! `spesa discover`: postal codes to streets to pickup points.
//!
//! Streets already listed in the configured streets file are kept; the merged
//! directory is written to the output directory rather than over the config.

use std::collections::BTreeMap;

use serde::Serialize;
use spesa_core::{AppConfig, StreetDirectory};
use spesa_scraper::{discover_pickup_points, discover_streets};

use crate::output::{write_json, write_text};

#[derive(Debug, Serialize)]
struct DiscoveryFailures<'a> {
    unsupported_postcodes: &'a [String],
    failed_postcodes: &'a BTreeMap<String, String>,
}

/// # Errors
///
/// Returns an error if the storefront client cannot be built, an existing
/// streets file cannot be parsed, or an artifact cannot be written.
pub(crate) async fn run_discover(config: &AppConfig, postcodes: &[String]) -> anyhow::Result<()> {
    let (client, runner) = crate::build_collaborators(config)?;

    let mut streets = if config.streets_path.exists() {
        StreetDirectory::load(&config.streets_path)?
    } else {
        StreetDirectory::default()
    };
    let known = streets.len();

    let discovery = discover_streets(&client, &runner, postcodes).await;
    for failed in discovery.failed.keys() {
        tracing::warn!(postcode = %failed, "postal code lookup failed");
    }
    let found = discovery.streets.len();
    streets.extend(discovery.streets);

    let pickup = discover_pickup_points(&client, &runner, streets.ids().collect::<Vec<_>>()).await;

    write_text(&config.output_dir, "streets.yaml", &streets.to_yaml()?)?;
    write_json(&config.output_dir, "pickup_points", &pickup)?;
    write_json(
        &config.output_dir,
        "discovery_failures",
        &DiscoveryFailures {
            unsupported_postcodes: &discovery.unsupported,
            failed_postcodes: &discovery.failed,
        },
    )?;

    println!(
        "discovered {found} streets ({} new, {} total) and {} pickup points; {} postcodes unsupported, {} failed",
        streets.len() - known,
        streets.len(),
        pickup.pickup_points.len(),
        discovery.unsupported.len(),
        discovery.failed.len(),
    );

    Ok(())
}
