//! `spesa topology`: which store serves each delivery street.

use std::collections::BTreeMap;

use serde::Serialize;
use spesa_core::{AppConfig, StoreRef, StreetDirectory, StreetId};
use spesa_scraper::{TopologyMap, TopologyMapper};

use crate::output::write_json;

#[derive(Debug, Serialize)]
struct TopologyArtifact<'a> {
    #[serde(flatten)]
    map: &'a TopologyMap,
    streets_by_store: BTreeMap<StoreRef, Vec<StreetId>>,
}

/// Streets named on the command line, or every street in the streets file.
pub(crate) fn select_streets(
    requested: &[u64],
    directory: Option<&StreetDirectory>,
) -> anyhow::Result<Vec<StreetId>> {
    if !requested.is_empty() {
        return Ok(requested.iter().copied().map(StreetId).collect());
    }
    match directory {
        Some(dir) if !dir.is_empty() => Ok(dir.ids().collect()),
        _ => anyhow::bail!("no streets to probe; pass --street or run `spesa discover` first"),
    }
}

/// # Errors
///
/// Returns an error if there are no streets to probe, the streets file cannot
/// be loaded, or the artifact cannot be written. Per-street failures are
/// reported in the artifact, not propagated.
pub(crate) async fn run_topology(config: &AppConfig, requested: &[u64]) -> anyhow::Result<()> {
    let directory = if requested.is_empty() {
        Some(StreetDirectory::load(&config.streets_path)?)
    } else {
        None
    };
    let streets = select_streets(requested, directory.as_ref())?;

    let (client, runner) = crate::build_collaborators(config)?;
    let mapper = TopologyMapper::new(client, runner);
    let map = mapper.map_topology(streets.iter().copied()).await;

    let streets_by_store = map.streets_by_store();
    let store_count = streets_by_store.len();
    let path = write_json(
        &config.output_dir,
        "topology",
        &TopologyArtifact {
            map: &map,
            streets_by_store,
        },
    )?;

    println!(
        "probed {} streets: {} mapped to {store_count} stores, {} failed ({})",
        streets.len(),
        map.associated_streets(),
        map.failed.len(),
        path.display(),
    );

    Ok(())
}
