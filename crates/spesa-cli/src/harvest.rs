//! `spesa harvest`: fetch and normalize catalogs for the store directory.

use spesa_core::{AppConfig, HarvestTarget, StoreDirectory, StoreRef};
use spesa_scraper::harvest_all;

use crate::output::write_json;

/// The directory's harvest plan, narrowed to one store when `store_filter` is set.
pub(crate) fn select_targets(
    directory: &StoreDirectory,
    store_filter: Option<&str>,
) -> anyhow::Result<Vec<HarvestTarget>> {
    let plan = directory.harvest_plan();
    let Some(store) = store_filter else {
        return Ok(plan);
    };

    let store = StoreRef::new(store);
    let targets: Vec<HarvestTarget> = plan.into_iter().filter(|t| t.store_id == store).collect();
    if targets.is_empty() {
        anyhow::bail!("store '{store}' has no harvestable context in the store directory");
    }
    Ok(targets)
}

/// When `dry_run` is `true` the plan is printed and nothing is fetched.
///
/// # Errors
///
/// Returns an error if the store directory cannot be loaded, the filter
/// matches nothing, or the artifact cannot be written. Per-store fetch
/// failures are reported in the artifact, not propagated.
pub(crate) async fn run_harvest(
    config: &AppConfig,
    store_filter: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let directory = StoreDirectory::load(&config.stores_path)?;
    let targets = select_targets(&directory, store_filter)?;

    if dry_run {
        println!("dry-run: would harvest {} catalogs:", targets.len());
        for target in &targets {
            println!("  {} @ {}", target.store_id, target.context);
        }
        return Ok(());
    }

    let (client, runner) = crate::build_collaborators(config)?;
    let report = harvest_all(&client, &runner, &targets).await;

    let products: usize = report.catalogs.iter().map(|c| c.products.len()).sum();
    let path = write_json(&config.output_dir, "harvest", &report)?;

    println!(
        "harvested {products} products across {} catalogs, {} failed ({})",
        report.catalogs.len(),
        report.failed.len(),
        path.display(),
    );

    Ok(())
}
