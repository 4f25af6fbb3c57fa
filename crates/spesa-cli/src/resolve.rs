//! `spesa resolve`: pick the pickup point whose catalog matches each
//! delivery store.

use spesa_core::{AppConfig, ResolutionRequest, StoreDirectory, StoreRef};
use spesa_scraper::StoreResolver;

use crate::output::write_json;

/// Resolution requests for one store, or for every delivery store in the
/// directory. Stores without a usable reference street are skipped with a
/// warning in the second case.
pub(crate) fn build_requests(
    directory: &StoreDirectory,
    store_filter: Option<&str>,
) -> anyhow::Result<Vec<ResolutionRequest>> {
    if let Some(store) = store_filter {
        let request = directory.resolution_request(&StoreRef::new(store))?;
        return Ok(vec![request]);
    }

    let requests = directory
        .delivery_store_ids()
        .iter()
        .filter_map(|store_id| match directory.resolution_request(store_id) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!(store = %store_id, error = %e, "skipping store");
                None
            }
        })
        .collect();
    Ok(requests)
}

/// # Errors
///
/// Returns an error if the store directory cannot be loaded, the requested
/// store is unknown, or the artifact cannot be written. Per-store failures
/// are reported in the artifact, not propagated.
pub(crate) async fn run_resolve(
    config: &AppConfig,
    store_filter: Option<&str>,
) -> anyhow::Result<()> {
    let directory = StoreDirectory::load(&config.stores_path)?;
    let requests = build_requests(&directory, store_filter)?;
    if requests.is_empty() {
        println!("no delivery stores to resolve");
        return Ok(());
    }

    let (client, runner) = crate::build_collaborators(config)?;
    let resolver = StoreResolver::new(client, runner);
    let report = resolver.resolve_all(&requests).await;

    let path = write_json(&config.output_dir, "resolution", &report)?;
    let summary = report.summary();
    println!(
        "resolved {} of {} stores, {} unresolved, {} failed ({})",
        summary.resolved,
        requests.len(),
        summary.unresolved,
        summary.failed,
        path.display(),
    );

    Ok(())
}
