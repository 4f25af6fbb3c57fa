//! Bulk catalog harvesting for a store directory's harvest plan.

use chrono::{DateTime, Utc};
use serde::Serialize;
use spesa_core::{HarvestTarget, ProductMap, StoreContext, StoreRef};

use crate::client::SpesaClient;
use crate::normalize::normalize_catalog;
use crate::runner::{TaskOutcome, TaskRunner};

/// One store's catalog, normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestedCatalog {
    pub store_id: StoreRef,
    pub context: StoreContext,
    pub reported_total: u64,
    pub fetched: usize,
    pub captured_at: DateTime<Utc>,
    pub products: ProductMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestFailure {
    pub store_id: StoreRef,
    pub context: StoreContext,
    pub attempts: u32,
    pub error: String,
}

/// Harvest results in plan order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestReport {
    pub catalogs: Vec<HarvestedCatalog>,
    pub failed: Vec<HarvestFailure>,
}

/// Fetches every target of `plan` through `runner`.
///
/// Each target gets its own session; a target that still fails after its
/// retries is reported and the rest of the plan carries on.
pub async fn harvest_all(
    client: &SpesaClient,
    runner: &TaskRunner,
    plan: &[HarvestTarget],
) -> HarvestReport {
    let mut outcomes = runner
        .run(0..plan.len(), |index| {
            let context = plan[*index].context;
            async move { client.harvest_catalog(&context).await }
        })
        .await;
    outcomes.sort_by_key(|o| *o.id());

    let mut report = HarvestReport::default();
    for outcome in outcomes {
        match outcome {
            TaskOutcome::Completed { id, value, .. } => {
                let target = &plan[id];
                let products = normalize_catalog(&value);
                tracing::info!(
                    store = %target.store_id,
                    context = %target.context,
                    fetched = value.len(),
                    normalized = products.len(),
                    "catalog harvested"
                );
                report.catalogs.push(HarvestedCatalog {
                    store_id: target.store_id.clone(),
                    context: target.context,
                    reported_total: value.reported_total,
                    fetched: value.len(),
                    captured_at: value.captured_at,
                    products,
                });
            }
            TaskOutcome::Failed {
                id,
                attempts,
                error,
            } => {
                let target = &plan[id];
                report.failed.push(HarvestFailure {
                    store_id: target.store_id.clone(),
                    context: target.context,
                    attempts,
                    error: error.to_string(),
                });
            }
        }
    }

    if !report.failed.is_empty() {
        tracing::warn!(
            failed = report.failed.len(),
            total = plan.len(),
            "some stores failed to harvest"
        );
    }
    report
}
