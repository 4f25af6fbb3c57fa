//! Street → store topology.
//!
//! Binding a delivery session to a street makes the server pick the store
//! that serves it, and the trolley endpoint then reveals that store's id.
//! Probing every street this way yields the street/store mapping the
//! storefront never publishes.

use std::collections::BTreeMap;

use serde::Serialize;
use spesa_core::{StoreContext, StoreRef, StreetId};

use crate::client::SpesaClient;
use crate::error::ScraperError;
use crate::runner::TaskRunner;

#[derive(Debug, Clone)]
pub struct TopologyMapper {
    client: SpesaClient,
    runner: TaskRunner,
}

impl TopologyMapper {
    #[must_use]
    pub fn new(client: SpesaClient, runner: TaskRunner) -> Self {
        Self { client, runner }
    }

    /// Binds a delivery session to `street_id`, issues a one-item catalog
    /// probe, and reads the store id the server bound to the session.
    ///
    /// # Errors
    ///
    /// Propagates handshake, facet, and trolley errors.
    pub async fn probe_street(
        &self,
        street_id: StreetId,
    ) -> Result<Option<StoreRef>, ScraperError> {
        let session = self
            .client
            .open_session(&StoreContext::home_delivery(street_id))
            .await?;
        session.facet_page(0, 1).await?;
        session.bound_store_id().await
    }

    /// Probes every street through the runner.
    ///
    /// A street whose probe fails ends up only in [`TopologyMap::failed`]; a
    /// street whose probe succeeds without a store id maps to an empty list.
    pub async fn map_topology(&self, streets: impl IntoIterator<Item = StreetId>) -> TopologyMap {
        let report = self
            .runner
            .run_report(streets, |street_id| self.probe_street(*street_id))
            .await;

        let map = TopologyMap {
            associations: report
                .completed
                .into_iter()
                .map(|(street, store)| (street, store.into_iter().collect()))
                .collect(),
            failed: report
                .failed
                .into_iter()
                .map(|(street, failure)| {
                    (
                        street,
                        ProbeFailure {
                            attempts: failure.attempts,
                            error: failure.error.to_string(),
                        },
                    )
                })
                .collect(),
        };

        tracing::info!(
            probed = map.associations.len() + map.failed.len(),
            associated = map.associated_streets(),
            empty = map.associations.len() - map.associated_streets(),
            failed = map.failed.len(),
            "topology mapping complete"
        );
        map
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
    pub attempts: u32,
    pub error: String,
}

/// Streets and the stores they are served by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologyMap {
    /// Successfully probed streets. An empty list means the server bound no
    /// store to the street.
    pub associations: BTreeMap<StreetId, Vec<StoreRef>>,
    pub failed: BTreeMap<StreetId, ProbeFailure>,
}

impl TopologyMap {
    /// Number of probed streets that map to at least one store.
    #[must_use]
    pub fn associated_streets(&self) -> usize {
        self.associations.values().filter(|s| !s.is_empty()).count()
    }

    /// Inverted view: each store with the streets it serves, ascending.
    #[must_use]
    pub fn streets_by_store(&self) -> BTreeMap<StoreRef, Vec<StreetId>> {
        let mut inverted: BTreeMap<StoreRef, Vec<StreetId>> = BTreeMap::new();
        for (street, stores) in &self.associations {
            for store in stores {
                inverted.entry(store.clone()).or_default().push(*street);
            }
        }
        inverted
    }
}
