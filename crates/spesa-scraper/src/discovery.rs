//! Street and pickup-point discovery through the onboarding endpoints.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use spesa_core::{StoreEntry, StreetDirectory, StreetEntry, StreetId};

use crate::client::{pickup_entry, SpesaClient};
use crate::error::ScraperError;
use crate::runner::TaskRunner;

/// Streets found for a set of postal codes.
#[derive(Debug, Clone, Default)]
pub struct StreetDiscovery {
    pub streets: StreetDirectory,
    /// Postal codes the storefront does not deliver to.
    pub unsupported: Vec<String>,
    /// Postal codes whose lookup failed, with the last error.
    pub failed: BTreeMap<String, String>,
}

/// Pickup points reachable from a set of streets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PickupDiscovery {
    /// Deduplicated by (street, drive), in street order.
    pub pickup_points: Vec<StoreEntry>,
    pub failed: BTreeMap<StreetId, String>,
}

/// Checks each postal code and collects its street suggestions.
pub async fn discover_streets(
    client: &SpesaClient,
    runner: &TaskRunner,
    postcodes: &[String],
) -> StreetDiscovery {
    let report = runner
        .run_report(postcodes.iter().cloned(), |postcode| {
            let postcode = postcode.clone();
            async move { postcode_streets(client, &postcode).await }
        })
        .await;

    let mut discovery = StreetDiscovery::default();
    for (postcode, streets) in report.completed {
        match streets {
            None => discovery.unsupported.push(postcode),
            Some(entries) => {
                tracing::info!(%postcode, streets = entries.len(), "streets discovered");
                for entry in entries {
                    discovery.streets.insert(entry);
                }
            }
        }
    }
    for (postcode, failure) in report.failed {
        discovery.failed.insert(postcode, failure.error.to_string());
    }
    discovery
}

/// `None` when the postal code is not served.
async fn postcode_streets(
    client: &SpesaClient,
    postcode: &str,
) -> Result<Option<Vec<StreetEntry>>, ScraperError> {
    if !client.check_postcode(postcode).await? {
        tracing::info!(postcode, "postal code not served");
        return Ok(None);
    }
    client.street_suggestions(postcode).await.map(Some)
}

/// Lists the pickup points reachable from each street.
pub async fn discover_pickup_points(
    client: &SpesaClient,
    runner: &TaskRunner,
    streets: impl IntoIterator<Item = StreetId>,
) -> PickupDiscovery {
    let report = runner
        .run_report(streets, |street| client.drives_for_street(*street))
        .await;

    let mut discovery = PickupDiscovery::default();
    let mut seen = HashSet::new();
    for drives in report.completed.into_values() {
        for drive in drives {
            if seen.insert((drive.street_id, drive.id)) {
                discovery.pickup_points.push(pickup_entry(&drive));
            }
        }
    }
    for (street, failure) in report.failed {
        discovery.failed.insert(street, failure.error.to_string());
    }
    tracing::info!(
        pickup_points = discovery.pickup_points.len(),
        failed = discovery.failed.len(),
        "pickup discovery complete"
    );
    discovery
}
