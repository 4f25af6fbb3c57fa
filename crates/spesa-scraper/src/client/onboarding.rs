//! Onboarding lookups: postal-code coverage, street suggestions, and the
//! pickup points reachable from a street.
//!
//! These endpoints need no store binding, so they run on a bare transport
//! session without the visit handshake.

use serde_json::json;
use spesa_core::{
    Coordinates, DriveId, ServiceFlags, StoreEntry, StoreRef, StreetEntry, StreetId,
};

use crate::error::ScraperError;
use crate::types::{DriveEntry, StreetSuggestion};

use super::session::parse_json;
use super::SpesaClient;

const ONBOARDING_PAGE_PATH: (&str, &str) = ("x-page-path", "supermercato");

impl SpesaClient {
    /// Returns `true` if the storefront delivers to `postcode`.
    ///
    /// The endpoint answers 200 for covered postal codes and a 4xx otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedStatus`] for 429 and 5xx answers and
    /// [`ScraperError::Http`] on network failure.
    pub async fn check_postcode(&self, postcode: &str) -> Result<bool, ScraperError> {
        let http = self.transport.open_session()?;
        let url = self.endpoints.postcode_check();
        let response = http
            .post_json(
                url.as_str(),
                &json!({ "postcode": postcode }),
                &[ONBOARDING_PAGE_PATH],
            )
            .await?;

        if response.is_success() {
            return Ok(true);
        }
        let err = ScraperError::UnexpectedStatus {
            status: response.status,
            url: url.to_string(),
        };
        if err.is_transient() {
            return Err(err);
        }
        tracing::debug!(postcode, status = response.status, "postcode not covered");
        Ok(false)
    }

    /// Streets the storefront knows for `postcode`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedStatus`] on a non-2xx answer and
    /// [`ScraperError::UpstreamProtocol`] if the body is not a suggestion list.
    pub async fn street_suggestions(&self, postcode: &str) -> Result<Vec<StreetEntry>, ScraperError> {
        let http = self.transport.open_session()?;
        let url = self.endpoints.street_suggestions();
        let response = http
            .post_json(
                url.as_str(),
                &json!({ "postcode": postcode }),
                &[ONBOARDING_PAGE_PATH],
            )
            .await?;
        let suggestions: Vec<StreetSuggestion> = parse_json(
            &response,
            url.as_str(),
            &format!("street suggestions for {postcode}"),
        )?;

        Ok(suggestions
            .into_iter()
            .map(|s| StreetEntry {
                street_id: StreetId(s.id),
                postal_code: s
                    .post_code
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| postcode.to_owned()),
                display_name: s.value.unwrap_or_default(),
                town: s.town,
            })
            .collect())
    }

    /// Pickup points ("drives") offered to customers on `street_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedStatus`] on a non-2xx answer and
    /// [`ScraperError::UpstreamProtocol`] if the body is not a drive list.
    pub async fn drives_for_street(
        &self,
        street_id: StreetId,
    ) -> Result<Vec<DriveEntry>, ScraperError> {
        let http = self.transport.open_session()?;
        let url = self.endpoints.drives(street_id);
        let response = http
            .get(url.as_str(), &[("x-page-path", "drive")])
            .await?;
        parse_json(
            &response,
            url.as_str(),
            &format!("drives for street {street_id}"),
        )
    }
}

/// Converts a drive listing into a store-directory row for a pickup point.
///
/// The drive code is used as store id when present, then the name, then the
/// numeric drive id.
#[must_use]
pub fn pickup_entry(drive: &DriveEntry) -> StoreEntry {
    let non_empty = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };

    let store_id = non_empty(&drive.code)
        .or_else(|| non_empty(&drive.name))
        .unwrap_or_else(|| drive.id.to_string());
    let coordinates = match (drive.map_latitude, drive.map_longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    };

    StoreEntry {
        store_id: StoreRef::new(store_id),
        name: non_empty(&drive.name).unwrap_or_else(|| format!("drive {}", drive.id)),
        postal_code: non_empty(&drive.post_code).unwrap_or_default(),
        town: non_empty(&drive.town_name),
        coordinates,
        services: ServiceFlags {
            home_delivery: false,
            click_and_collect: true,
        },
        street_id: Some(StreetId(drive.street_id)),
        drive_id: Some(DriveId(drive.id)),
        description: non_empty(&drive.description),
    }
}
