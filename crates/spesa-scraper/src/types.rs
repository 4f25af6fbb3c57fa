//! Wire types for the storefront's JSON endpoints.
//!
//! ## Observed shapes
//!
//! ### `POST /commerce/resources/search/facet`
//! `displayables.rowCount` is the total listing size for the session's store
//! and is re-sent with every page; it has been seen to drift by a few items
//! between pages of the same walk. `displayables.entities` holds the page.
//!
//! ### Product entities
//! `id` and `code` arrive as numbers on most stores and as strings on a few.
//! `price` is a JSON number (e.g. `2.49`) but has been seen as a string.
//! Entities without `description` are banners and editorial tiles, not
//! products. Family products carry variants in `children`, each with its own
//! `id` and, usually, its own `price`.
//!
//! ### `GET /commerce/resources/auth/trolley`
//! Requires the `x-xsrf-token` header echoing the `XSRF-ECOM-TOKEN` cookie.
//! `storeId` is a number once a delivery street has been visited, and absent
//! for sessions that never completed the visit.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct FacetResponse {
    pub displayables: Displayables,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Displayables {
    pub row_count: u64,
    #[serde(default)]
    pub entities: Vec<Value>,
}

/// Permissive view of a product entity; every field is validated by the
/// normalizer rather than by serde.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetProduct {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub discounted_price: Option<Value>,
    #[serde(default)]
    pub out_of_stock: Option<bool>,
    #[serde(default)]
    pub promo: Option<Value>,
    /// Free-text messages; promotions carry their validity window here.
    #[serde(default)]
    pub values: Option<Value>,
    /// Older name for `values`, still sent by some stores.
    #[serde(default)]
    pub txt: Option<Value>,
    #[serde(default)]
    pub children: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrolleyResponse {
    #[serde(default)]
    pub store_id: Option<Value>,
}

/// One entry of `POST /commerce/resources/onboarding/street/suggestions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetSuggestion {
    pub id: u64,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub post_code: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
}

/// One entry of `GET /commerce/resources/onboarding/drives/{streetId}`.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveEntry {
    pub id: u64,
    pub street_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub post_code: Option<String>,
    #[serde(default)]
    pub town_name: Option<String>,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub house_number: Option<String>,
    #[serde(default)]
    pub map_latitude: Option<f64>,
    #[serde(default)]
    pub map_longitude: Option<f64>,
}
