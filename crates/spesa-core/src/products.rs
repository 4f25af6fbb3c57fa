use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stores::StoreContext;

/// A product record exactly as the search endpoint returned it.
///
/// Kept opaque so that a single malformed entity can be skipped during
/// normalization instead of failing the whole page at deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProduct(pub serde_json::Value);

impl RawProduct {
    /// Number of nested child records (variants) attached to this entity.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.0
            .get("children")
            .and_then(serde_json::Value::as_array)
            .map_or(0, Vec::len)
    }
}

/// Snapshot of one store context's full listing at one point in time.
///
/// Products are kept in fetch order. A catalog is never mutated after the
/// fetcher hands it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub context: StoreContext,
    /// Last `rowCount` the server reported during the walk.
    pub reported_total: u64,
    pub products: Vec<RawProduct>,
    pub captured_at: DateTime<Utc>,
}

impl Catalog {
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Top-level entities plus every nested child record.
    #[must_use]
    pub fn item_count_including_children(&self) -> usize {
        self.products
            .iter()
            .map(|p| 1 + p.child_count())
            .sum()
    }
}

/// Promotion attached to a product, when the listing carries exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub promo_type: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

/// Canonical product shape used for cross-store comparison.
///
/// Only `id` and `price` take part in scoring; the remaining fields are kept
/// for harvest output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedProduct {
    pub id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub code: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub discounted_price: Option<Decimal>,
    pub out_of_stock: bool,
    pub promotion: Option<Promotion>,
    /// Id of the entity this record was expanded from, for child records.
    pub parent_id: Option<String>,
}

impl PricedProduct {
    #[must_use]
    pub fn new(id: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            price,
            code: None,
            name: None,
            brand: None,
            discounted_price: None,
            out_of_stock: false,
            promotion: None,
            parent_id: None,
        }
    }
}

/// Normalized catalog keyed (and therefore sorted) by product id.
pub type ProductMap = BTreeMap<String, PricedProduct>;
