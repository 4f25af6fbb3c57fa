//! Normalization from raw facet entities to [`spesa_core::PricedProduct`].
//!
//! Family products are flattened: every entry in `children` becomes its own
//! record keyed by the child's id. A child never inherits its parent's price.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use spesa_core::{Catalog, PricedProduct, ProductMap, Promotion, RawProduct};

use crate::error::ScraperError;
use crate::types::FacetProduct;

static PROMO_WINDOW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"dal (\d{2}/\d{2}/\d{4}) al (\d{2}/\d{2}/\d{4})")
        .expect("valid promo window regex")
});

/// Normalizes every product of `catalog`. See [`normalize_products`].
#[must_use]
pub fn normalize_catalog(catalog: &Catalog) -> ProductMap {
    normalize_products(&catalog.products)
}

/// Projects raw entities into an id-keyed map.
///
/// Malformed entities are logged and skipped one by one; they never fail the
/// whole catalog. When two records share an id the later one wins.
#[must_use]
pub fn normalize_products(products: &[RawProduct]) -> ProductMap {
    let mut map = ProductMap::new();
    for raw in products {
        match normalize_entity(&raw.0) {
            Ok(records) => {
                for record in records {
                    if let Some(previous) = map.insert(record.id.clone(), record) {
                        tracing::debug!(id = %previous.id, "duplicate product id, keeping last");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "skipping malformed product"),
        }
    }
    map
}

/// Normalizes one top-level entity and its children.
///
/// Returns an empty list for non-product displayables (no `description`).
/// A parent without a usable price is dropped with a warning while its
/// priced children are kept.
///
/// # Errors
///
/// Returns [`ScraperError::MalformedProduct`] if the entity is not an object,
/// or if neither it nor any of its children has a usable id and price.
/// Malformed children are dropped with a warning instead.
pub fn normalize_entity(value: &Value) -> Result<Vec<PricedProduct>, ScraperError> {
    let product = decode(value)?;
    let has_description = product
        .description
        .as_deref()
        .is_some_and(|d| !d.trim().is_empty());
    if !has_description {
        tracing::debug!(entity = %id_hint(value), "skipping entity without description");
        return Ok(Vec::new());
    }

    let parent_id = product.id.as_ref().and_then(scalar_text);
    let parent = priced(&product, value, None);
    let mut records = Vec::with_capacity(1 + product.children.as_ref().map_or(0, Vec::len));

    for child_value in product.children.iter().flatten() {
        let child = decode(child_value)
            .and_then(|c| priced(&c, child_value, parent_id.as_deref()));
        match child {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(
                parent = %id_hint(value),
                error = %e,
                "dropping child product"
            ),
        }
    }

    match parent {
        Ok(parent) => records.insert(0, parent),
        Err(e) if records.is_empty() => return Err(e),
        Err(e) => tracing::warn!(
            error = %e,
            children = records.len(),
            "dropping parent product, keeping its children"
        ),
    }
    Ok(records)
}

fn decode(value: &Value) -> Result<FacetProduct, ScraperError> {
    serde_json::from_value(value.clone()).map_err(|e| ScraperError::MalformedProduct {
        product_ref: id_hint(value),
        reason: e.to_string(),
    })
}

fn priced(
    product: &FacetProduct,
    raw: &Value,
    parent_id: Option<&str>,
) -> Result<PricedProduct, ScraperError> {
    let malformed = |reason: &str| ScraperError::MalformedProduct {
        product_ref: id_hint(raw),
        reason: reason.to_owned(),
    };

    let id = product
        .id
        .as_ref()
        .and_then(scalar_text)
        .ok_or_else(|| malformed("missing id"))?;
    let price = product
        .price
        .as_ref()
        .and_then(parse_price)
        .ok_or_else(|| malformed("missing or unparseable price"))?;

    let mut record = PricedProduct::new(id, price);
    record.code = product.code.as_ref().and_then(scalar_text);
    record.name = product.name.clone();
    record.brand = product.brand.clone();
    record.discounted_price = product.discounted_price.as_ref().and_then(parse_price);
    record.out_of_stock = product.out_of_stock.unwrap_or(false);
    record.promotion = promotion(product);
    record.parent_id = parent_id.map(str::to_owned);
    Ok(record)
}

/// Decimal string of a JSON number or trimmed non-empty string.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        _ => None,
    }
}

/// Parses a price exactly. Numbers go through their JSON text, never `f64`.
/// Strings may use a decimal comma. Negative prices are rejected.
#[must_use]
pub fn parse_price(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', "."),
        _ => return None,
    };
    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;
    (!price.is_sign_negative()).then_some(price)
}

/// Promotion details, only when exactly one promo is attached.
fn promotion(product: &FacetProduct) -> Option<Promotion> {
    let promos = product.promo.as_ref()?.as_array()?;
    let [promo] = promos.as_slice() else {
        return None;
    };

    let window = [product.values.as_ref(), product.txt.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|m| m.get("messageType").and_then(Value::as_str) == Some("PROMO"))
        .filter_map(|m| m.get("text").and_then(Value::as_str))
        .find_map(promo_window);

    Some(Promotion {
        promo_type: promo
            .get("promoType")
            .and_then(Value::as_str)
            .map(str::to_owned),
        valid_from: window.map(|(from, _)| from),
        valid_to: window.map(|(_, to)| to),
    })
}

/// Extracts `(from, to)` from text like `"Offerta valida dal 01/03/2024 al 14/03/2024"`.
#[must_use]
pub fn promo_window(text: &str) -> Option<(NaiveDate, NaiveDate)> {
    let caps = PROMO_WINDOW.captures(text)?;
    let from = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%d/%m/%Y").ok()?;
    let to = NaiveDate::parse_from_str(caps.get(2)?.as_str(), "%d/%m/%Y").ok()?;
    Some((from, to))
}

fn id_hint(value: &Value) -> String {
    value
        .get("id")
        .and_then(scalar_text)
        .unwrap_or_else(|| "<no id>".to_owned())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
