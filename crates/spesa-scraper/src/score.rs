//! Catalog similarity.
//!
//! Two catalogs are compared on the products they share: the distance is the
//! gap between their reported sizes plus the Euclidean distance between their
//! price vectors over the common ids. Lower is more similar; catalogs with no
//! id in common are infinitely far apart.

use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use spesa_core::{Catalog, ProductMap};

use crate::normalize::normalize_catalog;

/// What the scorer needs from one catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProfile {
    /// Server-reported listing size.
    pub total_count: u64,
    pub products: ProductMap,
}

impl CatalogProfile {
    /// Profile whose total is the number of normalized products.
    #[must_use]
    pub fn from_products(products: ProductMap) -> Self {
        Self {
            total_count: products.len() as u64,
            products,
        }
    }

    #[must_use]
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            total_count: catalog.reported_total,
            products: normalize_catalog(catalog),
        }
    }
}

/// Score plus the size of the id intersection it was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Similarity {
    pub score: f64,
    pub common_products: usize,
}

impl Similarity {
    #[must_use]
    pub fn is_comparable(&self) -> bool {
        self.score.is_finite()
    }
}

/// Distance between `reference` and `candidate`; see the module docs.
///
/// Symmetric bit-for-bit: each price difference is taken exactly in
/// `Decimal` and only its square is accumulated in `f64`, in id order.
#[must_use]
pub fn score(reference: &CatalogProfile, candidate: &CatalogProfile) -> Similarity {
    let mut common_products = 0usize;
    let mut sum_of_squares = 0.0f64;

    // BTreeMap iteration is ordered by id, which fixes the accumulation order.
    for (id, ours) in &reference.products {
        let Some(theirs) = candidate.products.get(id) else {
            continue;
        };
        common_products += 1;
        let diff = (ours.price - theirs.price).abs().to_f64().unwrap_or(f64::INFINITY);
        sum_of_squares += diff * diff;
    }

    if common_products == 0 {
        return Similarity {
            score: f64::INFINITY,
            common_products,
        };
    }

    let size_gap = reference.total_count.abs_diff(candidate.total_count);
    #[allow(clippy::cast_precision_loss)]
    let size_gap = size_gap as f64;

    Similarity {
        score: size_gap + sum_of_squares.sqrt(),
        common_products,
    }
}
