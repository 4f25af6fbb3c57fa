//! Store and street directories supplied from outside the core.
//!
//! Both are loaded from YAML or JSON files (chosen by extension) and are
//! only ever read afterwards.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stores::{
    Candidate, Coordinates, DriveId, ServiceFlags, ServiceMode, StoreContext, StoreRef, StreetId,
};

/// Description markers that identify pickup points in the store list.
const PICKUP_MARKERS: [&str; 2] = ["LOCKER", "CLICCA E VAI"];

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read directory file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML directory {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse JSON directory {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("directory validation failed: {0}")]
    Validation(String),

    #[error("store {0} is not in the store directory")]
    UnknownStore(StoreRef),

    #[error("store {0} has no home-delivery street to use as a reference")]
    NoReferenceStreet(StoreRef),
}

/// One row of the store directory.
///
/// A delivery store served by several streets appears once per street.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub store_id: StoreRef,
    pub name: String,
    pub postal_code: String,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub services: ServiceFlags,
    #[serde(default)]
    pub street_id: Option<StreetId>,
    #[serde(default)]
    pub drive_id: Option<DriveId>,
    #[serde(default)]
    pub description: Option<String>,
}

impl StoreEntry {
    /// Catalog context for this row, if it carries a street.
    #[must_use]
    pub fn context(&self) -> Option<StoreContext> {
        let street_id = self.street_id?;
        Some(StoreContext {
            street_id,
            drive_id: self.drive_id,
        })
    }

    /// A pickup point has a drive id and is flagged as click-and-collect,
    /// either by service code or by its description.
    #[must_use]
    pub fn is_pickup_point(&self) -> bool {
        if self.drive_id.is_none() {
            return false;
        }
        if self.services.click_and_collect {
            return true;
        }
        self.description.as_deref().is_some_and(|d| {
            let upper = d.to_uppercase();
            PICKUP_MARKERS.iter().any(|m| upper.contains(m))
        })
    }
}

/// Everything the resolver needs for one reference store.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionRequest {
    pub reference: StoreRef,
    /// Home-delivery contexts of the reference, in directory order. The
    /// first one is used to fetch the reference catalog.
    pub reference_contexts: Vec<StoreContext>,
    pub candidates: Vec<Candidate>,
}

/// A single catalog to harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestTarget {
    pub store_id: StoreRef,
    pub context: StoreContext,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDirectory {
    pub stores: Vec<StoreEntry>,
}

impl StoreDirectory {
    /// Load and validate a store directory from a `.yaml`/`.yml`/`.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let directory: StoreDirectory = read_file(path)?;
        directory.validate()?;
        Ok(directory)
    }

    /// # Errors
    ///
    /// Returns [`DirectoryError::Validation`] on empty store ids or drive ids without a street.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        for entry in &self.stores {
            if entry.store_id.as_str().trim().is_empty() {
                return Err(DirectoryError::Validation(format!(
                    "store entry \"{}\" has an empty store_id",
                    entry.name
                )));
            }
            if entry.drive_id.is_some() && entry.street_id.is_none() {
                return Err(DirectoryError::Validation(format!(
                    "store {} has a drive_id but no street_id",
                    entry.store_id
                )));
            }
        }
        Ok(())
    }

    pub fn rows_for<'a>(&'a self, store_id: &'a StoreRef) -> impl Iterator<Item = &'a StoreEntry> {
        self.stores.iter().filter(move |e| &e.store_id == store_id)
    }

    /// Store ids that have at least one home-delivery street, in first-seen order.
    #[must_use]
    pub fn delivery_store_ids(&self) -> Vec<StoreRef> {
        let mut seen = HashSet::new();
        self.stores
            .iter()
            .filter(|e| e.drive_id.is_none() && e.street_id.is_some())
            .filter(|e| seen.insert(e.store_id.clone()))
            .map(|e| e.store_id.clone())
            .collect()
    }

    /// Builds the resolver input for `store_id`: its delivery contexts and
    /// every pickup point sharing one of its postal codes.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::UnknownStore`] if no row carries `store_id`.
    /// - [`DirectoryError::NoReferenceStreet`] if none of its rows is a delivery street.
    pub fn resolution_request(
        &self,
        store_id: &StoreRef,
    ) -> Result<ResolutionRequest, DirectoryError> {
        let rows: Vec<&StoreEntry> = self.rows_for(store_id).collect();
        if rows.is_empty() {
            return Err(DirectoryError::UnknownStore(store_id.clone()));
        }

        let reference_rows: Vec<&StoreEntry> = rows
            .iter()
            .copied()
            .filter(|e| e.drive_id.is_none())
            .collect();
        let reference_contexts: Vec<StoreContext> =
            reference_rows.iter().filter_map(|e| e.context()).collect();
        if reference_contexts.is_empty() {
            return Err(DirectoryError::NoReferenceStreet(store_id.clone()));
        }

        let postal_codes: BTreeSet<&str> = reference_rows
            .iter()
            .map(|e| e.postal_code.as_str())
            .collect();

        let mut seen = HashSet::new();
        let candidates = self
            .stores
            .iter()
            .filter(|e| e.is_pickup_point() && postal_codes.contains(e.postal_code.as_str()))
            .filter_map(|e| e.context().map(|ctx| (ctx, e)))
            .filter(|(ctx, _)| seen.insert(*ctx))
            .map(|(ctx, e)| Candidate::new(ctx, e.name.clone()))
            .collect();

        Ok(ResolutionRequest {
            reference: store_id.clone(),
            reference_contexts,
            candidates,
        })
    }

    /// One harvest target per store and mode: delivery stores use their
    /// first listed street, pickup points their street + drive.
    #[must_use]
    pub fn harvest_plan(&self) -> Vec<HarvestTarget> {
        let mut seen: HashSet<(StoreRef, ServiceMode)> = HashSet::new();
        self.stores
            .iter()
            .filter_map(|e| e.context().map(|ctx| (ctx, e)))
            .filter(|(ctx, e)| seen.insert((e.store_id.clone(), ctx.mode())))
            .map(|(context, e)| HarvestTarget {
                store_id: e.store_id.clone(),
                context,
            })
            .collect()
    }
}

/// One delivery zone as returned by the street-suggestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetEntry {
    pub street_id: StreetId,
    pub postal_code: String,
    pub display_name: String,
    #[serde(default)]
    pub town: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StreetsFile {
    streets: Vec<StreetEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreetDirectory {
    streets: BTreeMap<StreetId, StreetEntry>,
}

impl StreetDirectory {
    /// # Errors
    ///
    /// Returns [`DirectoryError::Validation`] if two entries share a street id.
    pub fn from_entries(
        entries: impl IntoIterator<Item = StreetEntry>,
    ) -> Result<Self, DirectoryError> {
        let mut streets = BTreeMap::new();
        for entry in entries {
            let id = entry.street_id;
            if streets.insert(id, entry).is_some() {
                return Err(DirectoryError::Validation(format!(
                    "duplicate street_id {id}"
                )));
            }
        }
        Ok(Self { streets })
    }

    /// Load a street directory from a `.yaml`/`.yml`/`.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the file cannot be read or parsed, or
    /// contains duplicate street ids.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let file: StreetsFile = read_file(path)?;
        Self::from_entries(file.streets)
    }

    /// Serializes the directory in the same shape [`StreetDirectory::load`] reads.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Yaml`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, DirectoryError> {
        let file = StreetsFile {
            streets: self.streets.values().cloned().collect(),
        };
        serde_yaml::to_string(&file).map_err(|e| DirectoryError::Yaml {
            path: "<memory>".to_owned(),
            source: e,
        })
    }

    /// Merges `other` into `self`; entries already present are kept.
    pub fn extend(&mut self, other: StreetDirectory) {
        for (id, entry) in other.streets {
            self.streets.entry(id).or_insert(entry);
        }
    }

    /// Adds `entry` unless its street id is already present. Returns whether
    /// it was added.
    pub fn insert(&mut self, entry: StreetEntry) -> bool {
        match self.streets.entry(entry.street_id) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    #[must_use]
    pub fn get(&self, id: StreetId) -> Option<&StreetEntry> {
        self.streets.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = StreetId> + '_ {
        self.streets.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreetEntry> {
        self.streets.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streets.is_empty()
    }
}

fn read_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DirectoryError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| DirectoryError::Io {
        path: display.clone(),
        source: e,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| DirectoryError::Json {
            path: display,
            source: e,
        })
    } else {
        serde_yaml::from_str(&content).map_err(|e| DirectoryError::Yaml {
            path: display,
            source: e,
        })
    }
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
