//! Identifiers and addressing types for stores, streets, and pickup points.
//!
//! The upstream API keys the home-delivery catalog by *street* and the
//! pickup catalog by *street + drive*. Neither ever carries the physical
//! store id, which is why these types stay deliberately separate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delivery-zone identifier assigned by the onboarding endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreetId(pub u64);

impl fmt::Display for StreetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pickup-point ("drive") identifier. Always used together with a [`StreetId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriveId(pub u64);

impl fmt::Display for DriveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical store or locker identifier.
///
/// The trolley endpoint reports it as a number while store lists use short
/// alphanumeric codes, so it is carried as a string in both cases.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreRef(pub String);

impl StoreRef {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which storefront a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Home delivery ("supermercato"), addressed by street only.
    HomeDelivery,
    /// Locker / click-and-collect ("drive"), addressed by street + drive.
    Pickup,
}

impl ServiceMode {
    /// Value of the `X-PAGE-PATH` header the storefront expects for this mode.
    #[must_use]
    pub fn page_path(self) -> &'static str {
        match self {
            ServiceMode::HomeDelivery => "supermercato",
            ServiceMode::Pickup => "drive",
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceMode::HomeDelivery => write!(f, "home_delivery"),
            ServiceMode::Pickup => write!(f, "pickup"),
        }
    }
}

/// Minimal addressing tuple needed to open a catalog session.
///
/// The mode is derived from `drive_id`, so a context can never claim both
/// modes at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreContext {
    pub street_id: StreetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<DriveId>,
}

impl StoreContext {
    #[must_use]
    pub fn home_delivery(street_id: StreetId) -> Self {
        Self {
            street_id,
            drive_id: None,
        }
    }

    #[must_use]
    pub fn pickup(street_id: StreetId, drive_id: DriveId) -> Self {
        Self {
            street_id,
            drive_id: Some(drive_id),
        }
    }

    #[must_use]
    pub fn mode(&self) -> ServiceMode {
        if self.drive_id.is_some() {
            ServiceMode::Pickup
        } else {
            ServiceMode::HomeDelivery
        }
    }
}

impl fmt::Display for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.drive_id {
            Some(drive) => write!(f, "street {}/drive {}", self.street_id, drive),
            None => write!(f, "street {}", self.street_id),
        }
    }
}

/// One plausible match for a reference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub context: StoreContext,
    pub label: String,
}

impl Candidate {
    #[must_use]
    pub fn new(context: StoreContext, label: impl Into<String>) -> Self {
        Self {
            context,
            label: label.into(),
        }
    }

    /// Ordering key used to break score ties: lowest drive id, then lowest
    /// street id, then label.
    #[must_use]
    pub fn tie_break_key(&self) -> (Option<DriveId>, StreetId, &str) {
        (self.context.drive_id, self.context.street_id, self.label.as_str())
    }
}

/// WGS84 coordinates as published in the store list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Services a store advertises (`CON` home delivery, `CEV` click-and-collect).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFlags {
    #[serde(default)]
    pub home_delivery: bool,
    #[serde(default)]
    pub click_and_collect: bool,
}

impl ServiceFlags {
    /// Builds flags from the raw service codes of the public store list.
    #[must_use]
    pub fn from_codes<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut flags = Self::default();
        for code in codes {
            match code {
                "CON" => flags.home_delivery = true,
                "CEV" => flags.click_and_collect = true,
                _ => {}
            }
        }
        flags
    }
}
