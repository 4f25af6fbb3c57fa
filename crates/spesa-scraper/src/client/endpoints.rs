//! URL construction for the storefront's navigation and resource endpoints.

use reqwest::Url;
use spesa_core::{ServiceMode, StoreContext, StreetId};

use crate::error::ScraperError;

const DELIVERY_LANDING: &str = "/commerce/nav/onboarding/index";
const PICKUP_LANDING: &str = "/commerce/nav/drive/store/home";
const DELIVERY_VISIT: &str = "/commerce/nav/supermercato/visit";
const PICKUP_VISIT: &str = "/commerce/nav/drive/visit";
const FACET: &str = "/commerce/resources/search/facet";
const TROLLEY: &str = "/commerce/resources/auth/trolley";
const POSTCODE_CHECK: &str = "/commerce/resources/onboarding/postcode/check";
const STREET_SUGGESTIONS: &str = "/commerce/resources/onboarding/street/suggestions";
const DRIVES: &str = "/commerce/resources/onboarding/drives";

/// Absolute URLs for one storefront origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Parses and validates the storefront origin. Any path, query, or
    /// fragment on `base_url` is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `base_url` is not an absolute
    /// `http`/`https` URL with a host.
    pub fn new(base_url: &str) -> Result<Self, ScraperError> {
        let invalid = |reason: String| ScraperError::InvalidUrl {
            url: base_url.to_owned(),
            reason,
        };

        let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", base.scheme())));
        }
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(invalid("URL has no host".to_owned()));
        }
        base.set_path("/");
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn at(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url
    }

    /// Page that seeds the session cookies for `mode`.
    #[must_use]
    pub fn landing(&self, mode: ServiceMode) -> Url {
        match mode {
            ServiceMode::HomeDelivery => self.at(DELIVERY_LANDING),
            ServiceMode::Pickup => self.at(PICKUP_LANDING),
        }
    }

    /// Navigation request that binds the session to `context`.
    #[must_use]
    pub fn visit(&self, context: &StoreContext) -> Url {
        match context.drive_id {
            None => {
                let mut url = self.at(DELIVERY_VISIT);
                url.query_pairs_mut()
                    .append_pair("streetId", &context.street_id.to_string());
                url
            }
            Some(drive_id) => {
                let mut url = self.at(PICKUP_VISIT);
                url.query_pairs_mut()
                    .append_pair("streetId", &context.street_id.to_string())
                    .append_pair("driveId", &drive_id.to_string());
                url
            }
        }
    }

    #[must_use]
    pub fn facet(&self) -> Url {
        self.at(FACET)
    }

    #[must_use]
    pub fn trolley(&self) -> Url {
        self.at(TROLLEY)
    }

    #[must_use]
    pub fn postcode_check(&self) -> Url {
        self.at(POSTCODE_CHECK)
    }

    #[must_use]
    pub fn street_suggestions(&self) -> Url {
        self.at(STREET_SUGGESTIONS)
    }

    #[must_use]
    pub fn drives(&self, street_id: StreetId) -> Url {
        self.at(&format!("{DRIVES}/{street_id}"))
    }

    /// Resolves a `Location` header value, absolute or relative, against the
    /// storefront origin.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the location cannot be joined.
    pub fn resolve_location(&self, location: &str) -> Result<Url, ScraperError> {
        self.base
            .join(location)
            .map_err(|e| ScraperError::InvalidUrl {
                url: location.to_owned(),
                reason: e.to_string(),
            })
    }
}
