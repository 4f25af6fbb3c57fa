//! Client for the storefront's undocumented commerce API.

mod catalog;
mod endpoints;
mod onboarding;
mod session;

use std::sync::Arc;

use spesa_core::{AppConfig, StoreContext};

use crate::error::ScraperError;
use crate::transport::{HttpTransport, ReqwestTransport};

pub use endpoints::Endpoints;
pub use onboarding::pickup_entry;
pub use session::{StoreSession, XSRF_COOKIE};

/// Page length used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 99;

/// Largest page the search endpoint honours.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Hard cap on the number of listing items read for one store.
pub const DEFAULT_ITEM_CEILING: u64 = 20_000;

/// Catalog pagination knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub page_size: u32,
    pub item_ceiling: u64,
    pub inter_page_delay_ms: u64,
}

impl FetchSettings {
    /// Builds settings with `page_size` clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(page_size: u32, item_ceiling: u64, inter_page_delay_ms: u64) -> Self {
        let clamped = page_size.clamp(1, MAX_PAGE_SIZE);
        if clamped != page_size {
            tracing::warn!(
                requested = page_size,
                used = clamped,
                "page size out of range, clamping"
            );
        }
        Self {
            page_size: clamped,
            item_ceiling,
            inter_page_delay_ms,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            item_ceiling: DEFAULT_ITEM_CEILING,
            inter_page_delay_ms: 0,
        }
    }
}

/// Storefront client. Cheap to clone; every store context gets its own
/// transport session, so clones can be used concurrently.
#[derive(Clone)]
pub struct SpesaClient {
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
    settings: FetchSettings,
}

impl std::fmt::Debug for SpesaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpesaClient")
            .field("base", &self.endpoints.base().as_str())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SpesaClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `base_url` is not a usable origin.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
        settings: FetchSettings,
    ) -> Result<Self, ScraperError> {
        Ok(Self {
            transport,
            endpoints: Endpoints::new(base_url)?,
            settings,
        })
    }

    /// Production client over [`ReqwestTransport`], configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the configured base URL is unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let transport = ReqwestTransport::new(config.request_timeout_secs, &config.user_agent);
        Self::new(
            Arc::new(transport),
            &config.base_url,
            FetchSettings::new(
                config.page_size,
                config.item_ceiling,
                config.inter_page_delay_ms,
            ),
        )
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Opens a fresh transport session and binds it to `context`.
    ///
    /// # Errors
    ///
    /// Propagates transport and handshake errors from [`StoreSession`].
    pub async fn open_session(&self, context: &StoreContext) -> Result<StoreSession, ScraperError> {
        let http = self.transport.open_session()?;
        StoreSession::open(http, self.endpoints.clone(), *context).await
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
