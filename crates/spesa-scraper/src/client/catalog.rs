//! Full-catalog walk for one store context.

use std::time::Duration;

use chrono::Utc;
use spesa_core::{Catalog, RawProduct, StoreContext};

use crate::error::ScraperError;

use super::{SpesaClient, StoreSession};

impl SpesaClient {
    /// Binds a session to `context` and reads its entire catalog.
    ///
    /// The walk re-reads the server's total on every page and stops once the
    /// cursor reaches `min(latest_total, item_ceiling)`, or on an empty page.
    ///
    /// **All-or-nothing semantics**: if any page fails, products from earlier
    /// pages are discarded and the error is returned. A partial catalog would
    /// skew both the total-count term and the price distance when scored.
    ///
    /// # Errors
    ///
    /// Propagates handshake and page errors from [`StoreSession`].
    pub async fn harvest_catalog(&self, context: &StoreContext) -> Result<Catalog, ScraperError> {
        let session = self.open_session(context).await?;
        self.walk_catalog(&session).await
    }

    /// Pages through the catalog of an already-bound session.
    ///
    /// # Errors
    ///
    /// Propagates any page error from [`StoreSession::facet_page`].
    pub async fn walk_catalog(&self, session: &StoreSession) -> Result<Catalog, ScraperError> {
        let context = *session.context();
        let page_size = self.settings.page_size;
        let ceiling = self.settings.item_ceiling;
        let delay_ms = self.settings.inter_page_delay_ms;

        let mut products: Vec<RawProduct> = Vec::new();
        let mut cursor: u64 = 0;
        let mut latest_total: Option<u64> = None;
        let mut pages = 0usize;

        loop {
            let bound = latest_total.map_or(ceiling, |total| total.min(ceiling));
            if cursor >= bound {
                break;
            }

            if pages > 0 && delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let page = session.facet_page(cursor, page_size).await?;
            pages += 1;

            match latest_total {
                Some(previous) if previous != page.row_count => tracing::debug!(
                    %context,
                    previous,
                    current = page.row_count,
                    "catalog total changed mid-walk"
                ),
                None if page.row_count > ceiling => tracing::warn!(
                    %context,
                    reported = page.row_count,
                    ceiling,
                    "catalog larger than item ceiling, truncating"
                ),
                _ => {}
            }
            latest_total = Some(page.row_count);

            if page.entities.is_empty() {
                if cursor < page.row_count.min(ceiling) {
                    tracing::warn!(
                        %context,
                        cursor,
                        reported = page.row_count,
                        "empty page before reported total, stopping"
                    );
                }
                break;
            }

            products.extend(page.entities.into_iter().map(RawProduct));
            cursor += u64::from(page_size);
        }

        products.truncate(usize::try_from(ceiling).unwrap_or(usize::MAX));
        let reported_total = latest_total.unwrap_or(0);
        tracing::debug!(
            %context,
            pages,
            fetched = products.len(),
            reported_total,
            "catalog walk complete"
        );

        Ok(Catalog {
            context,
            reported_total,
            products,
            captured_at: Utc::now(),
        })
    }
}
