//! Store-bound sessions.
//!
//! A [`StoreSession`] can only be obtained by completing the visit handshake,
//! so every data request it issues runs against a session the server has
//! already bound to one [`StoreContext`].

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use spesa_core::{StoreContext, StoreRef};

use crate::error::ScraperError;
use crate::transport::{HttpResponse, HttpSession};
use crate::types::{Displayables, FacetResponse, TrolleyResponse};

use super::endpoints::Endpoints;

/// Cookie carrying the anti-forgery token the trolley endpoint expects back.
pub const XSRF_COOKIE: &str = "XSRF-ECOM-TOKEN";

const PAGE_PATH_HEADER: &str = "x-page-path";
const XSRF_HEADER: &str = "x-xsrf-token";

pub struct StoreSession {
    http: Box<dyn HttpSession>,
    endpoints: Endpoints,
    context: StoreContext,
    xsrf_token: Option<String>,
}

impl std::fmt::Debug for StoreSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSession")
            .field("context", &self.context)
            .field("has_xsrf_token", &self.xsrf_token.is_some())
            .finish_non_exhaustive()
    }
}

impl StoreSession {
    /// Runs the landing + visit handshake on a fresh transport session.
    ///
    /// A 3xx visit answer is replayed once against its `Location`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UpstreamProtocol`] if a redirect has no `Location`.
    /// - [`ScraperError::UnexpectedStatus`] if the landing page answers 5xx or
    ///   the visit does not end in a 2xx.
    /// - [`ScraperError::Http`] on network failure.
    pub(crate) async fn open(
        http: Box<dyn HttpSession>,
        endpoints: Endpoints,
        context: StoreContext,
    ) -> Result<Self, ScraperError> {
        let page_path = context.mode().page_path();
        let headers = [(PAGE_PATH_HEADER, page_path)];
        let mut xsrf_token = None;

        let landing = endpoints.landing(context.mode());
        let response = http.get(landing.as_str(), &headers).await?;
        if response.status >= 500 {
            return Err(ScraperError::UnexpectedStatus {
                status: response.status,
                url: landing.to_string(),
            });
        }
        remember_token(&mut xsrf_token, &response);

        let visit = endpoints.visit(&context);
        let mut response = http.get(visit.as_str(), &headers).await?;
        remember_token(&mut xsrf_token, &response);
        let mut final_url = visit.to_string();

        if response.is_redirect() {
            let location = response.header("location").ok_or_else(|| {
                ScraperError::protocol(
                    format!("visit for {context}"),
                    format!("{} redirect without Location header", response.status),
                    Some(&response.body),
                )
            })?;
            let target = endpoints.resolve_location(location)?;
            tracing::debug!(%context, location = %target, "replaying visit redirect");
            response = http.get(target.as_str(), &headers).await?;
            remember_token(&mut xsrf_token, &response);
            final_url = target.to_string();
        }

        if !response.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: response.status,
                url: final_url,
            });
        }

        tracing::debug!(%context, has_xsrf_token = xsrf_token.is_some(), "session bound");
        Ok(Self {
            http,
            endpoints,
            context,
            xsrf_token,
        })
    }

    #[must_use]
    pub fn context(&self) -> &StoreContext {
        &self.context
    }

    #[must_use]
    pub fn xsrf_token(&self) -> Option<&str> {
        self.xsrf_token.as_deref()
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![(PAGE_PATH_HEADER, self.context.mode().page_path())];
        if let Some(token) = self.xsrf_token.as_deref() {
            headers.push((XSRF_HEADER, token));
        }
        headers
    }

    /// Fetches one page of the wildcard catalog search.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] on a non-2xx answer.
    /// - [`ScraperError::UpstreamProtocol`] if the body is not a facet payload.
    pub async fn facet_page(&self, start: u64, length: u32) -> Result<Displayables, ScraperError> {
        let url = self.endpoints.facet();
        let body = json!({
            "query": "*",
            "start": start,
            "length": length,
            "filters": [],
        });
        let response = self
            .http
            .post_json(url.as_str(), &body, &self.headers())
            .await?;
        let parsed: FacetResponse = parse_json(
            &response,
            url.as_str(),
            &format!("facet page at {start} for {}", self.context),
        )?;
        Ok(parsed.displayables)
    }

    /// Reads the store id the server bound to this session, if any.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`] on a non-2xx answer.
    /// - [`ScraperError::UpstreamProtocol`] if the body is not a trolley payload
    ///   or `storeId` is neither a number nor a string.
    pub async fn bound_store_id(&self) -> Result<Option<StoreRef>, ScraperError> {
        let url = self.endpoints.trolley();
        let response = self.http.get(url.as_str(), &self.headers()).await?;
        let context = format!("trolley for {}", self.context);
        let trolley: TrolleyResponse = parse_json(&response, url.as_str(), &context)?;

        match trolley.store_id {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(Some(StoreRef::new(n.to_string()))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(StoreRef::new(s.trim()))),
            Some(other) => Err(ScraperError::protocol(
                context,
                format!("storeId has unexpected type: {other}"),
                Some(&response.body),
            )),
        }
    }
}

fn remember_token(slot: &mut Option<String>, response: &HttpResponse) {
    if let Some(token) = response.cookie(XSRF_COOKIE) {
        *slot = Some(token.to_owned());
    }
}

/// Checks the status, then decodes the body as `T`.
pub(crate) fn parse_json<T: DeserializeOwned>(
    response: &HttpResponse,
    url: &str,
    context: &str,
) -> Result<T, ScraperError> {
    if !response.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: response.status,
            url: url.to_owned(),
        });
    }
    serde_json::from_str(&response.body).map_err(|e| {
        ScraperError::protocol(
            context,
            format!("unexpected payload shape: {e}"),
            Some(&response.body),
        )
    })
}
