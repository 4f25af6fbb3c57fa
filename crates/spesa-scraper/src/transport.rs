//! HTTP seam between the scraper and the network.
//!
//! The storefront's handshake depends on seeing raw 3xx responses, so
//! sessions never follow redirects on their own. Each session owns its own
//! cookie jar; nothing is shared across sessions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;

use crate::error::ScraperError;

/// Status, headers, and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header pairs in arrival order; names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(value.to_string())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// First value of header `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of cookie `name` set by this response through `Set-Cookie`.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, v)| v.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| k.trim() == name)
            .map(|(_, v)| v.trim())
    }
}

/// One cookie-carrying conversation with the storefront.
#[async_trait]
pub trait HttpSession: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, &str)])
        -> Result<HttpResponse, ScraperError>;

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, ScraperError>;
}

/// Factory for independent sessions.
pub trait HttpTransport: Send + Sync {
    /// Opens a fresh session with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the underlying client cannot be built.
    fn open_session(&self) -> Result<Box<dyn HttpSession>, ScraperError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
    user_agent: String,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(timeout_secs: u64, user_agent: &str) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            user_agent: user_agent.to_owned(),
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn open_session(&self) -> Result<Box<dyn HttpSession>, ScraperError> {
        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json, text/plain, */*"),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .default_headers(default_headers)
            .cookie_store(true)
            .redirect(Policy::none())
            .build()?;
        Ok(Box::new(ReqwestSession { client }))
    }
}

struct ReqwestSession {
    client: reqwest::Client,
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, ScraperError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        into_http_response(request.send().await?).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, ScraperError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        into_http_response(request.send().await?).await
    }
}

async fn into_http_response(response: reqwest::Response) -> Result<HttpResponse, ScraperError> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();
    let body = response.text().await?;
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(302).with_header("Location", "/home");
        assert_eq!(response.header("location"), Some("/home"));
        assert_eq!(response.header("LOCATION"), Some("/home"));
        assert!(response.is_redirect());
        assert!(!response.is_success());
    }

    #[test]
    fn cookie_reads_named_set_cookie() {
        let response = HttpResponse::new(200)
            .with_header("Set-Cookie", "JSESSIONID=abc; Path=/; HttpOnly")
            .with_header("Set-Cookie", "XSRF-ECOM-TOKEN=tok-123; Path=/");
        assert_eq!(response.cookie("XSRF-ECOM-TOKEN"), Some("tok-123"));
        assert_eq!(response.cookie("JSESSIONID"), Some("abc"));
        assert_eq!(response.cookie("missing"), None);
    }

    #[test]
    fn reqwest_transport_opens_independent_sessions() {
        let transport = ReqwestTransport::new(5, "spesa-test/0.1");
        assert!(transport.open_session().is_ok());
        assert!(transport.open_session().is_ok());
    }
}
