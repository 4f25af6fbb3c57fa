use thiserror::Error;

/// Maximum number of characters of a response body kept in protocol errors.
const PAYLOAD_EXCERPT_CHARS: usize = 240;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("upstream protocol error for {context}: {reason}")]
    UpstreamProtocol {
        context: String,
        reason: String,
        /// Leading slice of the offending payload, for diagnostics.
        payload_excerpt: Option<String>,
    },

    #[error("malformed product {product_ref}: {reason}")]
    MalformedProduct { product_ref: String, reason: String },

    #[error("no candidate stores for reference {reference}")]
    NoCandidate { reference: String },

    #[error("no home-delivery street known for reference {reference}")]
    NoReferenceContext { reference: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Coarse error taxonomy used by the retry policy and batch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network failure, timeout, 5xx or 429: worth retrying.
    TransientFetch,
    /// The server answered with something we do not understand.
    UpstreamProtocol,
    /// One product record could not be normalized.
    MalformedProduct,
    /// Resolution had nothing to compare against.
    NoCandidate,
}

impl ScraperError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            ScraperError::Http(e) => {
                if e.is_builder() || e.is_decode() {
                    ErrorClass::UpstreamProtocol
                } else if let Some(status) = e.status() {
                    status_class(status.as_u16())
                } else {
                    ErrorClass::TransientFetch
                }
            }
            ScraperError::Timeout { .. } => ErrorClass::TransientFetch,
            ScraperError::UnexpectedStatus { status, .. } => status_class(*status),
            ScraperError::UpstreamProtocol { .. } | ScraperError::InvalidUrl { .. } => {
                ErrorClass::UpstreamProtocol
            }
            ScraperError::MalformedProduct { .. } => ErrorClass::MalformedProduct,
            ScraperError::NoCandidate { .. } | ScraperError::NoReferenceContext { .. } => {
                ErrorClass::NoCandidate
            }
        }
    }

    /// Returns `true` if retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::TransientFetch
    }

    pub(crate) fn protocol(
        context: impl Into<String>,
        reason: impl Into<String>,
        payload: Option<&str>,
    ) -> Self {
        ScraperError::UpstreamProtocol {
            context: context.into(),
            reason: reason.into(),
            payload_excerpt: payload.map(excerpt),
        }
    }
}

fn status_class(status: u16) -> ErrorClass {
    if status == 429 || (500..600).contains(&status) {
        ErrorClass::TransientFetch
    } else {
        ErrorClass::UpstreamProtocol
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(PAYLOAD_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_owned(),
    }
}
