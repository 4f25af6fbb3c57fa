//! In-memory storefront used by the resolver and topology tests.
//!
//! Each session remembers the context its visit request bound it to, then
//! answers facet and trolley requests from that context's fixture.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Value};
use spesa_core::{DriveId, StoreContext, StreetId};
use spesa_scraper::{
    Backoff, FetchSettings, HttpResponse, HttpSession, HttpTransport, RetryPolicy, ScraperError,
    SpesaClient, TaskRunner,
};

pub const BASE_URL: &str = "http://storefront.test";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub bound: Option<StoreContext>,
}

#[derive(Debug, Clone, Default)]
struct FakeStore {
    products: Vec<Value>,
    store_id: Option<Value>,
}

/// Fixture builder and transport in one.
#[derive(Debug, Clone, Default)]
pub struct FakeStorefront {
    stores: HashMap<StoreContext, FakeStore>,
    failing: HashSet<StoreContext>,
    latency: Option<Duration>,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
    live_sessions: Arc<AtomicUsize>,
    peak_sessions: Arc<AtomicUsize>,
}

impl FakeStorefront {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of `(id, price)` pairs served for `context`.
    pub fn catalog(mut self, context: StoreContext, items: &[(&str, &str)]) -> Self {
        let products = items
            .iter()
            .map(|(id, price)| {
                json!({
                    "id": id,
                    "description": format!("prodotto {id}"),
                    "price": price,
                })
            })
            .collect();
        self.stores.entry(context).or_default().products = products;
        self
    }

    /// Store id the trolley reports for a delivery session on `street`.
    pub fn store_id(mut self, street: StreetId, store: u64) -> Self {
        self.stores
            .entry(StoreContext::home_delivery(street))
            .or_default()
            .store_id = Some(json!(store));
        self
    }

    /// Every visit to `context` answers 500.
    pub fn failing(mut self, context: StoreContext) -> Self {
        self.failing.insert(context);
        self
    }

    /// Every request waits `latency` before answering.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Most transport sessions ever open at the same time.
    pub fn peak_sessions(&self) -> usize {
        self.peak_sessions.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn visits_to(&self, context: StoreContext) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.ends_with("/visit") && r.bound == Some(context))
            .count()
    }

    pub fn client(&self) -> SpesaClient {
        SpesaClient::new(Arc::new(self.clone()), BASE_URL, FetchSettings::default()).unwrap()
    }
}

impl HttpTransport for FakeStorefront {
    fn open_session(&self) -> Result<Box<dyn HttpSession>, ScraperError> {
        let live = self.live_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_sessions.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            storefront: self.clone(),
            bound: Mutex::new(None),
        }))
    }
}

struct FakeSession {
    storefront: FakeStorefront,
    bound: Mutex<Option<StoreContext>>,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.storefront.live_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeSession {
    async fn wait(&self) {
        if let Some(latency) = self.storefront.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(&self, method: &'static str, url: &Url) {
        let bound = *self.bound.lock().unwrap();
        self.storefront.log.lock().unwrap().push(RecordedRequest {
            method,
            path: url.path().to_owned(),
            bound,
        });
    }

    fn bound_store(&self) -> Option<FakeStore> {
        let bound = (*self.bound.lock().unwrap())?;
        self.storefront.stores.get(&bound).cloned()
    }
}

fn query_u64(url: &Url, name: &str) -> Option<u64> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .and_then(|(_, v)| v.parse().ok())
}

#[async_trait]
impl HttpSession for FakeSession {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse, ScraperError> {
        self.wait().await;
        let url = Url::parse(url).unwrap();

        if url.path().ends_with("/visit") {
            let street = StreetId(query_u64(&url, "streetId").unwrap());
            let context = match query_u64(&url, "driveId") {
                Some(drive) => StoreContext::pickup(street, DriveId(drive)),
                None => StoreContext::home_delivery(street),
            };
            *self.bound.lock().unwrap() = Some(context);
            self.record("GET", &url);
            if self.storefront.failing.contains(&context) {
                return Ok(HttpResponse::new(500));
            }
            return Ok(HttpResponse::new(200)
                .with_header("set-cookie", "XSRF-ECOM-TOKEN=fake-token; Path=/"));
        }

        self.record("GET", &url);
        if url.path().ends_with("/auth/trolley") {
            let store_id = self
                .bound_store()
                .and_then(|s| s.store_id)
                .unwrap_or(Value::Null);
            return Ok(HttpResponse::new(200).with_json(&json!({ "storeId": store_id })));
        }
        Ok(HttpResponse::new(200).with_body("<html></html>"))
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        _headers: &[(&str, &str)],
    ) -> Result<HttpResponse, ScraperError> {
        self.wait().await;
        let url = Url::parse(url).unwrap();
        self.record("POST", &url);
        if !url.path().ends_with("/search/facet") {
            return Ok(HttpResponse::new(404));
        }

        let products = self.bound_store().map(|s| s.products).unwrap_or_default();
        let start = usize::try_from(body["start"].as_u64().unwrap()).unwrap();
        let length = usize::try_from(body["length"].as_u64().unwrap()).unwrap();
        let page: Vec<Value> = products.iter().skip(start).take(length).cloned().collect();
        Ok(HttpResponse::new(200).with_json(&json!({
            "displayables": {
                "rowCount": products.len(),
                "entities": page,
            }
        })))
    }
}

/// Runner with no back-off so retries do not slow tests down.
pub fn fast_runner(concurrency: usize) -> TaskRunner {
    TaskRunner::new(
        concurrency,
        RetryPolicy::new(3, Backoff::None),
        Some(Duration::from_secs(5)),
    )
}
