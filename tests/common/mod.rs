#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gridwatch::clock::ManualClock;
use gridwatch::config::Config;
use gridwatch::eia::{HttpResponse, HttpTransport};
use gridwatch::error::Result;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

type Responder = Box<dyn Fn(&str, &[(String, String)]) -> HttpResponse + Send + Sync>;

/// Records every request and answers through a closure
pub struct SpyTransport {
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    responder: Responder,
}

impl SpyTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&str, &[(String, String)]) -> HttpResponse + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    pub fn json(body: Value) -> Arc<Self> {
        Self::new(move |_, _| ok(&body))
    }

    pub fn status(status: u16, body: &str) -> Arc<Self> {
        let body = body.to_string();
        Self::new(move |_, _| HttpResponse {
            status,
            body: body.clone(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for SpyTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), query.to_vec()));
        Ok((self.responder)(url, query))
    }
}

/// Blocks every request until the test opens the gate
pub struct GatedTransport {
    pub inner: Arc<SpyTransport>,
    pub entered: Notify,
    gate: Semaphore,
}

impl GatedTransport {
    pub fn new(inner: Arc<SpyTransport>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            entered: Notify::new(),
            gate: Semaphore::new(0),
        })
    }

    pub fn open(&self) {
        self.gate.add_permits(1000);
    }
}

#[async_trait]
impl HttpTransport for GatedTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        self.entered.notify_one();
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.get(url, query).await
    }
}

pub fn ok(body: &Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: body.to_string(),
    }
}

pub fn envelope(records: Vec<Value>) -> Value {
    let total = records.len();
    json!({
        "response": {
            "total": total,
            "dateFormat": "YYYY-MM-DD\"T\"HH24",
            "frequency": "hourly",
            "description": "Hourly demand, generation and interchange",
            "data": records,
        }
    })
}

pub fn record(respondent: &str, type_code: &str, value: f64) -> Value {
    json!({
        "period": "2025-07-01T11",
        "respondent": respondent,
        "type": type_code,
        "value": value,
    })
}

pub fn query_value<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Answers region-data requests with records for the requested respondent only
pub fn region_transport(readings: Vec<(&'static str, f64, f64, f64)>) -> Arc<SpyTransport> {
    SpyTransport::new(move |_, query| {
        let respondent = query_value(query, "facets[respondent][]").unwrap_or_default();
        let records: Vec<Value> = readings
            .iter()
            .filter(|(r, ..)| *r == respondent)
            .flat_map(|(r, d, g, i)| {
                vec![record(r, "D", *d), record(r, "NG", *g), record(r, "TI", *i)]
            })
            .collect();
        ok(&envelope(records))
    })
}

pub fn start_time() -> DateTime<Utc> {
    // A Tuesday, 15:00 in Phoenix
    Utc.with_ymd_and_hms(2025, 7, 1, 22, 0, 0).unwrap()
}

pub fn clock() -> ManualClock {
    ManualClock::new(start_time())
}

pub fn config(api_key: &str) -> Config {
    let mut cfg = Config::default();
    cfg.eia.api_key = api_key.to_string();
    cfg.network.probe_enabled = false;
    cfg.synthesis_seed = Some(42);
    cfg
}

/// Like [`region_transport`], but `failing` answers 503
pub fn partial_outage_transport(
    readings: Vec<(&'static str, f64, f64, f64)>,
    failing: &'static str,
) -> Arc<SpyTransport> {
    let healthy = region_transport(readings);
    SpyTransport::new(move |url, query| {
        if query_value(query, "facets[respondent][]") == Some(failing) {
            HttpResponse {
                status: 503,
                body: "balancing authority unavailable".to_string(),
            }
        } else {
            (healthy.responder)(url, query)
        }
    })
}
