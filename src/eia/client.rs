use super::parse::merge_region_records;
use super::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use super::{REGION_DATA_PATH, RETAIL_SALES_PATH};
use crate::cache::ResponseCache;
use crate::clock::Clock;
use crate::config::EiaConfig;
use crate::error::{GridwatchError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::model::{AggregateState, RegionId};
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Hour-resolution timestamp format accepted by the `start`/`end` parameters
const WINDOW_FORMAT: &str = "%Y-%m-%dT%H";
const WINDOW_HOURS: i64 = 24;
const PAGE_LENGTH: &str = "5000";
const RATE_CACHE_KEY: &str = "residential-rate";
/// Upstream bodies are truncated before being carried in errors
const MAX_ERROR_BODY: usize = 512;

/// EIA API client with a short-lived response cache
pub struct EiaClient {
    api_key: String,
    base_url: String,
    state_id: String,
    fallback_rate: f64,
    transport: Arc<dyn HttpTransport>,
    snapshot_cache: ResponseCache<AggregateState>,
    rate_cache: ResponseCache<f64>,
    clock: Arc<dyn Clock>,
    logger: StructuredLogger,
}

impl EiaClient {
    /// Build a client backed by reqwest
    pub fn from_config(config: &EiaConfig, live_ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::with_transport(config, live_ttl, Arc::new(transport), clock))
    }

    /// Build a client on top of an arbitrary transport
    pub fn with_transport(
        config: &EiaConfig,
        live_ttl: Duration,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api_key: config.api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            state_id: config.state_id.trim().to_ascii_uppercase(),
            fallback_rate: config.fallback_residential_rate,
            transport,
            snapshot_cache: ResponseCache::with_clock(live_ttl, clock.clone()),
            rate_cache: ResponseCache::with_clock(live_ttl, clock.clone()),
            clock,
            logger: get_logger("eia"),
        }
    }

    /// True iff a non-blank API key is present
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Fetch and merge the latest readings for `regions`.
    ///
    /// One request per region, issued concurrently. The first failure aborts
    /// the whole call; nothing is cached in that case.
    pub async fn fetch_snapshot(&self, regions: &[RegionId]) -> Result<AggregateState> {
        if !self.is_configured() {
            return Err(GridwatchError::configuration("EIA API key not configured"));
        }

        let key = snapshot_cache_key(regions);
        if let Some(hit) = self.snapshot_cache.get(&key) {
            self.logger
                .debug(&format!("Serving region data from cache ({})", key));
            return Ok(hit);
        }

        let now = self.clock.now();
        let end = now.format(WINDOW_FORMAT).to_string();
        let start = (now - chrono::Duration::hours(WINDOW_HOURS))
            .format(WINDOW_FORMAT)
            .to_string();

        let batches = try_join_all(
            regions
                .iter()
                .map(|region| self.fetch_region_records(region, &start, &end)),
        )
        .await?;
        let records: Vec<Value> = batches.into_iter().flatten().collect();

        let outcome = merge_region_records(regions, &records);
        if outcome.unparsed_values > 0 {
            self.logger.debug(&format!(
                "{} record value(s) could not be parsed and were counted as zero",
                outcome.unparsed_values
            ));
        }

        let state = AggregateState::from_regions(now, outcome.per_region)?;
        self.logger.info(&format!(
            "Fetched live data for {} region(s) from {} records: demand {:.0} MW",
            regions.len(),
            records.len(),
            state.state_total().total_demand
        ));
        self.snapshot_cache.put(&key, state.clone());
        Ok(state)
    }

    async fn fetch_region_records(
        &self,
        region: &RegionId,
        start: &str,
        end: &str,
    ) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, REGION_DATA_PATH);
        let query = vec![
            param("api_key", &self.api_key),
            param("frequency", "hourly"),
            param("data[0]", "value"),
            param("facets[respondent][]", region.as_str()),
            param("start", start),
            param("end", end),
            param("sort[0][column]", "period"),
            param("sort[0][direction]", "desc"),
            param("offset", "0"),
            param("length", PAGE_LENGTH),
        ];

        let resp = self.transport.get(&url, &query).await?;
        let data = response_data(&resp)?;
        self.logger.debug(&format!(
            "Received {} records for {}",
            data.len(),
            region
        ));
        Ok(data)
    }

    /// Most recent residential retail price in cents/kWh.
    ///
    /// Never fails: missing credentials, transport errors and unusable
    /// values all resolve to the configured fallback rate.
    pub async fn fetch_residential_rate(&self) -> f64 {
        if !self.is_configured() {
            return self.fallback_rate;
        }
        if let Some(rate) = self.rate_cache.get(RATE_CACHE_KEY) {
            return rate;
        }
        match self.request_residential_rate().await {
            Ok(rate) => {
                self.rate_cache.put(RATE_CACHE_KEY, rate);
                rate
            }
            Err(e) => {
                self.logger.warn(&format!(
                    "Residential rate unavailable, using fallback {}: {}",
                    self.fallback_rate, e
                ));
                self.fallback_rate
            }
        }
    }

    async fn request_residential_rate(&self) -> Result<f64> {
        let url = format!("{}{}", self.base_url, RETAIL_SALES_PATH);
        let query = vec![
            param("api_key", &self.api_key),
            param("frequency", "monthly"),
            param("data[0]", "price"),
            param("facets[sectorid][]", "RES"),
            param("facets[stateid][]", &self.state_id),
            param("sort[0][column]", "period"),
            param("sort[0][direction]", "desc"),
            param("offset", "0"),
            param("length", "1"),
        ];

        let resp = self.transport.get(&url, &query).await?;
        let data = response_data(&resp)?;
        let price = data
            .first()
            .and_then(|row| row.get("price"))
            .ok_or_else(|| GridwatchError::parse("retail sales response carries no price"))?;
        super::coerce_value(price)
    }

    /// Drop all cached snapshots and rates
    pub fn clear_cache(&self) {
        self.snapshot_cache.clear();
        self.rate_cache.clear();
        self.logger.debug("Response cache cleared");
    }
}

fn param(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn snapshot_cache_key(regions: &[RegionId]) -> String {
    let ids: Vec<&str> = regions.iter().map(RegionId::as_str).collect();
    format!("region-data:{}", ids.join(","))
}

/// Extract `response.data` from a successful envelope
fn response_data(resp: &HttpResponse) -> Result<Vec<Value>> {
    if !resp.is_success() {
        return Err(GridwatchError::upstream(resp.status, truncate(&resp.body)));
    }
    let envelope: Value = serde_json::from_str(&resp.body).map_err(|e| {
        GridwatchError::upstream(resp.status, format!("malformed envelope: {}", e))
    })?;
    envelope
        .get("response")
        .and_then(|r| r.get("data"))
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| GridwatchError::upstream(resp.status, "envelope lacks response.data"))
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_joins_regions() {
        let regions = vec![RegionId::new("azps"), RegionId::new("SRP")];
        assert_eq!(snapshot_cache_key(&regions), "region-data:AZPS,SRP");
    }

    #[test]
    fn non_success_status_is_upstream_error() {
        let resp = HttpResponse {
            status: 503,
            body: "unavailable".to_string(),
        };
        match response_data(&resp) {
            Err(GridwatchError::Upstream { status_code, body }) => {
                assert_eq!(status_code, 503);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn missing_data_is_upstream_error() {
        let resp = HttpResponse {
            status: 200,
            body: r#"{"response": {"total": 0}}"#.to_string(),
        };
        assert!(matches!(
            response_data(&resp),
            Err(GridwatchError::Upstream { status_code: 200, .. })
        ));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        let out = truncate(&body);
        assert_eq!(out.len(), MAX_ERROR_BODY + 3);
        assert!(out.ends_with("..."));
    }
}
