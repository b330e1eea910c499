//! Normalized data types shared by the client, the scheduler and consumers

use crate::error::{GridwatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Balancing authority code, normalized to upper case (e.g. `AZPS`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive match against a raw respondent code
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// One normalized reading for a balancing authority, in MW
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub demand: f64,
    pub generation: f64,
    pub interchange: f64,
}

impl RegionSnapshot {
    fn is_finite(&self) -> bool {
        self.demand.is_finite() && self.generation.is_finite() && self.interchange.is_finite()
    }
}

/// Cross-region totals derived from the per-region readings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTotal {
    pub total_demand: f64,
    pub total_generation: f64,
    pub total_interchange: f64,
}

/// Merged snapshot across all tracked regions.
///
/// Only constructible through [`AggregateState::from_regions`], which derives
/// the totals from the per-region readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    timestamp: DateTime<Utc>,
    per_region: BTreeMap<RegionId, RegionSnapshot>,
    state_total: StateTotal,
}

impl AggregateState {
    /// Build the aggregate; rejects non-finite readings
    pub fn from_regions(
        timestamp: DateTime<Utc>,
        per_region: BTreeMap<RegionId, RegionSnapshot>,
    ) -> Result<Self> {
        if let Some((region, _)) = per_region.iter().find(|(_, s)| !s.is_finite()) {
            return Err(GridwatchError::validation(
                "per_region".to_string(),
                format!("non-finite reading for {}", region),
            ));
        }
        let state_total = per_region
            .values()
            .fold(StateTotal::default(), |acc, s| StateTotal {
                total_demand: acc.total_demand + s.demand,
                total_generation: acc.total_generation + s.generation,
                total_interchange: acc.total_interchange + s.interchange,
            });
        Ok(Self {
            timestamp,
            per_region,
            state_total,
        })
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub const fn per_region(&self) -> &BTreeMap<RegionId, RegionSnapshot> {
        &self.per_region
    }

    pub fn region(&self, id: &RegionId) -> Option<&RegionSnapshot> {
        self.per_region.get(id)
    }

    pub const fn state_total(&self) -> &StateTotal {
        &self.state_total
    }
}

/// One aggregated period of a historical series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPoint {
    /// "Jan 2025" for months, "2025" for years, ISO date for daily sub-points
    pub period_label: String,
    pub consumption_mwh: f64,
    /// Renewable share in percent (0-100)
    pub renewable_percentage: f64,
    pub timestamp: DateTime<Utc>,
}

/// Monthly (12 points) and yearly (10 points) series for one county
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalData {
    pub monthly_data: Vec<HistoricalPoint>,
    pub yearly_data: Vec<HistoricalPoint>,
}
