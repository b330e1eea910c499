//! Payload published on the data channel after each cycle

use crate::counties::{self, CountyUpdate};
use crate::factors::{RealTimeFactors, StateMetrics};
use crate::model::AggregateState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Where the readings in an update came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeUpdate {
    pub timestamp: DateTime<Utc>,
    pub aggregate: AggregateState,
    pub real_time_factors: RealTimeFactors,
    pub county_updates: BTreeMap<String, CountyUpdate>,
    pub state_metrics: StateMetrics,
    pub source: DataSource,
}

impl RealTimeUpdate {
    /// Assemble an update stamped `at`. Only the state total is scaled by the
    /// consumption multiplier; county figures are the raw projections.
    pub fn build(
        at: DateTime<Utc>,
        aggregate: AggregateState,
        factors: RealTimeFactors,
        source: DataSource,
    ) -> Self {
        let county_updates = counties::county_updates(&aggregate);
        let total: f64 = county_updates
            .values()
            .map(|c| c.current_consumption_kwh)
            .sum::<f64>()
            * factors.consumption_multiplier;
        let state_metrics = StateMetrics::new(total, &factors);
        Self {
            timestamp: at,
            aggregate,
            real_time_factors: factors,
            county_updates,
            state_metrics,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RegionId, RegionSnapshot};
    use chrono::Weekday;

    #[test]
    fn build_scales_state_consumption() {
        let mut regions = BTreeMap::new();
        regions.insert(
            RegionId::new("SRP"),
            RegionSnapshot {
                demand: 1000.0,
                generation: 1000.0,
                interchange: 0.0,
            },
        );
        let now = Utc::now();
        let aggregate = AggregateState::from_regions(now, regions).unwrap();
        let factors = RealTimeFactors::classify(15, Weekday::Tue);
        let update = RealTimeUpdate::build(now, aggregate, factors, DataSource::Synthetic);

        // Gila is the only SRP county: 1000 MW * 0.4 * 1000
        assert_eq!(update.county_updates["Gila"].current_consumption_kwh, 400_000.0);
        assert_eq!(update.state_metrics.total_current_consumption, 460_000.0);
        assert_eq!(update.timestamp, now);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["source"], "synthetic");
        assert!(json.get("realTimeFactors").is_some());
    }
}
