//! County reference data and region-to-county projection

use crate::model::{AggregateState, RegionId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Static description of a county served by one balancing authority
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountyProfile {
    pub name: &'static str,
    /// Balancing authority serving the county
    pub region: &'static str,
    /// Fraction of the authority's load attributed to the county
    pub service_share: f64,
    pub population: u64,
    /// Daily consumption baseline used for historical synthesis (MWh)
    pub base_consumption_mwh: f64,
    pub base_renewable_pct: f64,
}

pub const COUNTIES: &[CountyProfile] = &[
    CountyProfile {
        name: "Maricopa",
        region: "AZPS",
        service_share: 0.7,
        population: 4_485_414,
        base_consumption_mwh: 3_500_000.0,
        base_renewable_pct: 18.5,
    },
    CountyProfile {
        name: "Pima",
        region: "AZPS",
        service_share: 0.3,
        population: 1_043_433,
        base_consumption_mwh: 680_000.0,
        base_renewable_pct: 22.3,
    },
    CountyProfile {
        name: "Pinal",
        region: "AZPS",
        service_share: 0.8,
        population: 425_264,
        base_consumption_mwh: 320_000.0,
        base_renewable_pct: 15.8,
    },
    CountyProfile {
        name: "Yavapai",
        region: "AZPS",
        service_share: 0.6,
        population: 236_209,
        base_consumption_mwh: 190_000.0,
        base_renewable_pct: 25.1,
    },
    CountyProfile {
        name: "Coconino",
        region: "AZPS",
        service_share: 0.5,
        population: 145_101,
        base_consumption_mwh: 120_000.0,
        base_renewable_pct: 28.4,
    },
    CountyProfile {
        name: "Navajo",
        region: "AZPS",
        service_share: 0.5,
        population: 106_717,
        base_consumption_mwh: 85_000.0,
        base_renewable_pct: 31.2,
    },
    CountyProfile {
        name: "Cochise",
        region: "AZPS",
        service_share: 0.4,
        population: 125_447,
        base_consumption_mwh: 100_000.0,
        base_renewable_pct: 19.7,
    },
    CountyProfile {
        name: "Yuma",
        region: "WALC",
        service_share: 0.5,
        population: 203_881,
        base_consumption_mwh: 160_000.0,
        base_renewable_pct: 16.9,
    },
    CountyProfile {
        name: "Mohave",
        region: "WALC",
        service_share: 0.5,
        population: 213_267,
        base_consumption_mwh: 170_000.0,
        base_renewable_pct: 14.2,
    },
    CountyProfile {
        name: "Gila",
        region: "SRP",
        service_share: 0.4,
        population: 53_272,
        base_consumption_mwh: 42_000.0,
        base_renewable_pct: 35.6,
    },
];

/// Baseline for counties missing from [`COUNTIES`]
pub const DEFAULT_BASE_CONSUMPTION_MWH: f64 = 100_000.0;
pub const DEFAULT_BASE_RENEWABLE_PCT: f64 = 20.0;

/// Case-insensitive lookup by county name
pub fn lookup(name: &str) -> Option<&'static CountyProfile> {
    let name = name.trim();
    COUNTIES.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Historical baseline `(consumption_mwh, renewable_pct)` for a county
pub fn historical_baseline(name: &str) -> (f64, f64) {
    lookup(name).map_or(
        (DEFAULT_BASE_CONSUMPTION_MWH, DEFAULT_BASE_RENEWABLE_PCT),
        |c| (c.base_consumption_mwh, c.base_renewable_pct),
    )
}

/// Canonical spelling used as a cache key and map key
pub fn canonical_name(name: &str) -> String {
    lookup(name).map_or_else(|| name.trim().to_string(), |c| c.name.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GridStress {
    Low,
    Normal,
    Moderate,
    High,
}

impl GridStress {
    /// Classify by demand/generation utilisation
    pub fn from_readings(demand: f64, generation: f64) -> Self {
        let capacity = if generation == 0.0 { demand } else { generation };
        if capacity == 0.0 {
            return Self::Low;
        }
        let utilisation = demand / capacity;
        if utilisation > 0.9 {
            Self::High
        } else if utilisation > 0.75 {
            Self::Moderate
        } else if utilisation > 0.5 {
            Self::Normal
        } else {
            Self::Low
        }
    }
}

/// Per-county estimate derived from its balancing authority
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyUpdate {
    pub current_consumption_kwh: f64,
    pub current_generation_kwh: f64,
    pub grid_stress: GridStress,
    pub last_updated: DateTime<Utc>,
    /// False when the serving region was not part of the snapshot
    pub is_real_time: bool,
}

/// Project a snapshot onto every known county
pub fn county_updates(state: &AggregateState) -> BTreeMap<String, CountyUpdate> {
    COUNTIES
        .iter()
        .map(|county| {
            let update = match state.region(&RegionId::new(county.region)) {
                Some(reading) => CountyUpdate {
                    current_consumption_kwh: (reading.demand * county.service_share * 1000.0)
                        .round(),
                    current_generation_kwh: (reading.generation * county.service_share * 1000.0)
                        .round(),
                    grid_stress: GridStress::from_readings(reading.demand, reading.generation),
                    last_updated: state.timestamp(),
                    is_real_time: true,
                },
                None => CountyUpdate {
                    current_consumption_kwh: 0.0,
                    current_generation_kwh: 0.0,
                    grid_stress: GridStress::Low,
                    last_updated: state.timestamp(),
                    is_real_time: false,
                },
            };
            (county.name.to_string(), update)
        })
        .collect()
}
