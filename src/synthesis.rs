//! Synthetic data generation
//!
//! Produces plausible readings whenever live data is unavailable. Values follow
//! a fixed shape (per-entity baseline, July seasonal peak) with uniform jitter
//! drawn from an injected [`StdRng`], so a seeded engine is reproducible.

use crate::counties;
use crate::model::{HistoricalPoint, RegionId, RegionSnapshot};
use chrono::{DateTime, Datelike, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::f64::consts::PI;
use std::sync::{Mutex, PoisonError};

const JITTER_MIN: f64 = 0.85;
const JITTER_MAX: f64 = 1.15;
const RENEWABLE_NOISE: f64 = 2.5;
const RENEWABLE_GAIN_PER_YEAR: f64 = 1.5;
const RENEWABLE_GAIN_CAP: f64 = 10.0;
const RENEWABLE_CEILING: f64 = 50.0;
const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Typical `(demand, generation)` in MW per balancing authority
fn region_baseline(region: &RegionId) -> (f64, f64) {
    match region.as_str() {
        "AZPS" => (4200.0, 4550.0),
        "SRP" => (3800.0, 3650.0),
        "WALC" => (950.0, 1150.0),
        "TEPC" => (1900.0, 2050.0),
        _ => (1500.0, 1500.0),
    }
}

/// `1 + 0.3·sin(2π·month0/12 − π/2)`: lowest in January, highest in July
pub fn seasonal_multiplier(month0: u32) -> f64 {
    1.0 + 0.3 * (2.0 * PI * f64::from(month0) / 12.0 - PI / 2.0).sin()
}

/// Randomized generator behind a shared RNG
pub struct SynthesisEngine {
    rng: Mutex<StdRng>,
}

impl SynthesisEngine {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Seeded when `seed` is set, entropy-backed otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::with_seed)
    }

    fn jitter(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(JITTER_MIN..=JITTER_MAX)
    }

    fn renewable_noise(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(-RENEWABLE_NOISE..=RENEWABLE_NOISE)
    }

    /// Synthetic reading for one region; interchange balances the two others
    pub fn synthesize_region(&self, region: &RegionId, as_of: DateTime<Utc>) -> RegionSnapshot {
        let (demand_base, generation_base) = region_baseline(region);
        let season = seasonal_multiplier(as_of.month0());
        let demand = (demand_base * season * self.jitter()).round();
        let generation = (generation_base * season * self.jitter()).round();
        RegionSnapshot {
            demand,
            generation,
            interchange: generation - demand,
        }
    }

    /// Synthetic daily point for a county.
    ///
    /// Renewable share grows by 1.5 points per year elapsed since
    /// `window_start`, capped at 10 points, and is clamped to `[0, 50]`.
    pub fn synthesize_point(
        &self,
        county: &str,
        as_of: DateTime<Utc>,
        window_start: DateTime<Utc>,
    ) -> HistoricalPoint {
        let (base_consumption, base_renewable) = counties::historical_baseline(county);
        let season = seasonal_multiplier(as_of.month0());
        let consumption = (base_consumption * season * self.jitter()).round();

        let years = (as_of - window_start).num_seconds().max(0) as f64 / SECONDS_PER_YEAR;
        let improvement = (years * RENEWABLE_GAIN_PER_YEAR).min(RENEWABLE_GAIN_CAP);
        let renewable = (base_renewable + improvement + self.renewable_noise())
            .clamp(0.0, RENEWABLE_CEILING);

        HistoricalPoint {
            period_label: as_of.format("%Y-%m-%d").to_string(),
            consumption_mwh: consumption,
            renewable_percentage: (renewable * 10.0).round() / 10.0,
            timestamp: as_of,
        }
    }
}
