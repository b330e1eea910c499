//! Monthly and yearly rollups per county
//!
//! Each period is requested from a [`PeriodSource`] and collapsed into one
//! [`HistoricalPoint`]. Periods that fail or come back empty are filled with a
//! synthesized point, so a series always has its full length.

use crate::cache::ResponseCache;
use crate::clock::Clock;
use crate::counties;
use crate::error::{GridwatchError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context};
use crate::model::{HistoricalData, HistoricalPoint};
use crate::synthesis::SynthesisEngine;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use futures::future::join_all;
use std::sync::Arc;

pub const MONTHS: usize = 12;
pub const YEARS: usize = 10;

/// Supplies raw points for one county and period (inclusive bounds).
///
/// `window_start` is the start of the whole series the period belongs to.
#[async_trait]
pub trait PeriodSource: Send + Sync {
    async fn fetch_period(
        &self,
        county: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<HistoricalPoint>>;
}

/// Daily synthetic points; refuses to run without upstream credentials
pub struct SyntheticPeriodSource {
    upstream_configured: bool,
    synth: Arc<SynthesisEngine>,
}

impl SyntheticPeriodSource {
    pub const fn new(upstream_configured: bool, synth: Arc<SynthesisEngine>) -> Self {
        Self {
            upstream_configured,
            synth,
        }
    }
}

#[async_trait]
impl PeriodSource for SyntheticPeriodSource {
    async fn fetch_period(
        &self,
        county: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<HistoricalPoint>> {
        if !self.upstream_configured {
            return Err(GridwatchError::configuration("EIA API not configured"));
        }
        let mut points = Vec::new();
        let mut day = start;
        while day <= end {
            points.push(self.synth.synthesize_point(county, day, window_start));
            day += Duration::days(1);
        }
        Ok(points)
    }
}

/// One period to roll up
#[derive(Debug, Clone)]
struct Period {
    label: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| GridwatchError::generic(format!("invalid month {}-{}", year, month)))
}

/// The last `MONTHS` calendar months ending with the current one, oldest first
fn monthly_periods(now: DateTime<Utc>) -> Result<Vec<Period>> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..MONTHS as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            let start = first_of_month(index.div_euclid(12), index.rem_euclid(12) as u32 + 1)?;
            let next = index + 1;
            let next_start = first_of_month(next.div_euclid(12), next.rem_euclid(12) as u32 + 1)?;
            let end = next_start
                .pred_opt()
                .ok_or_else(|| GridwatchError::generic("date underflow"))?;
            Ok(Period {
                label: start.format("%b %Y").to_string(),
                start: utc_midnight(start),
                end: utc_midnight(end),
            })
        })
        .collect()
}

/// The last `YEARS` calendar years ending with the current one, oldest first
fn yearly_periods(now: DateTime<Utc>) -> Result<Vec<Period>> {
    (0..YEARS as i32)
        .rev()
        .map(|back| {
            let year = now.year() - back;
            let start = first_of_month(year, 1)?;
            let end = NaiveDate::from_ymd_opt(year, 12, 31)
                .ok_or_else(|| GridwatchError::generic(format!("invalid year {}", year)))?;
            Ok(Period {
                label: year.to_string(),
                start: utc_midnight(start),
                end: utc_midnight(end),
            })
        })
        .collect()
}

/// The middle of a period
fn midpoint(period: &Period) -> DateTime<Utc> {
    period.start + (period.end - period.start) / 2
}

/// Sum consumption and average renewable share
fn aggregate(points: &[HistoricalPoint], label: &str, at: DateTime<Utc>) -> Option<HistoricalPoint> {
    if points.is_empty() {
        return None;
    }
    let consumption: f64 = points.iter().map(|p| p.consumption_mwh).sum();
    let renewable =
        points.iter().map(|p| p.renewable_percentage).sum::<f64>() / points.len() as f64;
    Some(HistoricalPoint {
        period_label: label.to_string(),
        consumption_mwh: consumption.round(),
        renewable_percentage: (renewable * 10.0).round() / 10.0,
        timestamp: at,
    })
}

/// Rollup builder with its own 30-minute cache
pub struct HistoricalAggregator {
    source: Arc<dyn PeriodSource>,
    synth: Arc<SynthesisEngine>,
    cache: ResponseCache<HistoricalData>,
    clock: Arc<dyn Clock>,
    logger: StructuredLogger,
}

impl HistoricalAggregator {
    pub fn new(
        source: Arc<dyn PeriodSource>,
        synth: Arc<SynthesisEngine>,
        ttl: std::time::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            synth,
            cache: ResponseCache::with_clock(ttl, clock.clone()),
            clock,
            logger: get_logger("historical"),
        }
    }

    /// Twelve monthly and ten yearly points for `county`; never fails.
    ///
    /// Only counties from the county table are cached.
    pub async fn get_series(&self, county: &str) -> HistoricalData {
        let known = counties::lookup(county).is_some();
        let county = counties::canonical_name(county);
        let context = LogContext::new("historical").with_entity(&county);
        let logger = get_logger_with_context(context.clone());

        if known && let Some(hit) = self.cache.get(&county) {
            logger.debug("Serving historical data from cache");
            return hit;
        }

        match self.build_series(&county, &context).await {
            Ok(data) => {
                if known {
                    self.cache.put(&county, data.clone());
                } else {
                    logger.debug("Unknown county, series not cached");
                }
                logger.info("Built historical series");
                data
            }
            Err(e) => {
                logger.error(&format!("Historical series failed, using fallback: {}", e));
                self.fallback_series(&county)
            }
        }
    }

    async fn build_series(&self, county: &str, context: &LogContext) -> Result<HistoricalData> {
        let now = self.clock.now();
        let months = monthly_periods(now)?;
        let years = yearly_periods(now)?;

        let monthly_log =
            get_logger_with_context(context.clone().with_field("series", "monthly".to_string()));
        let yearly_log =
            get_logger_with_context(context.clone().with_field("series", "yearly".to_string()));
        let (monthly_data, yearly_data) = futures::join!(
            self.roll_up(county, &months, &monthly_log),
            self.roll_up(county, &years, &yearly_log)
        );
        Ok(HistoricalData {
            monthly_data,
            yearly_data,
        })
    }

    async fn roll_up(
        &self,
        county: &str,
        periods: &[Period],
        logger: &StructuredLogger,
    ) -> Vec<HistoricalPoint> {
        let Some(window_start) = periods.first().map(|p| p.start) else {
            return Vec::new();
        };
        let fetched = join_all(
            periods
                .iter()
                .map(|p| self.source.fetch_period(county, p.start, p.end, window_start)),
        )
        .await;

        periods
            .iter()
            .zip(fetched)
            .map(|(period, result)| {
                let points = match result {
                    Ok(points) => points,
                    Err(e) => {
                        logger.debug(&format!("Period {} unavailable: {}", period.label, e));
                        Vec::new()
                    }
                };
                aggregate(&points, &period.label, period.start)
                    .unwrap_or_else(|| self.fallback_point(county, period, window_start))
            })
            .collect()
    }

    fn fallback_point(
        &self,
        county: &str,
        period: &Period,
        window_start: DateTime<Utc>,
    ) -> HistoricalPoint {
        let mut point = self
            .synth
            .synthesize_point(county, midpoint(period), window_start);
        point.period_label = period.label.clone();
        point.timestamp = period.start;
        point
    }

    /// Full-length synthetic series built without touching the source
    fn fallback_series(&self, county: &str) -> HistoricalData {
        let now = self.clock.now();
        let series = |count: usize, step_days: i64, label: &str| -> Vec<HistoricalPoint> {
            let window_start = now - Duration::days(step_days * (count as i64 - 1));
            (0..count)
                .rev()
                .map(|back| {
                    let at = now - Duration::days(step_days * back as i64);
                    let mut p = self.synth.synthesize_point(county, at, window_start);
                    p.period_label = at.format(label).to_string();
                    p
                })
                .collect()
        };
        HistoricalData {
            monthly_data: series(MONTHS, 30, "%b %Y"),
            yearly_data: series(YEARS, 365, "%Y"),
        }
    }

    /// Number of counties with a cached series
    pub fn cached_counties(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        self.logger.debug("Historical cache cleared");
    }
}
