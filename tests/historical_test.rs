mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{SpyTransport, clock, config, envelope};
use gridwatch::error::{GridwatchError, Result};
use gridwatch::historical::{HistoricalAggregator, PeriodSource, SyntheticPeriodSource};
use gridwatch::model::HistoricalPoint;
use gridwatch::service::EnergyDataService;
use gridwatch::synthesis::SynthesisEngine;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const TTL: Duration = Duration::from_secs(1800);

struct FailingSource {
    calls: AtomicUsize,
}

#[async_trait]
impl PeriodSource for FailingSource {
    async fn fetch_period(
        &self,
        _county: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _window_start: DateTime<Utc>,
    ) -> Result<Vec<HistoricalPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GridwatchError::network("connection reset"))
    }
}

struct EmptySource;

#[async_trait]
impl PeriodSource for EmptySource {
    async fn fetch_period(
        &self,
        _county: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _window_start: DateTime<Utc>,
    ) -> Result<Vec<HistoricalPoint>> {
        Ok(Vec::new())
    }
}

/// Two fixed points per period
struct FixedSource {
    calls: AtomicUsize,
}

#[async_trait]
impl PeriodSource for FixedSource {
    async fn fetch_period(
        &self,
        _county: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _window_start: DateTime<Utc>,
    ) -> Result<Vec<HistoricalPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            HistoricalPoint {
                period_label: "a".to_string(),
                consumption_mwh: 1000.0,
                renewable_percentage: 20.0,
                timestamp: start,
            },
            HistoricalPoint {
                period_label: "b".to_string(),
                consumption_mwh: 500.0,
                renewable_percentage: 30.0,
                timestamp: start,
            },
        ])
    }
}

fn synth() -> Arc<SynthesisEngine> {
    Arc::new(SynthesisEngine::with_seed(11))
}

#[tokio::test]
async fn every_period_failing_still_yields_full_series() {
    let source = Arc::new(FailingSource {
        calls: AtomicUsize::new(0),
    });
    let aggregator = HistoricalAggregator::new(source.clone(), synth(), TTL, Arc::new(clock()));

    let data = aggregator.get_series("Maricopa").await;

    assert_eq!(data.monthly_data.len(), 12);
    assert_eq!(data.yearly_data.len(), 10);
    assert_eq!(source.calls.load(Ordering::SeqCst), 22);
    assert_eq!(data.monthly_data[0].period_label, "Aug 2024");
    assert_eq!(data.monthly_data[11].period_label, "Jul 2025");
    assert_eq!(data.yearly_data[0].period_label, "2016");
    assert_eq!(data.yearly_data[9].period_label, "2025");
    for point in data.monthly_data.iter().chain(&data.yearly_data) {
        assert!(point.consumption_mwh > 0.0);
        assert!((0.0..=50.0).contains(&point.renewable_percentage));
    }
}

#[tokio::test]
async fn empty_periods_are_replaced_by_fallback_points() {
    let aggregator = HistoricalAggregator::new(Arc::new(EmptySource), synth(), TTL, Arc::new(clock()));
    let data = aggregator.get_series("Pima").await;
    assert_eq!(data.monthly_data.len(), 12);
    assert_eq!(data.yearly_data.len(), 10);
}

#[tokio::test]
async fn sub_points_are_summed_and_averaged() {
    let source = Arc::new(FixedSource {
        calls: AtomicUsize::new(0),
    });
    let aggregator = HistoricalAggregator::new(source, synth(), TTL, Arc::new(clock()));
    let data = aggregator.get_series("Pinal").await;
    for point in data.monthly_data.iter().chain(&data.yearly_data) {
        assert_eq!(point.consumption_mwh, 1500.0);
        assert_eq!(point.renewable_percentage, 25.0);
    }
}

#[tokio::test]
async fn series_is_cached_per_county() {
    let source = Arc::new(FixedSource {
        calls: AtomicUsize::new(0),
    });
    let clock = clock();
    let aggregator =
        HistoricalAggregator::new(source.clone(), synth(), TTL, Arc::new(clock.clone()));

    let first = aggregator.get_series("Yavapai").await;
    let second = aggregator.get_series("yavapai").await;
    assert_eq!(first, second);
    assert_eq!(source.calls.load(Ordering::SeqCst), 22);

    aggregator.get_series("Gila").await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 44);

    clock.advance(chrono::Duration::minutes(31));
    aggregator.get_series("Yavapai").await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 66);

    aggregator.clear_cache();
    aggregator.get_series("Yavapai").await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 88);
}

#[tokio::test]
async fn default_source_rolls_up_daily_points() {
    let source = Arc::new(SyntheticPeriodSource::new(true, synth()));
    let aggregator = HistoricalAggregator::new(source, synth(), TTL, Arc::new(clock()));
    let data = aggregator.get_series("Navajo").await;

    // July 2025 has 31 daily points around 85,000 MWh with a 1.3 seasonal peak
    let july = &data.monthly_data[11];
    assert!(july.consumption_mwh > 31.0 * 85_000.0 * 1.3 * 0.85);
    assert!(july.consumption_mwh < 31.0 * 85_000.0 * 1.3 * 1.15);
}

#[tokio::test]
async fn default_source_refuses_without_credentials() {
    let source = SyntheticPeriodSource::new(false, synth());
    let now = common::start_time();
    let err = source.fetch_period("Maricopa", now, now, now).await.unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn service_returns_full_series_without_api_key() {
    let service = EnergyDataService::with_transport(
        &config(""),
        SpyTransport::json(envelope(vec![])),
        Arc::new(clock()),
    );
    let data = service.get_county_historical_data("Cochise").await;
    assert_eq!(data.monthly_data.len(), 12);
    assert_eq!(data.yearly_data.len(), 10);
}

#[tokio::test]
async fn service_uses_injected_period_source() {
    let source = Arc::new(FixedSource {
        calls: AtomicUsize::new(0),
    });
    let service = EnergyDataService::with_period_source(
        &config("k"),
        SpyTransport::json(envelope(vec![])),
        Arc::new(clock()),
        source.clone(),
    );

    let data = service.get_county_historical_data("Mohave").await;
    assert_eq!(data.monthly_data[0].consumption_mwh, 1500.0);
    assert_eq!(source.calls.load(Ordering::SeqCst), 22);

    service.clear_caches();
    service.get_county_historical_data("Mohave").await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 44);
}

fn trend(points: &[HistoricalPoint]) -> f64 {
    let mean = |ps: &[HistoricalPoint]| {
        ps.iter().map(|p| p.renewable_percentage).sum::<f64>() / ps.len() as f64
    };
    mean(&points[points.len() - 3..]) - mean(&points[..3])
}

#[tokio::test]
async fn yearly_renewable_share_rises_across_the_window() {
    let source = Arc::new(SyntheticPeriodSource::new(
        true,
        Arc::new(SynthesisEngine::with_seed(3)),
    ));
    let aggregator = HistoricalAggregator::new(
        source,
        Arc::new(SynthesisEngine::with_seed(3)),
        TTL,
        Arc::new(clock()),
    );
    let data = aggregator.get_series("Maricopa").await;

    // Daily noise averages out: early years gain ~2.25 points, late years hit the cap
    let rise = trend(&data.yearly_data);
    assert!(rise > 7.0, "yearly rise was {}", rise);
    assert!(trend(&data.monthly_data) > 0.0);
}

#[tokio::test]
async fn fallback_points_carry_the_same_trend() {
    let source = Arc::new(SyntheticPeriodSource::new(false, synth()));
    let aggregator = HistoricalAggregator::new(
        source,
        Arc::new(SynthesisEngine::with_seed(3)),
        TTL,
        Arc::new(clock()),
    );
    let data = aggregator.get_series("Maricopa").await;

    let rise = trend(&data.yearly_data);
    assert!(rise > 4.0, "yearly rise was {}", rise);
    assert_eq!(data.yearly_data[0].period_label, "2016");
}

#[tokio::test]
async fn unknown_counties_are_not_cached() {
    let source = Arc::new(FixedSource {
        calls: AtomicUsize::new(0),
    });
    let aggregator =
        HistoricalAggregator::new(source.clone(), synth(), TTL, Arc::new(clock()));

    for i in 0..50 {
        let data = aggregator.get_series(&format!("nowhere-{}", i)).await;
        assert_eq!(data.yearly_data.len(), 10);
    }
    assert_eq!(aggregator.cached_counties(), 0);

    aggregator.get_series("nowhere-0").await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 51 * 22);

    aggregator.get_series("maricopa").await;
    aggregator.get_series("Maricopa").await;
    assert_eq!(aggregator.cached_counties(), 1);
    assert_eq!(source.calls.load(Ordering::SeqCst), 52 * 22);
}
