//! Consumer-facing facade over the aggregation layer

use crate::clock::{Clock, system_clock};
use crate::config::Config;
use crate::connection::ConnectionState;
use crate::eia::{EiaClient, HttpTransport};
use crate::error::Result;
use crate::historical::{HistoricalAggregator, PeriodSource, SyntheticPeriodSource};
use crate::hub::{BroadcastHub, Subscription};
use crate::logging::{StructuredLogger, get_logger};
use crate::model::{HistoricalData, RegionId};
use crate::monitor::ConnectivityMonitor;
use crate::scheduler::{AggregationScheduler, SchedulerSettings};
use crate::synthesis::SynthesisEngine;
use crate::update::RealTimeUpdate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of service health for dashboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub subscriber_count: usize,
    pub last_update_timestamp: Option<DateTime<Utc>>,
    /// Live data is enabled and credentials are present
    pub using_real_api: bool,
    pub api_configured: bool,
}

/// Wires client, scheduler, hub, monitor and historical aggregator together
pub struct EnergyDataService {
    client: Arc<EiaClient>,
    hub: Arc<BroadcastHub>,
    connection: Arc<ConnectionState>,
    scheduler: AggregationScheduler,
    monitor: Arc<ConnectivityMonitor>,
    historical: HistoricalAggregator,
    use_real_api: bool,
    logger: StructuredLogger,
}

impl EnergyDataService {
    /// Production wiring with a reqwest transport and the system clock
    pub fn from_config(config: &Config) -> Result<Self> {
        let clock = system_clock();
        let client = EiaClient::from_config(&config.eia, config.polling.live_cache_ttl(), clock.clone())?;
        Ok(Self::assemble(config, client, clock, None))
    }

    /// Wiring over an arbitrary transport and clock
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let client = EiaClient::with_transport(
            &config.eia,
            config.polling.live_cache_ttl(),
            transport,
            clock.clone(),
        );
        Self::assemble(config, client, clock, None)
    }

    /// Like [`with_transport`](Self::with_transport) with a custom historical source
    pub fn with_period_source(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        source: Arc<dyn PeriodSource>,
    ) -> Self {
        let client = EiaClient::with_transport(
            &config.eia,
            config.polling.live_cache_ttl(),
            transport,
            clock.clone(),
        );
        Self::assemble(config, client, clock, Some(source))
    }

    fn assemble(
        config: &Config,
        client: EiaClient,
        clock: Arc<dyn Clock>,
        source: Option<Arc<dyn PeriodSource>>,
    ) -> Self {
        let client = Arc::new(client);
        let synth = Arc::new(SynthesisEngine::from_seed_option(config.synthesis_seed));
        let hub = Arc::new(BroadcastHub::new());
        let connection = Arc::new(ConnectionState::new());
        let regions: Vec<RegionId> = config.regions.iter().map(|r| RegionId::new(r)).collect();

        let scheduler = AggregationScheduler::new(
            client.clone(),
            synth.clone(),
            hub.clone(),
            connection.clone(),
            regions,
            SchedulerSettings::from_config(config),
            clock.clone(),
        );
        let monitor = Arc::new(ConnectivityMonitor::new(
            connection.clone(),
            scheduler.clone(),
        ));

        let source = source.unwrap_or_else(|| {
            Arc::new(SyntheticPeriodSource::new(
                client.is_configured(),
                synth.clone(),
            ))
        });
        let historical = HistoricalAggregator::new(
            source,
            synth,
            config.polling.historical_cache_ttl(),
            clock,
        );

        let logger = get_logger("service");
        if !client.is_configured() {
            logger.info("No EIA API key configured, serving synthetic data");
        }

        Self {
            client,
            hub,
            connection,
            scheduler,
            monitor,
            historical,
            use_real_api: config.eia.use_real_api,
            logger,
        }
    }

    pub fn subscribe_data<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<RealTimeUpdate>) + Send + Sync + 'static,
    {
        self.hub.data.subscribe(callback)
    }

    pub fn subscribe_connection_status<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.hub.connection.subscribe(callback)
    }

    pub async fn connect(&self) {
        self.scheduler.connect().await;
    }

    pub fn disconnect(&self) {
        self.scheduler.disconnect();
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        let api_configured = self.client.is_configured();
        ConnectionStatus {
            is_connected: self.connection.is_effectively_connected(),
            subscriber_count: self.hub.data.subscriber_count(),
            last_update_timestamp: self.scheduler.last_update(),
            using_real_api: self.use_real_api && api_configured,
            api_configured,
        }
    }

    pub async fn get_county_historical_data(&self, county: &str) -> HistoricalData {
        self.historical.get_series(county).await
    }

    /// Residential retail price in cents/kWh
    pub async fn residential_rate(&self) -> f64 {
        self.client.fetch_residential_rate().await
    }

    pub fn latest_update(&self) -> Option<Arc<RealTimeUpdate>> {
        self.scheduler.latest()
    }

    pub fn monitor(&self) -> Arc<ConnectivityMonitor> {
        self.monitor.clone()
    }

    pub const fn scheduler(&self) -> &AggregationScheduler {
        &self.scheduler
    }

    /// Drop every cached snapshot, rate and historical series
    pub fn clear_caches(&self) {
        self.client.clear_cache();
        self.historical.clear_cache();
        self.logger.info("Caches cleared");
    }
}
