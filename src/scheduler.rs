//! Periodic aggregation cycle
//!
//! The scheduler owns the polling timer. Each tick spawns an independent cycle
//! task that fetches live readings (or synthesizes them), builds a
//! [`RealTimeUpdate`] and publishes it if the service is still effectively
//! connected when the cycle completes.

use crate::clock::Clock;
use crate::config::Config;
use crate::connection::ConnectionState;
use crate::eia::EiaClient;
use crate::error::Result;
use crate::factors::RealTimeFactors;
use crate::hub::BroadcastHub;
use crate::logging::{StructuredLogger, get_logger};
use crate::model::{AggregateState, RegionId};
use crate::synthesis::SynthesisEngine;
use crate::update::{DataSource, RealTimeUpdate};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Runtime knobs for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub interval: Duration,
    pub use_real_api: bool,
    pub timezone: Tz,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.polling.interval(),
            use_real_api: config.eia.use_real_api,
            timezone: config.tz(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            use_real_api: true,
            timezone: chrono_tz::America::Phoenix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    Idle,
    Connected,
}

struct Timer {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct Inner {
    client: Arc<EiaClient>,
    synth: Arc<SynthesisEngine>,
    hub: Arc<BroadcastHub>,
    connection: Arc<ConnectionState>,
    regions: Vec<RegionId>,
    settings: SchedulerSettings,
    clock: Arc<dyn Clock>,
    timer: Mutex<Option<Timer>>,
    latest: RwLock<Option<Arc<RealTimeUpdate>>>,
    last_update: RwLock<Option<DateTime<Utc>>>,
    logger: StructuredLogger,
}

/// Polls the data client on a fixed interval; cheap to clone
#[derive(Clone)]
pub struct AggregationScheduler {
    inner: Arc<Inner>,
}

impl AggregationScheduler {
    pub fn new(
        client: Arc<EiaClient>,
        synth: Arc<SynthesisEngine>,
        hub: Arc<BroadcastHub>,
        connection: Arc<ConnectionState>,
        regions: Vec<RegionId>,
        settings: SchedulerSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                synth,
                hub,
                connection,
                regions,
                settings,
                clock,
                timer: Mutex::new(None),
                latest: RwLock::new(None),
                last_update: RwLock::new(None),
                logger: get_logger("scheduler"),
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.inner.connection.is_service_connected() {
            SchedulerState::Connected
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SchedulerState::Connected
    }

    /// Last published update, if any
    pub fn latest(&self) -> Option<Arc<RealTimeUpdate>> {
        self.inner
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self
            .inner
            .last_update
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start polling. No-op when already connected.
    ///
    /// When the network is online the first cycle runs before this returns.
    pub async fn connect(&self) {
        {
            let mut timer = self
                .inner
                .timer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.inner.connection.set_service_connected(true) {
                self.inner.logger.debug("connect() while already connected");
                return;
            }
            *timer = Some(self.arm_timer());
        }

        self.inner.logger.info(&format!(
            "Connected: polling {} region(s) every {}s",
            self.inner.regions.len(),
            self.inner.settings.interval.as_secs()
        ));
        self.publish_status();

        if self.inner.connection.is_network_online() {
            self.run_cycle().await;
        }
    }

    /// Stop polling. Idempotent; cycles already in flight are not cancelled
    /// but their results are discarded.
    pub fn disconnect(&self) {
        let timer = {
            let mut timer = self
                .inner
                .timer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.inner.connection.set_service_connected(false) {
                return;
            }
            timer.take()
        };

        if let Some(Timer { shutdown, task }) = timer {
            let _ = shutdown.send(());
            task.abort();
        }
        self.inner.logger.info("Disconnected");
        self.publish_status();
    }

    /// Broadcast the current effective connectivity
    pub fn publish_status(&self) {
        let connected = self.inner.connection.is_effectively_connected();
        self.inner.hub.connection.publish(&connected);
    }

    fn arm_timer(&self) -> Timer {
        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.inner.settings.interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        if inner.connection.is_network_online() {
                            let scheduler = AggregationScheduler { inner };
                            tokio::spawn(async move {
                                scheduler.run_cycle().await;
                            });
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Timer { shutdown, task }
    }

    /// Run one cycle on its own task
    pub fn trigger_cycle(&self) -> JoinHandle<Option<Arc<RealTimeUpdate>>> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run_cycle().await })
    }

    /// Fetch or synthesize, then publish if still effectively connected.
    ///
    /// Returns the published update; `None` when the result was discarded
    /// or could not be built.
    pub async fn run_cycle(&self) -> Option<Arc<RealTimeUpdate>> {
        let (aggregate, source) = match self.fetch_live().await {
            Some(state) => (state, DataSource::Live),
            None => match self.synthesize() {
                Ok(state) => (state, DataSource::Synthetic),
                Err(e) => {
                    self.inner
                        .logger
                        .error(&format!("Failed to build synthetic snapshot: {}", e));
                    return None;
                }
            },
        };

        // A cached snapshot keeps its fetch time; the cycle is stamped now
        let now = self.inner.clock.now();
        let factors = RealTimeFactors::at(now, self.inner.settings.timezone);
        let update = Arc::new(RealTimeUpdate::build(now, aggregate, factors, source));

        if !self.inner.connection.is_effectively_connected() {
            self.inner
                .logger
                .debug("Discarding cycle result: not connected");
            return None;
        }

        *self
            .inner
            .latest
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(update.clone());
        *self
            .inner
            .last_update
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(update.timestamp);

        let delivered = self.inner.hub.data.publish(&update);
        self.inner.logger.debug(&format!(
            "Published {:?} update to {} subscriber(s)",
            source, delivered
        ));
        Some(update)
    }

    async fn fetch_live(&self) -> Option<AggregateState> {
        if !self.inner.settings.use_real_api || !self.inner.client.is_configured() {
            return None;
        }
        match self.inner.client.fetch_snapshot(&self.inner.regions).await {
            Ok(state) => Some(state),
            Err(e) => {
                self.inner
                    .logger
                    .warn(&format!("Live fetch failed, using synthetic data: {}", e));
                None
            }
        }
    }

    fn synthesize(&self) -> Result<AggregateState> {
        let now = self.inner.clock.now();
        let per_region: BTreeMap<_, _> = self
            .inner
            .regions
            .iter()
            .map(|r| (r.clone(), self.inner.synth.synthesize_region(r, now)))
            .collect();
        AggregateState::from_regions(now, per_region)
    }
}
