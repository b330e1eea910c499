//! Environment online/offline tracking

use crate::connection::ConnectionState;
use crate::logging::{StructuredLogger, get_logger};
use crate::scheduler::AggregationScheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};

/// Applies network signals to the connection state and the scheduler
pub struct ConnectivityMonitor {
    connection: Arc<ConnectionState>,
    scheduler: AggregationScheduler,
    logger: StructuredLogger,
}

impl ConnectivityMonitor {
    pub fn new(connection: Arc<ConnectionState>, scheduler: AggregationScheduler) -> Self {
        Self {
            connection,
            scheduler,
            logger: get_logger("monitor"),
        }
    }

    pub fn is_online(&self) -> bool {
        self.connection.is_network_online()
    }

    /// Apply an online/offline signal; repeated identical signals are ignored
    pub async fn set_online(&self, online: bool) {
        let previous = self.connection.set_network_online(online);
        if previous == online {
            return;
        }

        if online {
            self.logger.info("Network back online");
            if self.scheduler.is_connected() {
                self.scheduler.publish_status();
                self.scheduler.run_cycle().await;
            }
        } else {
            self.logger.warn("Network offline, polling suspended");
            self.scheduler.publish_status();
        }
    }

    /// Periodically probe `host` (`host:port`) over TCP and feed the result
    /// into [`set_online`](Self::set_online)
    pub fn spawn_probe(
        self: Arc<Self>,
        host: String,
        every: Duration,
        connect_timeout: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let reachable = probe(&host, connect_timeout).await;
                if !reachable {
                    self.logger
                        .debug(&format!("Probe to {} failed", host));
                }
                self.set_online(reachable).await;
            }
        })
    }
}

async fn probe(host: &str, connect_timeout: Duration) -> bool {
    matches!(timeout(connect_timeout, TcpStream::connect(host)).await, Ok(Ok(_)))
}
