//! Wall-clock abstraction
//!
//! Caches and the scheduler read time through [`Clock`] so that freshness
//! windows and hour-of-day classification can be driven from tests.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// Source of the current UTC time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock; clones share the same instant
#[derive(Debug, Clone)]
pub struct ManualClock {
    instant: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(RwLock::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.write() {
            *guard = instant;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.instant.write() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
            .read()
            .map(|guard| *guard)
            .unwrap_or_else(|_| Utc::now())
    }
}

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
