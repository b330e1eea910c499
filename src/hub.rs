//! Publish/subscribe registry between the scheduler and its consumers
//!
//! Callbacks run synchronously on the publishing task, in registration order,
//! over a copy of the registry taken when `publish` starts. Nothing is
//! buffered: a subscriber only sees values published after it registered.

use crate::logging::{StructuredLogger, get_logger};
use crate::update::RealTimeUpdate;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Registry<T> = Mutex<Vec<(u64, Callback<T>)>>;

/// Handle returned by [`Channel::subscribe`]; removal is explicit
#[must_use = "dropping a Subscription keeps the callback registered"]
pub struct Subscription {
    id: u64,
    remove: Box<dyn Fn(u64) + Send + Sync>,
}

impl Subscription {
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Remove the callback; safe to call from inside a callback
    pub fn unsubscribe(self) {
        (self.remove)(self.id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// One independent broadcast channel
pub struct Channel<T> {
    registry: Arc<Registry<T>>,
    next_id: AtomicU64,
    logger: StructuredLogger,
}

impl<T: 'static> Channel<T> {
    pub fn new(name: &str) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            logger: get_logger(&format!("hub.{}", name)),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));

        let weak: Weak<Registry<T>> = Arc::downgrade(&self.registry);
        Subscription {
            id,
            remove: Box::new(move |id| {
                if let Some(registry) = weak.upgrade() {
                    registry
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|(sid, _)| *sid != id);
                }
            }),
        }
    }

    /// Deliver `value` to every current subscriber; returns how many were called
    pub fn publish(&self, value: &T) -> usize {
        let snapshot: Vec<Callback<T>> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        for callback in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                self.logger.error("Subscriber callback panicked");
            }
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Data-update and connection-status channels
pub struct BroadcastHub {
    pub data: Channel<Arc<RealTimeUpdate>>,
    pub connection: Channel<bool>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            data: Channel::new("data"),
            connection: Channel::new("connection"),
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
