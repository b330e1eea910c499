//! Service-level and network-level connection flags

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// `service AND network`: the only connectivity consumers ever see
pub const fn effective(service_connected: bool, network_online: bool) -> bool {
    service_connected && network_online
}

/// Two independent flags; network starts online
#[derive(Debug)]
pub struct ConnectionState {
    service_connected: AtomicBool,
    network_online: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionSnapshot {
    pub service_connected: bool,
    pub network_online: bool,
}

impl ConnectionSnapshot {
    pub const fn is_effectively_connected(&self) -> bool {
        effective(self.service_connected, self.network_online)
    }
}

impl ConnectionState {
    pub const fn new() -> Self {
        Self {
            service_connected: AtomicBool::new(false),
            network_online: AtomicBool::new(true),
        }
    }

    pub fn is_service_connected(&self) -> bool {
        self.service_connected.load(Ordering::SeqCst)
    }

    pub fn is_network_online(&self) -> bool {
        self.network_online.load(Ordering::SeqCst)
    }

    pub fn is_effectively_connected(&self) -> bool {
        effective(self.is_service_connected(), self.is_network_online())
    }

    /// Set the service flag; returns the previous value
    pub fn set_service_connected(&self, connected: bool) -> bool {
        self.service_connected.swap(connected, Ordering::SeqCst)
    }

    /// Set the network flag; returns the previous value
    pub fn set_network_online(&self, online: bool) -> bool {
        self.network_online.swap(online, Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            service_connected: self.is_service_connected(),
            network_online: self.is_network_online(),
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
