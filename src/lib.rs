//! # Gridwatch - energy data aggregation for the Arizona energy dashboard
//!
//! Gridwatch polls the U.S. EIA v2 API for balancing-authority readings,
//! caches and merges them into a state-wide snapshot, falls back to
//! synthetic data whenever the API is unavailable or unconfigured, and
//! broadcasts periodic updates to subscribers. Network reachability is
//! tracked separately from fetch success.
//!
//! ## Architecture
//!
//! - `eia`: EIA API client behind an HTTP transport seam
//! - `cache`: short-TTL response cache driven by an injected clock
//! - `synthesis`: seeded fallback data generator
//! - `scheduler`: fixed-interval aggregation cycle
//! - `hub`: publish/subscribe registry for updates and connection status
//! - `connection` / `monitor`: service and network flags, reachability probe
//! - `historical`: monthly and yearly county rollups
//! - `service`: consumer-facing facade
//! - `web`: HTTP API and server-sent events (feature `web`)

pub mod cache;
pub mod clock;
pub mod config;
pub mod connection;
pub mod counties;
pub mod eia;
pub mod error;
pub mod factors;
pub mod historical;
pub mod hub;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod scheduler;
pub mod service;
pub mod synthesis;
pub mod update;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{GridwatchError, Result};
pub use service::{ConnectionStatus, EnergyDataService};
pub use update::RealTimeUpdate;
