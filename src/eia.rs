//! EIA v2 API integration
//!
//! The client issues one hourly region-data request per balancing authority,
//! merges the records into an [`AggregateState`](crate::model::AggregateState)
//! and caches the result. Requests go through the [`HttpTransport`] seam so the
//! scheduler can be exercised without network access.

mod client;
mod parse;
mod transport;

pub use client::EiaClient;
pub use parse::{MergeOutcome, MetricKind, classify_metric, coerce_value, merge_region_records};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};

/// Path of the hourly balancing-authority endpoint
pub const REGION_DATA_PATH: &str = "/electricity/rto/region-data/data";

/// Path of the monthly retail sales endpoint
pub const RETAIL_SALES_PATH: &str = "/electricity/retail-sales/data";

/// Residential price (cents/kWh) used when the retail endpoint is unavailable
pub const FALLBACK_RESIDENTIAL_RATE: f64 = 13.5;
