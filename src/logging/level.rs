use crate::error::{GridwatchError, Result};
use tracing::Level;

/// Parse log level string to tracing Level
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.trim().to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" => Ok(Level::ERROR),
        _ => Err(GridwatchError::configuration(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}

/// The more verbose of two levels (`tracing` orders TRACE above ERROR)
pub fn min_level(a: Level, b: Level) -> Level {
    a.max(b)
}
