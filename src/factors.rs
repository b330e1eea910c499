//! Time-of-day demand factors and state-wide metrics

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

pub const PEAK_MULTIPLIER: f64 = 1.15;
pub const NIGHT_MULTIPLIER: f64 = 0.85;
/// Renewable share (percent) at full solar output
pub const PEAK_RENEWABLE_PCT: f64 = 26.1;

/// Demand adjustments for the current local hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeFactors {
    pub consumption_multiplier: f64,
    pub solar_efficiency: f64,
    pub is_peak_hour: bool,
    pub is_night_time: bool,
    pub current_hour: u32,
}

impl RealTimeFactors {
    /// Weekday 14:00-18:59 is peak, 22:00-06:59 is night
    pub fn classify(hour: u32, weekday: Weekday) -> Self {
        let is_weekday = !matches!(weekday, Weekday::Sat | Weekday::Sun);
        let is_peak_hour = is_weekday && (14..=18).contains(&hour);
        let is_night_time = hour >= 22 || hour <= 6;
        let consumption_multiplier = if is_night_time {
            NIGHT_MULTIPLIER
        } else if is_peak_hour {
            PEAK_MULTIPLIER
        } else {
            1.0
        };
        Self {
            consumption_multiplier,
            solar_efficiency: solar_efficiency(hour),
            is_peak_hour,
            is_night_time,
            current_hour: hour,
        }
    }

    /// Classify `at` in the given local timezone
    pub fn at(at: DateTime<Utc>, tz: Tz) -> Self {
        let local = at.with_timezone(&tz);
        Self::classify(local.hour(), local.weekday())
    }
}

/// Relative solar output by local hour (0.0 to 1.0)
pub fn solar_efficiency(hour: u32) -> f64 {
    let h = f64::from(hour);
    match hour {
        0..=5 => 0.0,
        6..=7 => (h - 6.0) / 2.0 * 0.3,
        8..=11 => 0.3 + (h - 8.0) / 4.0 * 0.7,
        12..=16 => 1.0,
        17..=19 => 1.0 - (h - 16.0) / 3.0,
        _ => 0.0,
    }
}

/// State-wide figures derived from one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMetrics {
    /// Sum of county consumption estimates (kWh)
    pub total_current_consumption: f64,
    pub renewable_percentage_now: f64,
    pub grid_status_message: String,
}

impl StateMetrics {
    pub fn new(total_current_consumption: f64, factors: &RealTimeFactors) -> Self {
        let renewable = (PEAK_RENEWABLE_PCT * factors.solar_efficiency * 100.0).round() / 100.0;
        let message = if factors.is_peak_hour {
            "Peak demand period - High solar generation"
        } else if factors.is_night_time {
            "Low demand period - Battery storage active"
        } else {
            "Normal operations"
        };
        Self {
            total_current_consumption: total_current_consumption.round(),
            renewable_percentage_now: renewable,
            grid_status_message: message.to_string(),
        }
    }
}
