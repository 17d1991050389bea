//! Record types shared across the pipeline stages.
//!
//! A [`TelemetryRecord`] is one observation for one vehicle at one instant.
//! An [`EngineeredRecord`] is the same observation with rolling statistics,
//! first differences, and stress proxies appended by the feature engine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Columns every input batch must carry, in wire order.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "timestamp",
    "entity_id",
    "speed",
    "state_of_charge",
    "battery_temp",
    "motor_current",
    "inverter_temp",
    "ambient_temp",
    "tire_wear_pct",
    "brake_wear_pct",
];

/// Channels carrying rolling mean/std plus a delta.
pub const ROLLING_CHANNELS: [&str; 5] = [
    "speed",
    "battery_temp",
    "motor_current",
    "inverter_temp",
    "ambient_temp",
];

/// Channels carrying a delta only (wear and state of charge).
pub const DELTA_ONLY_CHANNELS: [&str; 3] = ["tire_wear_pct", "brake_wear_pct", "state_of_charge"];

/// One validated telemetry observation. Field order matches the CSV header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: NaiveDateTime,
    pub entity_id: String,
    pub speed: f64,
    pub state_of_charge: f64,
    pub battery_temp: f64,
    pub motor_current: f64,
    pub inverter_temp: f64,
    pub ambient_temp: f64,
    pub tire_wear_pct: f64,
    pub brake_wear_pct: f64,
}

impl TelemetryRecord {
    /// Channel values eligible for rolling stats, in [`ROLLING_CHANNELS`] order.
    pub fn rolling_values(&self) -> [f64; 5] {
        [
            self.speed,
            self.battery_temp,
            self.motor_current,
            self.inverter_temp,
            self.ambient_temp,
        ]
    }

    /// Channel values carrying a delta only, in [`DELTA_ONLY_CHANNELS`] order.
    pub fn delta_only_values(&self) -> [f64; 3] {
        [self.tire_wear_pct, self.brake_wear_pct, self.state_of_charge]
    }

    /// True if every numeric channel holds a finite value.
    pub fn channels_finite(&self) -> bool {
        self.rolling_values().iter().all(|v| v.is_finite())
            && self.delta_only_values().iter().all(|v| v.is_finite())
    }
}

/// A telemetry observation plus its derived features, 30 columns total.
///
/// Rolling stats use a trailing window of up to 10 samples per vehicle.
/// Deltas are the change from the vehicle's immediately preceding
/// observation, defined as 0.0 when there is no predecessor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineeredRecord {
    pub timestamp: NaiveDateTime,
    pub entity_id: String,
    pub speed: f64,
    pub state_of_charge: f64,
    pub battery_temp: f64,
    pub motor_current: f64,
    pub inverter_temp: f64,
    pub ambient_temp: f64,
    pub tire_wear_pct: f64,
    pub brake_wear_pct: f64,

    pub speed_roll_mean_10: f64,
    pub speed_roll_std_10: f64,
    pub speed_delta: f64,
    pub battery_temp_roll_mean_10: f64,
    pub battery_temp_roll_std_10: f64,
    pub battery_temp_delta: f64,
    pub motor_current_roll_mean_10: f64,
    pub motor_current_roll_std_10: f64,
    pub motor_current_delta: f64,
    pub inverter_temp_roll_mean_10: f64,
    pub inverter_temp_roll_std_10: f64,
    pub inverter_temp_delta: f64,
    pub ambient_temp_roll_mean_10: f64,
    pub ambient_temp_roll_std_10: f64,
    pub ambient_temp_delta: f64,

    pub tire_wear_pct_delta: f64,
    pub brake_wear_pct_delta: f64,
    pub state_of_charge_delta: f64,

    /// `battery_temp + inverter_temp - ambient_temp`.
    pub thermal_stress: f64,
    /// `motor_current * max(speed, 1.0)`.
    pub power_stress: f64,
}
