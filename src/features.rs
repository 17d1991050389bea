//! Feature engineering over validated telemetry batches.
//!
//! Records are stably sorted into `(entity_id, timestamp)` order, then each
//! vehicle's subsequence is scanned once. Rolling stats come from a bounded
//! trailing buffer updated incrementally per step; vehicles never share
//! window or delta state. Row count is preserved exactly; this stage adds
//! columns, never rows.

use std::collections::VecDeque;

use tracing::debug;

use crate::record::{EngineeredRecord, TelemetryRecord};

/// Trailing window size for rolling stats (~2s at 5Hz).
pub const ROLL_WINDOW: usize = 10;

/// Bounded trailing window with incrementally maintained sum and sum of
/// squares, so each step is O(1) instead of rescanning the window.
struct RollingWindow {
    values: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

impl RollingWindow {
    fn new() -> Self {
        RollingWindow {
            values: VecDeque::with_capacity(ROLL_WINDOW),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    fn push(&mut self, value: f64) {
        if self.values.len() == ROLL_WINDOW {
            let evicted = self.values.pop_front().unwrap();
            self.sum -= evicted;
            self.sum_sq -= evicted * evicted;
        }
        self.values.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Mean over however many samples have been seen ("min periods = 1").
    fn mean(&self) -> f64 {
        self.sum / self.values.len() as f64
    }

    /// Sample standard deviation (n-1 denominator). A single-sample window
    /// has undefined sample variance; it is defined as 0.0 here.
    fn std(&self) -> f64 {
        let n = self.values.len() as f64;
        if self.values.len() < 2 {
            return 0.0;
        }
        let variance = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        // incremental update can drift a hair below zero for constant input
        variance.max(0.0).sqrt()
    }
}

/// Per-vehicle scan state: one window per rolling channel plus the previous
/// observation's channel values for first differences.
struct EntityScan {
    windows: [RollingWindow; 5],
    prev_rolling: Option<[f64; 5]>,
    prev_delta_only: Option<[f64; 3]>,
}

impl EntityScan {
    fn new() -> Self {
        EntityScan {
            windows: std::array::from_fn(|_| RollingWindow::new()),
            prev_rolling: None,
            prev_delta_only: None,
        }
    }
}

/// Derives engineered records from a validated batch.
///
/// Output is in ascending `(entity_id, timestamp)` order; timestamp ties
/// within a vehicle keep their input order (stable sort), which keeps first
/// differences deterministic. Input must have passed validation: a
/// non-finite channel value here is a contract violation and panics rather
/// than silently producing NaN features.
pub fn engineer(mut records: Vec<TelemetryRecord>) -> Vec<EngineeredRecord> {
    records.sort_by(|a, b| {
        a.entity_id
            .cmp(&b.entity_id)
            .then(a.timestamp.cmp(&b.timestamp))
    });

    let mut out = Vec::with_capacity(records.len());
    let mut scan = EntityScan::new();
    let mut current_entity: Option<String> = None;

    for record in records {
        assert!(
            record.channels_finite(),
            "non-finite channel value reached the feature engine for entity {}",
            record.entity_id
        );

        if current_entity.as_deref() != Some(record.entity_id.as_str()) {
            current_entity = Some(record.entity_id.clone());
            scan = EntityScan::new();
        }

        out.push(engineer_one(&mut scan, record));
    }

    debug!(rows = out.len(), "Feature engineering complete");
    out
}

fn engineer_one(scan: &mut EntityScan, r: TelemetryRecord) -> EngineeredRecord {
    let rolling = r.rolling_values();
    let delta_only = r.delta_only_values();

    let mut roll_mean = [0.0; 5];
    let mut roll_std = [0.0; 5];
    for (i, value) in rolling.iter().enumerate() {
        scan.windows[i].push(*value);
        roll_mean[i] = scan.windows[i].mean();
        roll_std[i] = scan.windows[i].std();
    }

    let roll_delta = match scan.prev_rolling {
        Some(prev) => std::array::from_fn(|i| rolling[i] - prev[i]),
        None => [0.0; 5],
    };
    let wear_delta = match scan.prev_delta_only {
        Some(prev) => std::array::from_fn(|i| delta_only[i] - prev[i]),
        None => [0.0; 3],
    };

    scan.prev_rolling = Some(rolling);
    scan.prev_delta_only = Some(delta_only);

    EngineeredRecord {
        speed_roll_mean_10: roll_mean[0],
        speed_roll_std_10: roll_std[0],
        speed_delta: roll_delta[0],
        battery_temp_roll_mean_10: roll_mean[1],
        battery_temp_roll_std_10: roll_std[1],
        battery_temp_delta: roll_delta[1],
        motor_current_roll_mean_10: roll_mean[2],
        motor_current_roll_std_10: roll_std[2],
        motor_current_delta: roll_delta[2],
        inverter_temp_roll_mean_10: roll_mean[3],
        inverter_temp_roll_std_10: roll_std[3],
        inverter_temp_delta: roll_delta[3],
        ambient_temp_roll_mean_10: roll_mean[4],
        ambient_temp_roll_std_10: roll_std[4],
        ambient_temp_delta: roll_delta[4],
        tire_wear_pct_delta: wear_delta[0],
        brake_wear_pct_delta: wear_delta[1],
        state_of_charge_delta: wear_delta[2],
        thermal_stress: r.battery_temp + r.inverter_temp - r.ambient_temp,
        power_stress: r.motor_current * r.speed.max(1.0),
        timestamp: r.timestamp,
        entity_id: r.entity_id,
        speed: r.speed,
        state_of_charge: r.state_of_charge,
        battery_temp: r.battery_temp,
        motor_current: r.motor_current,
        inverter_temp: r.inverter_temp,
        ambient_temp: r.ambient_temp,
        tire_wear_pct: r.tire_wear_pct,
        brake_wear_pct: r.brake_wear_pct,
    }
}
