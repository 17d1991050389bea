//! Synthetic fleet telemetry generator for tests and demos.
//!
//! Each vehicle's channels evolve through independent bounded random walks
//! driven by one seeded RNG owned by the generator instance, so a given
//! `(entity_ids, seed, rate, rows, start)` tuple always reproduces the same
//! stream. Emission is round-robin: one row per vehicle at each time step,
//! then time advances by `1 / sample_rate_hz`.

use std::path::Path;

use chrono::{Duration, NaiveDateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::PipelineError;
use crate::record::TelemetryRecord;

/// Mutable walk state for one vehicle.
#[derive(Debug, Clone)]
struct VehicleState {
    soc: f64,
    speed: f64,    // km/h
    battery: f64,  // °C
    motor: f64,    // load component behind reported current
    inverter: f64, // °C
    ambient: f64,  // °C
    tire: f64,     // % remaining
    brake: f64,    // % remaining
}

impl Default for VehicleState {
    fn default() -> Self {
        VehicleState {
            soc: 100.0,
            speed: 0.0,
            battery: 25.0,
            motor: 10.0,
            inverter: 20.0,
            ambient: 20.0,
            tire: 100.0,
            brake: 100.0,
        }
    }
}

/// Seeded synthetic telemetry source for a fleet of vehicles.
pub struct TelemetryGenerator {
    entity_ids: Vec<String>,
    sample_rate_hz: f64,
    rng: SmallRng,
    states: Vec<VehicleState>,
}

impl TelemetryGenerator {
    pub fn new(entity_ids: Vec<String>, sample_rate_hz: f64, seed: u64) -> Self {
        let states = vec![VehicleState::default(); entity_ids.len()];
        TelemetryGenerator {
            entity_ids,
            sample_rate_hz,
            rng: SmallRng::seed_from_u64(seed),
            states,
        }
    }

    /// Advances one vehicle's walk by one step and reports its channels.
    fn step(rng: &mut SmallRng, s: &mut VehicleState) -> [f64; 8] {
        s.speed = (s.speed + rng.random_range(-2.0..3.0)).clamp(0.0, 160.0);
        // soc drains with speed plus noise
        s.soc = (s.soc - 0.0007 * s.speed + rng.random_range(-0.02..0.02)).clamp(0.0, 100.0);
        // temps track speed
        s.battery += 0.01 * s.speed + rng.random_range(-0.3..0.3);
        s.motor += 0.015 * s.speed + rng.random_range(-0.4..0.4);
        s.inverter += 0.012 * s.speed + rng.random_range(-0.3..0.3);
        // wear creeps down
        s.tire = (s.tire - rng.random_range(0.00002..0.00008)).clamp(0.0, 100.0);
        s.brake = (s.brake - rng.random_range(0.00005..0.00012)).clamp(0.0, 100.0);
        s.ambient = (s.ambient + rng.random_range(-0.05..0.05)).clamp(-10.0, 45.0);

        [
            round2(s.speed),
            round2(s.soc),
            round2(s.battery),
            round2(100.0 + s.motor), // reported current proxies load
            round2(s.inverter),
            round2(s.ambient),
            round2(s.tire),
            round2(s.brake),
        ]
    }

    /// Generates `row_count` time steps, one row per vehicle per step.
    pub fn rows(&mut self, row_count: usize, start: NaiveDateTime) -> Vec<TelemetryRecord> {
        let step = Duration::microseconds((1_000_000.0 / self.sample_rate_hz).round() as i64);
        let mut out = Vec::with_capacity(row_count * self.entity_ids.len());

        for k in 0..row_count {
            let timestamp = start + step * k as i32;
            for (i, entity_id) in self.entity_ids.iter().enumerate() {
                let [
                    speed,
                    state_of_charge,
                    battery_temp,
                    motor_current,
                    inverter_temp,
                    ambient_temp,
                    tire_wear_pct,
                    brake_wear_pct,
                ] = Self::step(&mut self.rng, &mut self.states[i]);

                out.push(TelemetryRecord {
                    timestamp,
                    entity_id: entity_id.clone(),
                    speed,
                    state_of_charge,
                    battery_temp,
                    motor_current,
                    inverter_temp,
                    ambient_temp,
                    tire_wear_pct,
                    brake_wear_pct,
                });
            }
        }

        out
    }

    /// Writes `row_count` time steps to a CSV file with the standard header,
    /// creating parent directories as needed. Returns the rows written.
    pub fn to_csv(
        &mut self,
        path: &Path,
        row_count: usize,
        start: Option<NaiveDateTime>,
    ) -> Result<usize, PipelineError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let start = start.unwrap_or_else(|| Utc::now().naive_utc());
        let rows = self.rows(row_count, start);

        let mut writer = csv::Writer::from_path(path)?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = rows.len(), "Synthetic batch written");
        Ok(rows.len())
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
