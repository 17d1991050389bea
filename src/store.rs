//! SQLite persistence for raw and engineered telemetry tables.
//!
//! Both tables use wholesale-replace semantics: each persist call drops and
//! rebuilds its table inside one transaction, so a failed write rolls back
//! and never leaves rows from two generations mixed. There is no append or
//! upsert path.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::record::{EngineeredRecord, TelemetryRecord};

/// Table holding validated input observations.
pub const RAW_TABLE: &str = "raw";
/// Table holding engineered records.
pub const FEATURES_TABLE: &str = "features";

/// Store owning the SQLite connection for one database file.
pub struct TelemetryStore {
    conn: Connection,
}

impl TelemetryStore {
    /// Opens (creating if needed) the database at `path`, along with its
    /// parent directory.
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "SQLite store opened");
        Ok(TelemetryStore { conn })
    }

    /// Replaces the `raw` table with the given batch.
    pub fn persist_raw(&mut self, records: &[TelemetryRecord]) -> Result<(), PipelineError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS raw;
             CREATE TABLE raw (
                 timestamp       TEXT NOT NULL,
                 entity_id       TEXT NOT NULL,
                 speed           REAL NOT NULL,
                 state_of_charge REAL NOT NULL,
                 battery_temp    REAL NOT NULL,
                 motor_current   REAL NOT NULL,
                 inverter_temp   REAL NOT NULL,
                 ambient_temp    REAL NOT NULL,
                 tire_wear_pct   REAL NOT NULL,
                 brake_wear_pct  REAL NOT NULL
             );",
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for r in records {
                stmt.execute(params![
                    iso(&r.timestamp),
                    r.entity_id,
                    r.speed,
                    r.state_of_charge,
                    r.battery_temp,
                    r.motor_current,
                    r.inverter_temp,
                    r.ambient_temp,
                    r.tire_wear_pct,
                    r.brake_wear_pct,
                ])?;
            }
        }
        tx.commit()?;
        info!(rows = records.len(), table = RAW_TABLE, "Table replaced");
        Ok(())
    }

    /// Replaces the `features` table with the given engineered batch.
    pub fn persist_features(&mut self, records: &[EngineeredRecord]) -> Result<(), PipelineError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS features;
             CREATE TABLE features (
                 timestamp                  TEXT NOT NULL,
                 entity_id                  TEXT NOT NULL,
                 speed                      REAL NOT NULL,
                 state_of_charge            REAL NOT NULL,
                 battery_temp               REAL NOT NULL,
                 motor_current              REAL NOT NULL,
                 inverter_temp              REAL NOT NULL,
                 ambient_temp               REAL NOT NULL,
                 tire_wear_pct              REAL NOT NULL,
                 brake_wear_pct             REAL NOT NULL,
                 speed_roll_mean_10         REAL NOT NULL,
                 speed_roll_std_10          REAL NOT NULL,
                 speed_delta                REAL NOT NULL,
                 battery_temp_roll_mean_10  REAL NOT NULL,
                 battery_temp_roll_std_10   REAL NOT NULL,
                 battery_temp_delta         REAL NOT NULL,
                 motor_current_roll_mean_10 REAL NOT NULL,
                 motor_current_roll_std_10  REAL NOT NULL,
                 motor_current_delta        REAL NOT NULL,
                 inverter_temp_roll_mean_10 REAL NOT NULL,
                 inverter_temp_roll_std_10  REAL NOT NULL,
                 inverter_temp_delta        REAL NOT NULL,
                 ambient_temp_roll_mean_10  REAL NOT NULL,
                 ambient_temp_roll_std_10   REAL NOT NULL,
                 ambient_temp_delta         REAL NOT NULL,
                 tire_wear_pct_delta        REAL NOT NULL,
                 brake_wear_pct_delta       REAL NOT NULL,
                 state_of_charge_delta      REAL NOT NULL,
                 thermal_stress             REAL NOT NULL,
                 power_stress               REAL NOT NULL
             );",
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO features VALUES (\
                 ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, \
                 ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30)",
            )?;
            for r in records {
                stmt.execute(params![
                    iso(&r.timestamp),
                    r.entity_id,
                    r.speed,
                    r.state_of_charge,
                    r.battery_temp,
                    r.motor_current,
                    r.inverter_temp,
                    r.ambient_temp,
                    r.tire_wear_pct,
                    r.brake_wear_pct,
                    r.speed_roll_mean_10,
                    r.speed_roll_std_10,
                    r.speed_delta,
                    r.battery_temp_roll_mean_10,
                    r.battery_temp_roll_std_10,
                    r.battery_temp_delta,
                    r.motor_current_roll_mean_10,
                    r.motor_current_roll_std_10,
                    r.motor_current_delta,
                    r.inverter_temp_roll_mean_10,
                    r.inverter_temp_roll_std_10,
                    r.inverter_temp_delta,
                    r.ambient_temp_roll_mean_10,
                    r.ambient_temp_roll_std_10,
                    r.ambient_temp_delta,
                    r.tire_wear_pct_delta,
                    r.brake_wear_pct_delta,
                    r.state_of_charge_delta,
                    r.thermal_stress,
                    r.power_stress,
                ])?;
            }
        }
        tx.commit()?;
        info!(rows = records.len(), table = FEATURES_TABLE, "Table replaced");
        Ok(())
    }

    /// Creates the composite `(entity_id, timestamp)` index on each table if
    /// absent, supporting per-vehicle and time-range queries.
    pub fn ensure_indices(&self) -> Result<(), PipelineError> {
        self.conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_raw_entity_ts ON raw(entity_id, timestamp);
             CREATE INDEX IF NOT EXISTS idx_feat_entity_ts ON features(entity_id, timestamp);",
        )?;
        debug!("Indices ensured on raw and features");
        Ok(())
    }

    /// Row count of a table, for run reporting and tests.
    pub fn row_count(&self, table: &str) -> Result<usize, PipelineError> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
        Ok(count as usize)
    }
}

/// Timestamps are stored as ISO-8601 text with a `T` separator so the
/// composite index orders them chronologically.
fn iso(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::engineer;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_db(name: &str) -> PathBuf {
        let path = env::temp_dir().join(name);
        let _ = fs::remove_file(&path); // clean up any prior run
        path
    }

    fn record(entity: &str, second: u32) -> TelemetryRecord {
        TelemetryRecord {
            timestamp: format!("2024-05-01T00:00:{second:02}").parse().unwrap(),
            entity_id: entity.to_string(),
            speed: 50.0,
            state_of_charge: 80.0,
            battery_temp: 26.0,
            motor_current: 112.0,
            inverter_temp: 21.0,
            ambient_temp: 19.0,
            tire_wear_pct: 97.0,
            brake_wear_pct: 96.0,
        }
    }

    #[test]
    fn test_persist_raw_replaces_not_appends() {
        let path = temp_db("ev_fleet_etl_store_replace.db");
        let mut store = TelemetryStore::open(&path).unwrap();

        let big: Vec<_> = (0..5).map(|i| record("EV001", i)).collect();
        store.persist_raw(&big).unwrap();
        assert_eq!(store.row_count(RAW_TABLE).unwrap(), 5);

        store.persist_raw(&[record("EV002", 0)]).unwrap();
        assert_eq!(store.row_count(RAW_TABLE).unwrap(), 1);

        drop(store);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_features_table_has_thirty_columns() {
        let path = temp_db("ev_fleet_etl_store_columns.db");
        let mut store = TelemetryStore::open(&path).unwrap();

        let engineered = engineer(vec![record("EV001", 0)]);
        store.persist_features(&engineered).unwrap();

        let stmt = store.conn.prepare("SELECT * FROM features").unwrap();
        assert_eq!(stmt.column_count(), 30);

        drop(stmt);
        drop(store);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_ensure_indices_creates_both() {
        let path = temp_db("ev_fleet_etl_store_indices.db");
        let mut store = TelemetryStore::open(&path).unwrap();

        store.persist_raw(&[record("EV001", 0)]).unwrap();
        let engineered = engineer(vec![record("EV001", 0)]);
        store.persist_features(&engineered).unwrap();
        store.ensure_indices().unwrap();
        // idempotent
        store.ensure_indices().unwrap();

        let count: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' \
                 AND name IN ('idx_raw_entity_ts', 'idx_feat_entity_ts')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);

        drop(store);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stored_timestamp_roundtrips_as_text() {
        let path = temp_db("ev_fleet_etl_store_ts.db");
        let mut store = TelemetryStore::open(&path).unwrap();

        store.persist_raw(&[record("EV001", 7)]).unwrap();
        let stored: String = store
            .conn
            .query_row("SELECT timestamp FROM raw", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, "2024-05-01T00:00:07");

        drop(store);
        fs::remove_file(&path).unwrap();
    }
}
