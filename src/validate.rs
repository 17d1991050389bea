//! Schema validation and type coercion for raw CSV batches.
//!
//! Validation is all-or-nothing: a batch is accepted only if the header
//! carries every required column and every row coerces cleanly. The header
//! check reports every missing column at once.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use csv::StringRecord;
use tracing::debug;

use crate::error::PipelineError;
use crate::record::{REQUIRED_COLUMNS, TelemetryRecord};

/// Loads a CSV batch and validates it into [`TelemetryRecord`]s.
pub fn load_csv(path: &Path) -> Result<Vec<TelemetryRecord>, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), rows = rows.len(), "CSV batch read");
    validate_batch(&headers, &rows)
}

/// Validates a batch of raw rows against the required schema.
pub fn validate_batch(
    headers: &StringRecord,
    rows: &[StringRecord],
) -> Result<Vec<TelemetryRecord>, PipelineError> {
    let index = column_index(headers)?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| coerce_row(&index, row, i + 1))
        .collect()
}

/// Maps column names to positions, failing with every missing column named.
fn column_index<'h>(headers: &'h StringRecord) -> Result<HashMap<&'h str, usize>, PipelineError> {
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    Ok(index)
}

fn coerce_row(
    index: &HashMap<&str, usize>,
    row: &StringRecord,
    row_number: usize,
) -> Result<TelemetryRecord, PipelineError> {
    let field = |column: &str| row.get(index[column]).unwrap_or_default();

    // entity_id is taken verbatim so numeric-looking IDs survive as strings
    let entity_id = field("entity_id").to_string();
    let timestamp = parse_timestamp(field("timestamp"), row_number)?;

    let numeric = |column: &str| parse_numeric(column, field(column), row_number);

    Ok(TelemetryRecord {
        timestamp,
        entity_id,
        speed: numeric("speed")?,
        state_of_charge: numeric("state_of_charge")?,
        battery_temp: numeric("battery_temp")?,
        motor_current: numeric("motor_current")?,
        inverter_temp: numeric("inverter_temp")?,
        ambient_temp: numeric("ambient_temp")?,
        tire_wear_pct: numeric("tire_wear_pct")?,
        brake_wear_pct: numeric("brake_wear_pct")?,
    })
}

/// Parses a numeric channel value. Non-finite values (`NaN`, `inf`) are
/// rejected here so the feature engine can rely on finite input.
fn parse_numeric(column: &str, value: &str, row: usize) -> Result<f64, PipelineError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PipelineError::TypeCoercion {
            column: column.to_string(),
            value: value.to_string(),
            row,
        })
}

/// Parses a timestamp strictly: naive ISO-8601, or RFC 3339 flattened to
/// its naive UTC form. Anything else rejects the batch.
fn parse_timestamp(value: &str, row: usize) -> Result<NaiveDateTime, PipelineError> {
    value
        .trim()
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value.trim())
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .ok_or_else(|| PipelineError::Timestamp {
            value: value.to_string(),
            row,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    const GOOD_HEADER: &str = "timestamp,entity_id,speed,state_of_charge,battery_temp,motor_current,inverter_temp,ambient_temp,tire_wear_pct,brake_wear_pct";

    #[test]
    fn test_valid_batch_parses() {
        let path = temp_csv(
            "ev_fleet_etl_valid.csv",
            &format!(
                "{GOOD_HEADER}\n2024-05-01T00:00:00,EV001,42.5,98.2,25.1,110.0,20.5,19.8,99.99,99.98\n"
            ),
        );

        let records = load_csv(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_id, "EV001");
        assert_eq!(records[0].speed, 42.5);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_numeric_looking_entity_id_stays_string() {
        let path = temp_csv(
            "ev_fleet_etl_numeric_id.csv",
            &format!(
                "{GOOD_HEADER}\n2024-05-01T00:00:00,0042,1,1,1,1,1,1,1,1\n"
            ),
        );

        let records = load_csv(&path).unwrap();
        assert_eq!(records[0].entity_id, "0042");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_columns_all_named() {
        // header missing both speed and ambient_temp
        let path = temp_csv(
            "ev_fleet_etl_missing.csv",
            "timestamp,entity_id,state_of_charge,battery_temp,motor_current,inverter_temp,tire_wear_pct,brake_wear_pct\n",
        );

        let err = load_csv(&path).unwrap_err();
        match err {
            PipelineError::Schema { missing } => {
                assert_eq!(missing, vec!["speed".to_string(), "ambient_temp".to_string()]);
            }
            other => panic!("expected Schema error, got {other:?}"),
        }

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_non_numeric_value_rejects_batch() {
        let path = temp_csv(
            "ev_fleet_etl_bad_numeric.csv",
            &format!(
                "{GOOD_HEADER}\n2024-05-01T00:00:00,EV001,42.5,98.2,hot,110.0,20.5,19.8,99.99,99.98\n"
            ),
        );

        let err = load_csv(&path).unwrap_err();
        match err {
            PipelineError::TypeCoercion { column, row, .. } => {
                assert_eq!(column, "battery_temp");
                assert_eq!(row, 1);
            }
            other => panic!("expected TypeCoercion error, got {other:?}"),
        }

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_nan_is_not_numeric() {
        // "NaN" parses as f64 but would poison every rolling stat downstream
        let path = temp_csv(
            "ev_fleet_etl_nan.csv",
            &format!(
                "{GOOD_HEADER}\n2024-05-01T00:00:00,EV001,NaN,98.2,25.1,110.0,20.5,19.8,99.99,99.98\n"
            ),
        );

        let err = load_csv(&path).unwrap_err();
        assert!(matches!(err, PipelineError::TypeCoercion { ref column, .. } if column == "speed"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bad_timestamp_rejects_batch() {
        let path = temp_csv(
            "ev_fleet_etl_bad_ts.csv",
            &format!(
                "{GOOD_HEADER}\nyesterday,EV001,42.5,98.2,25.1,110.0,20.5,19.8,99.99,99.98\n"
            ),
        );

        let err = load_csv(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Timestamp { ref value, row: 1 } if value == "yesterday"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_rfc3339_timestamp_accepted() {
        let path = temp_csv(
            "ev_fleet_etl_rfc3339.csv",
            &format!(
                "{GOOD_HEADER}\n2024-05-01T00:00:00+02:00,EV001,42.5,98.2,25.1,110.0,20.5,19.8,99.99,99.98\n"
            ),
        );

        let records = load_csv(&path).unwrap();
        // offset flattened to naive UTC
        assert_eq!(
            records[0].timestamp,
            "2024-04-30T22:00:00".parse::<NaiveDateTime>().unwrap()
        );

        fs::remove_file(&path).unwrap();
    }
}
