// src/io/report.rs

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::simulation::engine::DailyRecord;
use crate::simulation::sweep::{InstanceResult, PolicyComparisonRow, SweepRow};

/// One manifest row per SKU instance: its resolved configuration, consumed
/// by the downstream forecasting/evaluation pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestRow {
    pub instance_id: String,
    pub scenario: String,
    pub category: String,
    pub hospital_size: String,
    pub seed: u64,
    pub lead_time_days: u32,
    pub policy: String,
    pub rationale: String,
    pub avg_daily_usage: f64,
    pub cv_demand: f64,
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

/// Writes one instance's daily time series.
pub fn write_daily_records(path: &Path, records: &[DailyRecord]) -> Result<(), csv::Error> {
    write_rows(path, records)
}

pub fn write_manifest(path: &Path, rows: &[ManifestRow]) -> Result<(), csv::Error> {
    write_rows(path, rows)
}

/// Per-instance sweep detail: one row per completed instance.
pub fn write_instance_results(path: &Path, rows: &[InstanceResult]) -> Result<(), csv::Error> {
    write_rows(path, rows)
}

/// The primary sweep artifact: one row per (scenario, category) rollup.
pub fn write_sweep_results(path: &Path, rows: &[SweepRow]) -> Result<(), csv::Error> {
    write_rows(path, rows)
}

/// Forecast-only / par-only / auto replays of the same horizon.
pub fn write_policy_comparison(
    path: &Path,
    rows: &[PolicyComparisonRow],
) -> Result<(), csv::Error> {
    write_rows(path, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn daily_records_round_trip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.csv");
        let records = vec![DailyRecord {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            total_onsite_units: 90,
            expired_units: 0,
            used_units: 10,
            newly_added_units: 0,
            ordered_units: 125,
            non_expired_inventory: 90,
            stockout: false,
        }];
        write_daily_records(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,total_onsite_units,expired_units,used_units,newly_added_units,ordered_units,non_expired_inventory,stockout"
        );
        assert_eq!(lines.next().unwrap(), "2023-01-01,90,0,10,0,125,90,false");
    }
}
