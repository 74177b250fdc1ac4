// src/metrics.rs

use chrono::NaiveDate;
use serde::Serialize;

use crate::simulation::engine::DailyRecord;

/// Summary statistics for one instance's daily ledger (or a date slice of
/// it). Stockout and expiry are the measured outcomes, never errors.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InstanceMetrics {
    pub total_days: usize,
    pub stockout_days: usize,
    /// stockout_days / total_days.
    pub stockout_rate: f64,
    pub total_used: u64,
    pub total_expired: u64,
    pub total_received: u64,
    pub total_ordered: u64,
    /// expired / (used + expired).
    pub expired_rate: f64,
    pub avg_on_hand: f64,
    pub end_on_hand: u32,
}

impl InstanceMetrics {
    pub fn from_records(records: &[DailyRecord]) -> Self {
        let total_days = records.len();
        let stockout_days = records.iter().filter(|r| r.stockout).count();
        let total_used: u64 = records.iter().map(|r| u64::from(r.used_units)).sum();
        let total_expired: u64 = records.iter().map(|r| u64::from(r.expired_units)).sum();
        let total_received: u64 = records.iter().map(|r| u64::from(r.newly_added_units)).sum();
        let total_ordered: u64 = records.iter().map(|r| u64::from(r.ordered_units)).sum();
        let on_hand_sum: u64 = records.iter().map(|r| u64::from(r.total_onsite_units)).sum();

        let consumed_or_expired = total_used + total_expired;
        Self {
            total_days,
            stockout_days,
            stockout_rate: ratio(stockout_days as u64, total_days as u64),
            total_used,
            total_expired,
            total_received,
            total_ordered,
            expired_rate: ratio(total_expired, consumed_or_expired),
            avg_on_hand: if total_days == 0 {
                0.0
            } else {
                on_hand_sum as f64 / total_days as f64
            },
            end_on_hand: records.last().map_or(0, |r| r.total_onsite_units),
        }
    }

    /// Metrics over a reporting slice. Slicing is for metrics only; the
    /// simulation state itself is never reset at a period boundary.
    pub fn over_period(records: &[DailyRecord], from: NaiveDate, until: NaiveDate) -> Self {
        let slice: Vec<DailyRecord> = records
            .iter()
            .filter(|r| r.date >= from && r.date < until)
            .cloned()
            .collect();
        Self::from_records(&slice)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Interpolation-free percentile over a sample of rates.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("rates are finite"));
    let rank = (pct.clamp(0.0, 1.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank]
}
