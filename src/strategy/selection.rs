// src/strategy/selection.rs
//
// Auto policy selection: chosen once per SKU instance at setup from demand
// characteristics, then fixed for the whole horizon.

use serde::Serialize;

use crate::config::{OrderingMode, ResolvedParams};
use crate::strategy::policy::{ForecastState, ParState, PolicyState};

/// Below this average daily usage an item counts as low-volume.
const LOW_VOLUME_THRESHOLD: f64 = 5.0;
/// Above this coefficient of variation demand counts as highly intermittent.
const HIGH_CV_THRESHOLD: f64 = 1.0;
/// Below this shelf life (days) an item counts as short-dated.
const SHORT_SHELF_LIFE_DAYS: u32 = 180;
/// Par coverage assumed when auto selection picks par for a category that
/// never configured one.
const DEFAULT_PAR_LEVEL_DAYS: u32 = 30;

/// Setup-time summary of the demand series.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DemandStats {
    pub mean: f64,
    pub cv: f64,
}

impl DemandStats {
    pub fn from_series(demand: &[u32]) -> Self {
        if demand.is_empty() {
            return Self { mean: 0.0, cv: 0.0 };
        }
        let n = demand.len() as f64;
        let mean = demand.iter().map(|&d| f64::from(d)).sum::<f64>() / n;
        let var = demand
            .iter()
            .map(|&d| {
                let diff = f64::from(d) - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        let cv = if mean > 0.0 { var.sqrt() / mean } else { 0.0 };
        Self { mean, cv }
    }
}

/// The chosen policy plus the rationale recorded in the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyChoice {
    #[serde(skip)]
    pub state: PolicyState,
    pub chosen: &'static str,
    pub rationale: Vec<String>,
    pub stats: DemandStats,
}

/// Builds the fixed policy for one instance. `Auto` resolves here and is
/// never re-evaluated during the run.
pub fn build_policy(params: &ResolvedParams, demand: &[u32]) -> PolicyChoice {
    let stats = DemandStats::from_series(demand);
    match params.ordering_mode {
        OrderingMode::ForecastDriven => PolicyChoice {
            state: PolicyState::ForecastDriven(ForecastState::new()),
            chosen: "forecast_driven",
            rationale: vec!["fixed by scenario".to_owned()],
            stats,
        },
        OrderingMode::ParDriven => PolicyChoice {
            state: PolicyState::ParDriven(par_state(params)),
            chosen: "par_driven",
            rationale: vec!["fixed by scenario".to_owned()],
            stats,
        },
        OrderingMode::Auto => auto_select(params, stats),
    }
}

fn par_state(params: &ResolvedParams) -> ParState {
    let lead = params.lead_time.expected_days();
    // An auto-derived exchange must still clear the lead time by a week;
    // fall back to a biweekly exchange when the category cadence is tighter.
    let cadence = params.order_cadence_days.max(lead + 7).max(14);
    ParState {
        par_level_days: params.par_level_days.unwrap_or(DEFAULT_PAR_LEVEL_DAYS),
        exchange_cadence_days: cadence,
    }
}

fn auto_select(params: &ResolvedParams, stats: DemandStats) -> PolicyChoice {
    let low_volume = stats.mean < LOW_VOLUME_THRESHOLD;
    let high_cv = stats.cv > HIGH_CV_THRESHOLD;
    let short_shelf = params.effective_shelf_life_days() < SHORT_SHELF_LIFE_DAYS;
    let moq_forces_overorder = stats.mean * 30.0 < f64::from(params.moq_units);

    let mut rationale = Vec::new();
    let mut par = false;

    if params.exchange_based() {
        par = true;
        rationale.push("exchange-based replenishment".to_owned());
    } else if low_volume && high_cv {
        if params.critical {
            par = true;
            rationale.push("low volume + high intermittency, critical item".to_owned());
        } else if moq_forces_overorder {
            par = true;
            rationale.push("low volume + high intermittency, MOQ forces over-ordering".to_owned());
        }
    }
    if !par && low_volume && short_shelf {
        par = true;
        rationale.push("low volume + short shelf life".to_owned());
    }

    if par {
        let state = par_state(params);
        if state.exchange_cadence_days != params.order_cadence_days {
            rationale.push(format!(
                "exchange cadence widened to {} days to clear lead time",
                state.exchange_cadence_days
            ));
        }
        PolicyChoice {
            state: PolicyState::ParDriven(state),
            chosen: "par_driven",
            rationale,
            stats,
        }
    } else {
        rationale.push("high volume or low intermittency (default)".to_owned());
        PolicyChoice {
            state: PolicyState::ForecastDriven(ForecastState::new()),
            chosen: "forecast_driven",
            rationale,
            stats,
        }
    }
}
