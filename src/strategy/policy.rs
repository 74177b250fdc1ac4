// src/strategy/policy.rs

use serde::Serialize;

use crate::config::ResolvedParams;
use crate::model::ledger::BatchLedger;

/// Safety-stock posture of a forecast-driven instance. Transitioned by a
/// pure function of the trailing stockout window, recomputed once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SafetyLevel {
    /// Trailing stockouts near zero for a full window: run leaner.
    Relaxed,
    Standard,
    /// Stockouts recurring: buy extra protection.
    Strict,
}

impl SafetyLevel {
    /// Window must be full (30 days) before relaxing; recurring stockouts
    /// above 2% tighten immediately.
    pub fn from_stockout_window(trailing_rate: f64, window_len: usize, full_window: usize) -> Self {
        if trailing_rate > 0.02 {
            SafetyLevel::Strict
        } else if window_len >= full_window && trailing_rate < 0.005 {
            SafetyLevel::Relaxed
        } else {
            SafetyLevel::Standard
        }
    }

    /// Service level actually used for safety-stock sizing.
    pub fn effective_service_level(self, configured: f64) -> f64 {
        match self {
            SafetyLevel::Relaxed => configured.min(0.95),
            SafetyLevel::Standard => configured,
            SafetyLevel::Strict => configured.max(0.995),
        }
    }
}

/// Approximate inverse CDF of the standard normal (Abramowitz & Stegun
/// 26.2.23, absolute error < 4.5e-4). Maps a service level to its Z-score.
pub fn z_score(p: f64) -> f64 {
    if p >= 1.0 {
        return 5.0;
    }
    if p <= 0.0 {
        return -5.0;
    }
    if (p - 0.5).abs() < f64::EPSILON {
        return 0.0;
    }

    let q = if p < 0.5 { p } else { 1.0 - p };
    let t = (-2.0 * q.ln()).sqrt();

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;
    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let x = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);
    if p < 0.5 {
        -x
    } else {
        x
    }
}

/// Rounds a raw quantity up to the MOQ/SPQ grid: at least `moq`, and a
/// multiple of `spq`. Zero stays zero (no forced minimum order).
pub fn round_to_pack(raw: f64, moq: u32, spq: u32) -> u32 {
    if raw <= 0.0 {
        return 0;
    }
    let mut qty = (raw.ceil() as u32).max(moq.max(1));
    if spq > 1 {
        qty = qty.div_ceil(spq) * spq;
    }
    qty
}

/// Forecast-driven replenishment state.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastState {
    pub safety_level: SafetyLevel,
    pub order_cap_days: u32,
    pub safety_factor: f64,
    pub early_warning_days: f64,
    pub reorder_percentile: f64,
    /// Short trailing window for the adaptive order quantity.
    pub adaptive_window_days: usize,
}

impl ForecastState {
    pub fn new() -> Self {
        Self {
            safety_level: SafetyLevel::Standard,
            order_cap_days: 21,
            safety_factor: 1.2,
            early_warning_days: 3.0,
            reorder_percentile: 0.95,
            adaptive_window_days: 7,
        }
    }
}

impl Default for ForecastState {
    fn default() -> Self {
        Self::new()
    }
}

/// Par-driven (exchange) replenishment state.
#[derive(Debug, Clone, Serialize)]
pub struct ParState {
    pub par_level_days: u32,
    pub exchange_cadence_days: u32,
}

/// The fixed policy an SKU instance runs for its whole horizon. A closed sum
/// type with an exhaustive match in the daily loop; Auto resolves into one
/// of the two variants at setup and is never re-evaluated.
#[derive(Debug, Clone, Serialize)]
pub enum PolicyState {
    ForecastDriven(ForecastState),
    ParDriven(ParState),
}

impl PolicyState {
    pub fn label(&self) -> &'static str {
        match self {
            PolicyState::ForecastDriven(_) => "forecast_driven",
            PolicyState::ParDriven(_) => "par_driven",
        }
    }

    /// One ordering decision for one simulated day. Returns the quantity to
    /// order (0 = no order). Sees today's post-consumption stock; arrivals
    /// land after this decision.
    pub fn decide(
        &mut self,
        day_index: usize,
        ledger: &BatchLedger,
        params: &ResolvedParams,
        full_window: usize,
    ) -> u32 {
        match self {
            PolicyState::ForecastDriven(state) => {
                forecast_decision(state, ledger, params, full_window)
            }
            PolicyState::ParDriven(state) => par_decision(state, day_index, ledger, params),
        }
    }
}

fn forecast_decision(
    state: &mut ForecastState,
    ledger: &BatchLedger,
    params: &ResolvedParams,
    full_window: usize,
) -> u32 {
    // Daily safety-level transition, driven only by the trailing window.
    state.safety_level = SafetyLevel::from_stockout_window(
        ledger.trailing_stockout_rate(),
        ledger.stockout_window_len(),
        full_window,
    );

    let recent_avg = ledger.recent_avg_daily_usage(14);
    if recent_avg <= 0.0 {
        return 0;
    }

    let lead_days = f64::from(params.lead_time.expected_days());
    let on_hand = f64::from(ledger.on_hand());
    let pending = f64::from(ledger.pending_units());
    let position = on_hand + pending;

    let service = state
        .safety_level
        .effective_service_level(params.service_level);
    let safety_stock = z_score(service) * lead_days.sqrt() * recent_avg;

    // Demand projected until the next order could arrive: transit plus one
    // review period.
    let horizon_days = lead_days + f64::from(params.order_cadence_days);
    let projected = recent_avg * horizon_days;

    // Three independent triggers; first one reached wins.
    let look_ahead = position < projected + safety_stock;
    let reorder_point = ledger.recent_usage_percentile(state.reorder_percentile) * lead_days;
    let percentile_trigger = on_hand < reorder_point;
    let early_warning = on_hand < state.early_warning_days * recent_avg;

    if !(look_ahead || percentile_trigger || early_warning) {
        return 0;
    }

    // Inventory-aware suppression: enough cover on hand plus in transit.
    if position >= projected * state.safety_factor {
        return 0;
    }

    // Adaptive quantity anchored on actual short-window consumption, not a
    // fixed multiplier, so over-orders do not compound.
    let short_avg = ledger.recent_avg_daily_usage(state.adaptive_window_days);
    let adaptive = short_avg * horizon_days + safety_stock - position;
    let cap = f64::from(state.order_cap_days) * recent_avg;
    let clipped = adaptive.clamp(0.0, cap);
    if clipped <= 0.0 {
        return 0;
    }

    round_to_pack(clipped * params.order_multiplier, params.moq_units, params.spq_units)
}

fn par_decision(
    state: &ParState,
    day_index: usize,
    ledger: &BatchLedger,
    params: &ResolvedParams,
) -> u32 {
    // Orders happen only on exchange days, independent of the demand signal.
    if state.exchange_cadence_days == 0
        || day_index % state.exchange_cadence_days as usize != 0
    {
        return 0;
    }

    // Par level in units is recomputed at each exchange from recent usage.
    let recent_avg = ledger.recent_avg_daily_usage(30);
    let par_units = f64::from(state.par_level_days) * recent_avg;
    if par_units <= 0.0 {
        return 0;
    }

    let on_hand = f64::from(ledger.on_hand());
    if on_hand >= par_units {
        return 0;
    }

    let pending = f64::from(ledger.pending_units());
    let shortfall = par_units - on_hand - pending;
    if shortfall <= 0.0 {
        return 0;
    }

    let qty = round_to_pack(shortfall, params.moq_units, params.spq_units);
    let cap = (1.5 * par_units).floor() as u32;
    qty.min(cap)
}
