// src/simulation/engine.rs

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::ResolvedParams;
use crate::error::DataError;
use crate::model::lead_time::LeadTimeSampler;
use crate::model::ledger::{BatchLedger, PendingOrder, HISTORY_WINDOW_DAYS};
use crate::strategy::selection::{build_policy, PolicyChoice};

/// Days of coverage seeded as the opening batch.
const INITIAL_STOCK_DAYS: f64 = 60.0;

/// One output row per simulated day. Append-only; the authoritative ledger
/// from which all metrics derive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub total_onsite_units: u32,
    pub expired_units: u32,
    pub used_units: u32,
    pub newly_added_units: u32,
    pub ordered_units: u32,
    pub non_expired_inventory: u32,
    pub stockout: bool,
}

/// Per-day state machine for one SKU instance at one cart/location.
///
/// The phase order within a day is fixed: consume today's demand, decide
/// whether to order against post-consumption stock, receive due orders, then
/// expire. Ordering must not see stock inflated by same-day arrivals, and a
/// received batch gets at least one day in which it could be consumed before
/// it can expire.
pub struct SkuSimulation {
    params: ResolvedParams,
    policy: PolicyChoice,
    sampler: LeadTimeSampler,
    ledger: BatchLedger,
    rng: StdRng,
    demand: Vec<u32>,
    start_date: NaiveDate,
    seed: u64,
    day_index: usize,
    previous_on_hand: u32,
    pub history: Vec<DailyRecord>,
}

impl SkuSimulation {
    /// Builds one instance. The demand series is validated here: an empty or
    /// all-zero series is a `DataError` for this instance, not a panic.
    pub fn new(
        instance: &str,
        params: ResolvedParams,
        demand: Vec<u32>,
        start_date: NaiveDate,
        seed: u64,
    ) -> Result<Self, DataError> {
        if demand.is_empty() {
            return Err(DataError::EmptyDemand {
                instance: instance.to_owned(),
            });
        }
        if demand.iter().all(|&d| d == 0) {
            return Err(DataError::DegenerateDemand {
                instance: instance.to_owned(),
                days: demand.len(),
            });
        }

        let policy = build_policy(&params, &demand);
        debug!(
            instance,
            policy = policy.chosen,
            rationale = ?policy.rationale,
            "policy selected"
        );

        let sampler = LeadTimeSampler::from_config(params.lead_time);
        let mut ledger = BatchLedger::new(params.consumption_order);

        // Opening stock: one batch covering ~INITIAL_STOCK_DAYS of average
        // usage, dated as if it arrived on day zero. Coverage is capped at
        // the shelf life so a short-dated SKU does not open with stock it
        // could never consume in time.
        let avg_daily = demand.iter().map(|&d| f64::from(d)).sum::<f64>() / demand.len() as f64;
        let cover_days = INITIAL_STOCK_DAYS.min(f64::from(params.effective_shelf_life_days()));
        let initial_stock = (avg_daily * cover_days).round() as u32;
        let expiry = start_date + Days::new(u64::from(params.effective_shelf_life_days()));
        ledger.seed_initial_stock(initial_stock, start_date, expiry);

        Ok(Self {
            params,
            policy,
            sampler,
            ledger,
            rng: StdRng::seed_from_u64(seed),
            demand,
            start_date,
            seed,
            day_index: 0,
            previous_on_hand: initial_stock,
            history: Vec::new(),
        })
    }

    pub fn params(&self) -> &ResolvedParams {
        &self.params
    }

    pub fn policy(&self) -> &PolicyChoice {
        &self.policy
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn horizon_days(&self) -> usize {
        self.demand.len()
    }

    /// Lead time recorded in the manifest: the fixed constant, or the
    /// distribution median for stochastic transit.
    pub fn planning_lead_time(&self) -> u32 {
        self.params.lead_time.expected_days()
    }

    /// Runs the full horizon, one day per tick, and returns the ledger of
    /// daily records.
    pub fn run(&mut self) -> &[DailyRecord] {
        self.history.reserve(self.demand.len());
        while self.day_index < self.demand.len() {
            self.step();
        }
        &self.history
    }

    fn step(&mut self) {
        let day = self.day_index;
        let today = self.start_date + Days::new(day as u64);
        let demand_units = self.demand[day];

        // Phase 1: consume today's demand.
        let outcome = self.ledger.consume(demand_units);

        // Phase 2: ordering decision against post-consumption stock.
        let order_qty =
            self.policy
                .state
                .decide(day, &self.ledger, &self.params, HISTORY_WINDOW_DAYS);
        let ordered_units = if order_qty > 0 {
            let transit = self.sampler.sample(&mut self.rng);
            let arrival_date = today + Days::new(u64::from(transit));
            self.ledger.place_order(PendingOrder {
                quantity: order_qty,
                order_date: today,
                arrival_date,
            });
            trace!(%today, order_qty, transit, "order placed");
            order_qty
        } else {
            0
        };

        // Phase 3: arrivals due today (includes a zero-lead-time order
        // placed moments ago).
        let newly_added_units = self
            .ledger
            .receive_due_orders(today, self.params.effective_shelf_life_days());

        // Phase 4: expiry, after consumption and arrivals.
        let expired_units = self.ledger.expire(today);

        let total_onsite_units = self.ledger.on_hand();
        debug_assert_eq!(
            total_onsite_units,
            self.previous_on_hand + newly_added_units - outcome.used_units - expired_units,
            "unit conservation violated on {today}"
        );
        self.previous_on_hand = total_onsite_units;

        self.history.push(DailyRecord {
            date: today,
            total_onsite_units,
            expired_units,
            used_units: outcome.used_units,
            newly_added_units,
            ordered_units,
            non_expired_inventory: self.ledger.non_expired(today),
            stockout: outcome.stockout,
        });
        self.day_index += 1;
    }
}

/// Derives a per-instance seed from the base seed and the instance identity,
/// so re-running one configuration reproduces identical output.
pub fn derive_seed(base_seed: u64, scenario_id: &str, instance_id: &str) -> u64 {
    // FNV-1a over the identifying strings, folded onto the base seed.
    let mut hash = 0xcbf2_9ce4_8422_2325u64 ^ base_seed;
    for byte in scenario_id.bytes().chain([b'/']).chain(instance_id.bytes()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, BaseParams, Category, LeadTime, ScenarioSet};

    fn params(category: Category, scenario: &str) -> ResolvedParams {
        resolve(&BaseParams::default(), &ScenarioSet::default(), scenario)
            .unwrap()
            .remove(&category)
            .unwrap()
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    #[test]
    fn empty_demand_is_a_data_error() {
        let err = SkuSimulation::new("t", params(Category::A, "baseline"), vec![], start(), 1)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, DataError::EmptyDemand { .. }));
    }

    #[test]
    fn all_zero_demand_is_a_data_error() {
        let err =
            SkuSimulation::new("t", params(Category::A, "baseline"), vec![0; 50], start(), 1)
                .map(|_| ())
                .unwrap_err();
        assert!(matches!(err, DataError::DegenerateDemand { days: 50, .. }));
    }

    #[test]
    fn conservation_holds_every_day() {
        let demand: Vec<u32> = (0..400).map(|d| 5 + (d % 13)).collect();
        let mut sim =
            SkuSimulation::new("t", params(Category::A, "baseline"), demand, start(), 7).unwrap();
        let records = sim.run();

        let mut previous = records[0].total_onsite_units + records[0].used_units
            + records[0].expired_units
            - records[0].newly_added_units;
        for rec in records {
            assert_eq!(
                rec.total_onsite_units,
                previous + rec.newly_added_units - rec.used_units - rec.expired_units,
                "conservation broken on {}",
                rec.date
            );
            previous = rec.total_onsite_units;
        }
    }

    #[test]
    fn used_never_exceeds_demand() {
        let demand: Vec<u32> = (0..300).map(|d| d % 40).collect();
        let mut sim = SkuSimulation::new(
            "t",
            params(Category::B, "baseline"),
            demand.clone(),
            start(),
            3,
        )
        .unwrap();
        for (rec, &d) in sim.run().iter().zip(&demand) {
            assert!(rec.used_units <= d);
        }
    }

    #[test]
    fn identical_seed_produces_byte_identical_records() {
        let demand: Vec<u32> = (0..500).map(|d| 8 + (d % 7)).collect();
        let run = |seed| {
            let mut sim = SkuSimulation::new(
                "t",
                params(Category::A, "S3"),
                demand.clone(),
                start(),
                seed,
            )
            .unwrap();
            sim.run().to_vec()
        };
        assert_eq!(run(41), run(41));
        // Stochastic lead times under a different seed diverge somewhere.
        assert_ne!(run(41), run(42));
    }

    #[test]
    fn zero_lead_time_order_arrives_same_day() {
        let mut p = params(Category::A, "baseline");
        p.lead_time = LeadTime::Fixed { days: 0 };
        // Constant demand; the first order after the opening stock drains
        // must land the day it is placed.
        let mut sim = SkuSimulation::new("t", p, vec![10; 365], start(), 5).unwrap();
        let records = sim.run();
        let first_order = records.iter().find(|r| r.ordered_units > 0).unwrap();
        assert_eq!(first_order.newly_added_units, first_order.ordered_units);
        assert!(records.iter().all(|r| !r.stockout));
    }

    #[test]
    fn derived_seeds_are_stable_and_distinct() {
        let a = derive_seed(42, "S1", "A/medium/0");
        assert_eq!(a, derive_seed(42, "S1", "A/medium/0"));
        assert_ne!(a, derive_seed(42, "S1", "A/medium/1"));
        assert_ne!(a, derive_seed(42, "S2", "A/medium/0"));
        assert_ne!(a, derive_seed(43, "S1", "A/medium/0"));
    }
}
