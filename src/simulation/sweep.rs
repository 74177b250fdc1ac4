// src/simulation/sweep.rs
//
// Sensitivity harness: runs the daily loop across (scenario x category x
// hospital size) combinations on a worker pool and rolls the results up.
// Each instance is an independent, deterministic, single-threaded run;
// results merge only here.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{BaseParams, Category, HospitalSize, OrderingMode, ResolvedParams, ScenarioSet};
use crate::error::ConfigError;
use crate::io::demand::generate_demand;
use crate::metrics::{percentile, InstanceMetrics};
use crate::simulation::engine::{derive_seed, SkuSimulation};

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub scenarios: Vec<String>,
    pub categories: Vec<Category>,
    pub sizes: Vec<HospitalSize>,
    pub instances_per_combo: usize,
    pub horizon_days: usize,
    pub start_date: NaiveDate,
    pub base_seed: u64,
    pub compare_policies: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            scenarios: vec!["baseline".to_owned()],
            categories: Category::ALL.to_vec(),
            sizes: HospitalSize::ALL.to_vec(),
            instances_per_combo: 3,
            // Three calendar years, matching the 2023-2025 bank horizon.
            horizon_days: 1096,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date"),
            base_seed: 42,
            compare_policies: false,
        }
    }
}

/// One completed instance with its resolved identity and summary metrics.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceResult {
    pub scenario: String,
    pub category: Category,
    pub hospital_size: HospitalSize,
    pub instance: usize,
    pub seed: u64,
    pub policy: String,
    pub lead_time_days: u32,
    pub total_days: usize,
    pub stockout_days: usize,
    pub stockout_rate: f64,
    pub total_used: u64,
    pub total_expired: u64,
    pub expired_rate: f64,
    pub avg_on_hand: f64,
}

/// One rollup row per (scenario, category); category "ALL" is the
/// scenario-wide summary.
#[derive(Debug, Clone, Serialize)]
pub struct SweepRow {
    pub scenario: String,
    pub category: String,
    pub instances: usize,
    pub mean_stockout_rate: f64,
    pub p95_stockout_rate: f64,
    pub mean_expired_rate: f64,
    pub p50_expired_rate: f64,
    pub p90_expired_rate: f64,
    pub p95_expired_rate: f64,
}

/// Same horizon replayed under each forced policy for one combination.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyComparisonRow {
    pub scenario: String,
    pub category: Category,
    pub hospital_size: HospitalSize,
    pub policy_mode: String,
    pub chosen_policy: String,
    pub stockout_rate: f64,
    pub expired_rate: f64,
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub instances: Vec<InstanceResult>,
    pub rows: Vec<SweepRow>,
    pub comparisons: Vec<PolicyComparisonRow>,
    /// Instances dropped for per-instance data errors.
    pub skipped: usize,
}

struct InstanceSpec {
    scenario: String,
    params: ResolvedParams,
    category: Category,
    size: HospitalSize,
    instance: usize,
}

impl InstanceSpec {
    fn id(&self) -> String {
        format!("{}/{}/{}", self.category, self.size, self.instance)
    }
}

/// Runs the full sweep. Configuration problems are fatal up front; data
/// problems skip the one instance and the sweep carries on.
pub fn run_sweep(
    base: &BaseParams,
    scenarios: &ScenarioSet,
    cfg: &SweepConfig,
) -> Result<SweepOutcome, ConfigError> {
    // Resolve (and validate) every scenario before simulating anything.
    let mut specs = Vec::new();
    for scenario_id in &cfg.scenarios {
        let resolved = crate::config::resolve(base, scenarios, scenario_id)?;
        for &category in &cfg.categories {
            let params = &resolved[&category];
            for &size in &cfg.sizes {
                for instance in 0..cfg.instances_per_combo {
                    specs.push(InstanceSpec {
                        scenario: scenario_id.clone(),
                        params: params.clone(),
                        category,
                        size,
                        instance,
                    });
                }
            }
        }
    }
    info!(instances = specs.len(), "sweep resolved");

    let results: Vec<Option<InstanceResult>> = specs
        .par_iter()
        .map(|spec| run_instance(spec, cfg))
        .collect();

    let skipped = results.iter().filter(|r| r.is_none()).count();
    let instances: Vec<InstanceResult> = results.into_iter().flatten().collect();
    let rows = aggregate(&instances);

    let comparisons = if cfg.compare_policies {
        specs
            .par_iter()
            .filter(|spec| spec.instance == 0)
            .flat_map_iter(|spec| compare_policies(spec, cfg))
            .collect()
    } else {
        Vec::new()
    };

    info!(
        completed = instances.len(),
        skipped, "sweep finished"
    );
    Ok(SweepOutcome {
        instances,
        rows,
        comparisons,
        skipped,
    })
}

fn instance_demand(spec: &InstanceSpec, cfg: &SweepConfig) -> Vec<u32> {
    let demand_seed = derive_seed(
        cfg.base_seed,
        &spec.scenario,
        &format!("{}/demand", spec.id()),
    );
    let mut rng = StdRng::seed_from_u64(demand_seed);
    generate_demand(
        spec.category,
        spec.size,
        cfg.start_date,
        cfg.horizon_days,
        &mut rng,
    )
}

fn run_instance(spec: &InstanceSpec, cfg: &SweepConfig) -> Option<InstanceResult> {
    let demand = instance_demand(spec, cfg);
    let sim_seed = derive_seed(cfg.base_seed, &spec.scenario, &format!("{}/sim", spec.id()));

    let mut sim = match SkuSimulation::new(
        &spec.id(),
        spec.params.clone(),
        demand,
        cfg.start_date,
        sim_seed,
    ) {
        Ok(sim) => sim,
        Err(err) => {
            warn!(
                scenario = %spec.scenario,
                instance = %spec.id(),
                %err,
                "skipping instance"
            );
            return None;
        }
    };

    let metrics = InstanceMetrics::from_records(sim.run());
    Some(InstanceResult {
        scenario: spec.scenario.clone(),
        category: spec.category,
        hospital_size: spec.size,
        instance: spec.instance,
        seed: sim_seed,
        policy: sim.policy().chosen.to_owned(),
        lead_time_days: sim.planning_lead_time(),
        total_days: metrics.total_days,
        stockout_days: metrics.stockout_days,
        stockout_rate: metrics.stockout_rate,
        total_used: metrics.total_used,
        total_expired: metrics.total_expired,
        expired_rate: metrics.expired_rate,
        avg_on_hand: metrics.avg_on_hand,
    })
}

/// Replays one combination's demand under forecast-only, par-only, and auto
/// for direct comparison.
fn compare_policies(spec: &InstanceSpec, cfg: &SweepConfig) -> Vec<PolicyComparisonRow> {
    let demand = instance_demand(spec, cfg);
    let sim_seed = derive_seed(cfg.base_seed, &spec.scenario, &format!("{}/sim", spec.id()));

    let modes = [
        ("forecast_only", OrderingMode::ForecastDriven),
        ("par_only", OrderingMode::ParDriven),
        ("auto", OrderingMode::Auto),
    ];
    let mut rows = Vec::with_capacity(modes.len());
    for (label, mode) in modes {
        let mut params = spec.params.clone();
        params.ordering_mode = mode;
        let sim = SkuSimulation::new(&spec.id(), params, demand.clone(), cfg.start_date, sim_seed);
        let Ok(mut sim) = sim else { continue };
        let metrics = InstanceMetrics::from_records(sim.run());
        rows.push(PolicyComparisonRow {
            scenario: spec.scenario.clone(),
            category: spec.category,
            hospital_size: spec.size,
            policy_mode: label.to_owned(),
            chosen_policy: sim.policy().chosen.to_owned(),
            stockout_rate: metrics.stockout_rate,
            expired_rate: metrics.expired_rate,
        });
    }
    rows
}

fn summarize(scenario: &str, category: &str, group: &[&InstanceResult]) -> SweepRow {
    let stockouts: Vec<f64> = group.iter().map(|r| r.stockout_rate).collect();
    let expireds: Vec<f64> = group.iter().map(|r| r.expired_rate).collect();
    let n = group.len().max(1) as f64;
    SweepRow {
        scenario: scenario.to_owned(),
        category: category.to_owned(),
        instances: group.len(),
        mean_stockout_rate: stockouts.iter().sum::<f64>() / n,
        p95_stockout_rate: percentile(&stockouts, 0.95),
        mean_expired_rate: expireds.iter().sum::<f64>() / n,
        p50_expired_rate: percentile(&expireds, 0.50),
        p90_expired_rate: percentile(&expireds, 0.90),
        p95_expired_rate: percentile(&expireds, 0.95),
    }
}

fn aggregate(instances: &[InstanceResult]) -> Vec<SweepRow> {
    let mut by_combo: BTreeMap<(String, Category), Vec<&InstanceResult>> = BTreeMap::new();
    let mut by_scenario: BTreeMap<String, Vec<&InstanceResult>> = BTreeMap::new();
    for result in instances {
        by_combo
            .entry((result.scenario.clone(), result.category))
            .or_default()
            .push(result);
        by_scenario
            .entry(result.scenario.clone())
            .or_default()
            .push(result);
    }

    let mut rows = Vec::new();
    for ((scenario, category), group) in &by_combo {
        rows.push(summarize(scenario, &category.to_string(), group));
    }
    for (scenario, group) in &by_scenario {
        rows.push(summarize(scenario, "ALL", group));
    }
    rows
}
