use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cartstock::config::{resolve, BaseParams, Category, HospitalSize, ScenarioSet};
use cartstock::io::demand::generate_demand;
use cartstock::io::report::{self, ManifestRow};
use cartstock::metrics::InstanceMetrics;
use cartstock::simulation::engine::{derive_seed, SkuSimulation};
use cartstock::simulation::sweep::{run_sweep, SweepConfig};

#[derive(Parser)]
#[command(name = "cartstock", version, about = "Medication cart inventory simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConfigArgs {
    /// Base parameter document (TOML); compiled-in defaults when omitted.
    #[arg(long)]
    params: Option<PathBuf>,
    /// Scenario document (TOML); compiled-in defaults when omitted.
    #[arg(long)]
    scenarios: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> anyhow::Result<(BaseParams, ScenarioSet)> {
        let base = match &self.params {
            Some(path) => BaseParams::load(path)?,
            None => BaseParams::default(),
        };
        let scenarios = match &self.scenarios {
            Some(path) => ScenarioSet::load(path)?,
            None => ScenarioSet::default(),
        };
        Ok((base, scenarios))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Simulate one (scenario, category, hospital size) instance.
    Run {
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long, default_value = "baseline")]
        scenario: String,
        #[arg(long, default_value = "A")]
        category: Category,
        #[arg(long, default_value = "medium")]
        size: HospitalSize,
        #[arg(long, default_value_t = 1096)]
        days: usize,
        #[arg(long, default_value = "2023-01-01")]
        start_date: NaiveDate,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
    /// Run the sensitivity sweep across scenarios, categories, and sizes.
    Sweep {
        #[command(flatten)]
        config: ConfigArgs,
        /// Scenario ids to sweep; all defined scenarios when omitted.
        #[arg(long, value_delimiter = ',')]
        scenario: Vec<String>,
        #[arg(long, default_value_t = 3)]
        instances: usize,
        #[arg(long, default_value_t = 1096)]
        days: usize,
        #[arg(long, default_value = "2023-01-01")]
        start_date: NaiveDate,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Also replay each combination under forecast-only / par-only / auto.
        #[arg(long)]
        compare_policies: bool,
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Run {
            config,
            scenario,
            category,
            size,
            days,
            start_date,
            seed,
            out,
        } => run_single(config, scenario, category, size, days, start_date, seed, out),
        Command::Sweep {
            config,
            scenario,
            instances,
            days,
            start_date,
            seed,
            compare_policies,
            out,
        } => sweep(
            config,
            scenario,
            instances,
            days,
            start_date,
            seed,
            compare_policies,
            out,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_single(
    config: ConfigArgs,
    scenario: String,
    category: Category,
    size: HospitalSize,
    days: usize,
    start_date: NaiveDate,
    seed: u64,
    out: PathBuf,
) -> anyhow::Result<()> {
    let (base, scenarios) = config.load()?;
    let params = resolve(&base, &scenarios, &scenario)?
        .remove(&category)
        .with_context(|| format!("category {category} missing from scenario {scenario}"))?;

    let instance_id = format!("{category}/{size}/0");
    let demand_seed = derive_seed(seed, &scenario, &format!("{instance_id}/demand"));
    let sim_seed = derive_seed(seed, &scenario, &format!("{instance_id}/sim"));
    let mut rng = StdRng::seed_from_u64(demand_seed);
    let demand = generate_demand(category, size, start_date, days, &mut rng);

    let mut sim = SkuSimulation::new(&instance_id, params, demand, start_date, sim_seed)
        .with_context(|| format!("instance {instance_id}"))?;
    let records = sim.run().to_vec();
    let metrics = InstanceMetrics::from_records(&records);

    std::fs::create_dir_all(&out)
        .with_context(|| format!("creating output dir {}", out.display()))?;
    let daily_path = out.join(format!("{scenario}_{category}_{size}_daily.csv"));
    report::write_daily_records(&daily_path, &records)?;

    let manifest = ManifestRow {
        instance_id,
        scenario,
        category: category.to_string(),
        hospital_size: size.to_string(),
        seed: sim_seed,
        lead_time_days: sim.planning_lead_time(),
        policy: sim.policy().chosen.to_owned(),
        rationale: sim.policy().rationale.join("; "),
        avg_daily_usage: sim.policy().stats.mean,
        cv_demand: sim.policy().stats.cv,
    };
    report::write_manifest(&out.join("manifest.csv"), &[manifest])?;

    info!(
        days = metrics.total_days,
        stockout_rate = format!("{:.2}%", metrics.stockout_rate * 100.0),
        expired_rate = format!("{:.2}%", metrics.expired_rate * 100.0),
        avg_on_hand = format!("{:.1}", metrics.avg_on_hand),
        "run complete"
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn sweep(
    config: ConfigArgs,
    scenario_ids: Vec<String>,
    instances: usize,
    days: usize,
    start_date: NaiveDate,
    seed: u64,
    compare_policies: bool,
    out: PathBuf,
) -> anyhow::Result<()> {
    let (base, scenarios) = config.load()?;
    let ids = if scenario_ids.is_empty() {
        scenarios.scenarios.keys().cloned().collect()
    } else {
        scenario_ids
    };

    let cfg = SweepConfig {
        scenarios: ids,
        instances_per_combo: instances,
        horizon_days: days,
        start_date,
        base_seed: seed,
        compare_policies,
        ..SweepConfig::default()
    };
    let outcome = run_sweep(&base, &scenarios, &cfg)?;

    std::fs::create_dir_all(&out)
        .with_context(|| format!("creating output dir {}", out.display()))?;
    report::write_instance_results(&out.join("sweep_instances.csv"), &outcome.instances)?;
    report::write_sweep_results(&out.join("sweep_results.csv"), &outcome.rows)?;
    if compare_policies {
        report::write_policy_comparison(&out.join("policy_comparison.csv"), &outcome.comparisons)?;
    }

    info!(
        completed = outcome.instances.len(),
        skipped = outcome.skipped,
        "sweep complete"
    );
    Ok(())
}
