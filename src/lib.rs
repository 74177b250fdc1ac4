//! Medication cart inventory simulator: a per-day replenishment and expiry
//! engine plus a sensitivity harness over scenarios, demand categories, and
//! hospital sizes.
//!
//! One simulated day always runs consume -> decide-order -> receive ->
//! expire, and every day's units reconcile exactly: on-hand stock changes
//! only by arrivals, consumption, and expiration.

pub mod config;
pub mod error;
pub mod io;
pub mod metrics;
pub mod model;
pub mod simulation;
pub mod strategy;

pub use config::{BaseParams, Category, HospitalSize, OrderingMode, ResolvedParams, ScenarioSet};
pub use error::{ConfigError, DataError};
pub use metrics::InstanceMetrics;
pub use simulation::engine::{derive_seed, DailyRecord, SkuSimulation};
pub use simulation::sweep::{run_sweep, SweepConfig, SweepOutcome};
