// src/config.rs
//
// Scenario configuration: a base parameter document (per-category defaults)
// plus named scenario overrides, resolved once per run into one
// fully-specified parameter set per category.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Demand archetype. Closed set; selected once per simulated SKU instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Stable, high-volume.
    A,
    /// Low-volume, intermittent.
    B,
    /// Weekly weekday/weekend pattern.
    C,
    /// Trending up or down.
    D,
    /// Burst events.
    E,
    /// Code cart: exchange-based, critical.
    F,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::A,
        Category::B,
        Category::C,
        Category::D,
        Category::E,
        Category::F,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Category::A),
            "B" => Ok(Category::B),
            "C" => Ok(Category::C),
            "D" => Ok(Category::D),
            "E" => Ok(Category::E),
            "F" => Ok(Category::F),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// Hospital size tier. Scales demand volume; part of the instance key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HospitalSize {
    Small,
    Medium,
    Large,
}

impl HospitalSize {
    pub const ALL: [HospitalSize; 3] =
        [HospitalSize::Small, HospitalSize::Medium, HospitalSize::Large];
}

impl fmt::Display for HospitalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HospitalSize::Small => write!(f, "small"),
            HospitalSize::Medium => write!(f, "medium"),
            HospitalSize::Large => write!(f, "large"),
        }
    }
}

impl FromStr for HospitalSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(HospitalSize::Small),
            "medium" => Ok(HospitalSize::Medium),
            "large" => Ok(HospitalSize::Large),
            other => Err(format!("unknown hospital size '{other}'")),
        }
    }
}

/// How the ordering policy for an instance is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMode {
    ForecastDriven,
    ParDriven,
    Auto,
}

/// Batch draw-down priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumptionOrder {
    /// Oldest arrival first.
    Fifo,
    /// Earliest expiry first.
    Fefo,
}

/// Lead-time model for one category. Stochastic mode reproduces the long
/// shortage tail (30-90+ day delays) with a log-normal matched at the
/// 50th/95th percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeadTime {
    Fixed { days: u32 },
    Stochastic { median_days: f64, p95_days: f64 },
}

impl LeadTime {
    /// Planning value used by the ordering policy and cadence validation.
    pub fn expected_days(&self) -> u32 {
        match *self {
            LeadTime::Fixed { days } => days,
            LeadTime::Stochastic { median_days, .. } => median_days.round().max(0.0) as u32,
        }
    }
}

/// One category's parameter block in the base document. Every field has a
/// category default, so a partial document still resolves fully.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryParams {
    pub shelf_life_days: u32,
    /// Days subtracted from labeled expiry for conservative pull-by dating.
    pub pull_buffer_days: u32,
    pub lead_time: LeadTime,
    pub order_cadence_days: u32,
    pub service_level: f64,
    /// Category tuning factor applied to forecast-driven order quantities.
    pub order_multiplier: f64,
    pub moq_units: u32,
    pub spq_units: u32,
    pub ordering_mode: OrderingMode,
    /// Days of coverage for par-driven replenishment, when applicable.
    pub par_level_days: Option<u32>,
    pub consumption_order: ConsumptionOrder,
    pub critical: bool,
}

impl Default for CategoryParams {
    fn default() -> Self {
        Self {
            shelf_life_days: 365,
            pull_buffer_days: 0,
            lead_time: LeadTime::Fixed { days: 5 },
            order_cadence_days: 7,
            service_level: 0.98,
            order_multiplier: 1.0,
            moq_units: 100,
            spq_units: 25,
            ordering_mode: OrderingMode::ForecastDriven,
            par_level_days: None,
            consumption_order: ConsumptionOrder::Fifo,
            critical: false,
        }
    }
}

/// Base parameter document: one block per category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseParams {
    pub categories: BTreeMap<Category, CategoryParams>,
}

impl Default for BaseParams {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            Category::A,
            CategoryParams {
                shelf_life_days: 365,
                lead_time: LeadTime::Fixed { days: 3 },
                ..CategoryParams::default()
            },
        );
        categories.insert(
            Category::B,
            CategoryParams {
                shelf_life_days: 270,
                lead_time: LeadTime::Fixed { days: 4 },
                order_multiplier: 0.8,
                moq_units: 50,
                spq_units: 10,
                ordering_mode: OrderingMode::Auto,
                ..CategoryParams::default()
            },
        );
        categories.insert(
            Category::C,
            CategoryParams {
                shelf_life_days: 365,
                lead_time: LeadTime::Fixed { days: 3 },
                ..CategoryParams::default()
            },
        );
        categories.insert(
            Category::D,
            CategoryParams {
                shelf_life_days: 365,
                lead_time: LeadTime::Fixed { days: 4 },
                ..CategoryParams::default()
            },
        );
        categories.insert(
            Category::E,
            CategoryParams {
                shelf_life_days: 240,
                lead_time: LeadTime::Fixed { days: 5 },
                service_level: 0.995,
                order_multiplier: 1.2,
                critical: true,
                ..CategoryParams::default()
            },
        );
        categories.insert(
            Category::F,
            CategoryParams {
                shelf_life_days: 365,
                pull_buffer_days: 30,
                lead_time: LeadTime::Fixed { days: 7 },
                order_cadence_days: 30,
                service_level: 0.995,
                moq_units: 10,
                spq_units: 5,
                ordering_mode: OrderingMode::Auto,
                par_level_days: Some(30),
                consumption_order: ConsumptionOrder::Fefo,
                critical: true,
                ..CategoryParams::default()
            },
        );
        Self { categories }
    }
}

/// A scenario override: any subset of the base keys, applied either to all
/// categories or to one category via the `categories` sub-table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioOverride {
    pub shelf_life_days: Option<u32>,
    pub pull_buffer_days: Option<u32>,
    pub lead_time: Option<LeadTime>,
    pub order_cadence_days: Option<u32>,
    pub service_level: Option<f64>,
    pub order_multiplier: Option<f64>,
    pub moq_units: Option<u32>,
    pub spq_units: Option<u32>,
    pub ordering_mode: Option<OrderingMode>,
    pub par_level_days: Option<u32>,
    pub consumption_order: Option<ConsumptionOrder>,
    pub critical: Option<bool>,
    /// Per-category overrides; take precedence over the scenario-wide keys.
    pub categories: BTreeMap<Category, Box<ScenarioOverride>>,
}

impl ScenarioOverride {
    fn apply(&self, params: &mut CategoryParams) {
        if let Some(v) = self.shelf_life_days {
            params.shelf_life_days = v;
        }
        if let Some(v) = self.pull_buffer_days {
            params.pull_buffer_days = v;
        }
        if let Some(v) = self.lead_time {
            params.lead_time = v;
        }
        if let Some(v) = self.order_cadence_days {
            params.order_cadence_days = v;
        }
        if let Some(v) = self.service_level {
            params.service_level = v;
        }
        if let Some(v) = self.order_multiplier {
            params.order_multiplier = v;
        }
        if let Some(v) = self.moq_units {
            params.moq_units = v;
        }
        if let Some(v) = self.spq_units {
            params.spq_units = v;
        }
        if let Some(v) = self.ordering_mode {
            params.ordering_mode = v;
        }
        if let Some(v) = self.par_level_days {
            params.par_level_days = Some(v);
        }
        if let Some(v) = self.consumption_order {
            params.consumption_order = v;
        }
        if let Some(v) = self.critical {
            params.critical = v;
        }
    }
}

/// Scenario document: named overrides layered onto the base parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub scenarios: BTreeMap<String, ScenarioOverride>,
}

impl Default for ScenarioSet {
    fn default() -> Self {
        let mut scenarios = BTreeMap::new();
        scenarios.insert("baseline".to_owned(), ScenarioOverride::default());
        scenarios.insert(
            "S1".to_owned(),
            ScenarioOverride {
                shelf_life_days: Some(240),
                ..ScenarioOverride::default()
            },
        );
        scenarios.insert(
            "S2".to_owned(),
            ScenarioOverride {
                shelf_life_days: Some(730),
                ..ScenarioOverride::default()
            },
        );
        scenarios.insert(
            "S3".to_owned(),
            ScenarioOverride {
                lead_time: Some(LeadTime::Stochastic {
                    median_days: 5.0,
                    p95_days: 30.0,
                }),
                ..ScenarioOverride::default()
            },
        );
        scenarios.insert(
            "S4".to_owned(),
            ScenarioOverride {
                order_cadence_days: Some(14),
                ..ScenarioOverride::default()
            },
        );
        scenarios.insert(
            "S5".to_owned(),
            ScenarioOverride {
                service_level: Some(0.995),
                ..ScenarioOverride::default()
            },
        );
        scenarios.insert(
            "S6".to_owned(),
            ScenarioOverride {
                moq_units: Some(400),
                spq_units: Some(50),
                ..ScenarioOverride::default()
            },
        );
        scenarios.insert(
            "S7".to_owned(),
            ScenarioOverride {
                ordering_mode: Some(OrderingMode::ParDriven),
                par_level_days: Some(30),
                order_cadence_days: Some(30),
                ..ScenarioOverride::default()
            },
        );
        scenarios.insert(
            "S8".to_owned(),
            ScenarioOverride {
                ordering_mode: Some(OrderingMode::Auto),
                ..ScenarioOverride::default()
            },
        );
        scenarios.insert(
            "S9".to_owned(),
            ScenarioOverride {
                shelf_life_days: Some(240),
                consumption_order: Some(ConsumptionOrder::Fefo),
                ..ScenarioOverride::default()
            },
        );
        // Code-cart deployment: par-driven with conservative pull dating.
        let mut s14 = ScenarioOverride {
            ordering_mode: Some(OrderingMode::Auto),
            ..ScenarioOverride::default()
        };
        s14.categories.insert(
            Category::F,
            Box::new(ScenarioOverride {
                ordering_mode: Some(OrderingMode::ParDriven),
                par_level_days: Some(45),
                order_cadence_days: Some(30),
                pull_buffer_days: Some(60),
                ..ScenarioOverride::default()
            }),
        );
        scenarios.insert("S14".to_owned(), s14);
        Self { scenarios }
    }
}

/// Fully-specified parameter set for one (category, scenario) pair.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedParams {
    pub scenario_id: String,
    pub category: Category,
    pub shelf_life_days: u32,
    pub pull_buffer_days: u32,
    pub lead_time: LeadTime,
    pub order_cadence_days: u32,
    pub service_level: f64,
    pub order_multiplier: f64,
    pub moq_units: u32,
    pub spq_units: u32,
    pub ordering_mode: OrderingMode,
    pub par_level_days: Option<u32>,
    pub consumption_order: ConsumptionOrder,
    pub critical: bool,
}

impl ResolvedParams {
    /// Labeled shelf life minus the pull buffer, floored at one day.
    pub fn effective_shelf_life_days(&self) -> u32 {
        self.shelf_life_days.saturating_sub(self.pull_buffer_days).max(1)
    }

    pub fn exchange_based(&self) -> bool {
        self.par_level_days.is_some() && self.order_cadence_days >= 14
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let category = self.category.to_string();
        if self.shelf_life_days == 0 {
            return Err(ConfigError::InvalidShelfLife {
                category,
                days: i64::from(self.shelf_life_days),
            });
        }
        if self.pull_buffer_days >= self.shelf_life_days {
            return Err(ConfigError::PullBufferTooLarge {
                category,
                buffer: self.pull_buffer_days,
                shelf_life: self.shelf_life_days,
            });
        }
        if !(self.service_level > 0.5 && self.service_level < 1.0) {
            return Err(ConfigError::InvalidServiceLevel {
                category,
                level: self.service_level,
            });
        }
        if let LeadTime::Stochastic {
            median_days,
            p95_days,
        } = self.lead_time
        {
            if !(median_days > 0.0 && p95_days >= median_days) {
                return Err(ConfigError::InvalidLeadTimeDistribution {
                    category,
                    median: median_days,
                    p95: p95_days,
                });
            }
        }
        if let Some(par_days) = self.par_level_days {
            if !(14..=90).contains(&par_days) {
                return Err(ConfigError::ParLevelOutOfBand {
                    category,
                    days: par_days,
                });
            }
            let lead = self.lead_time.expected_days();
            if self.order_cadence_days < lead + 7 {
                return Err(ConfigError::CadenceTooShort {
                    category,
                    cadence: self.order_cadence_days,
                    lead_time: lead,
                });
            }
        }
        Ok(())
    }
}

/// Resolve a named scenario against the base document into one validated
/// parameter set per category. Pure: no side effects, deterministic.
pub fn resolve(
    base: &BaseParams,
    scenarios: &ScenarioSet,
    scenario_id: &str,
) -> Result<BTreeMap<Category, ResolvedParams>, ConfigError> {
    let overrides = scenarios
        .scenarios
        .get(scenario_id)
        .ok_or_else(|| ConfigError::UnknownScenario(scenario_id.to_owned()))?;

    let mut resolved = BTreeMap::new();
    for &category in &Category::ALL {
        let mut params = base
            .categories
            .get(&category)
            .cloned()
            .unwrap_or_default();
        overrides.apply(&mut params);
        if let Some(per_cat) = overrides.categories.get(&category) {
            per_cat.apply(&mut params);
        }
        let full = ResolvedParams {
            scenario_id: scenario_id.to_owned(),
            category,
            shelf_life_days: params.shelf_life_days,
            pull_buffer_days: params.pull_buffer_days,
            lead_time: params.lead_time,
            order_cadence_days: params.order_cadence_days,
            service_level: params.service_level,
            order_multiplier: params.order_multiplier,
            moq_units: params.moq_units,
            spq_units: params.spq_units,
            ordering_mode: params.ordering_mode,
            par_level_days: params.par_level_days,
            consumption_order: params.consumption_order,
            critical: params.critical,
        };
        full.validate()?;
        resolved.insert(category, full);
    }
    Ok(resolved)
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

impl BaseParams {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_toml(path)
    }
}

impl ScenarioSet {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_toml(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scenario_is_a_config_error() {
        let err = resolve(&BaseParams::default(), &ScenarioSet::default(), "S99")
            .expect_err("S99 is not defined");
        assert!(matches!(err, ConfigError::UnknownScenario(id) if id == "S99"));
    }

    #[test]
    fn baseline_resolves_every_category() {
        let resolved =
            resolve(&BaseParams::default(), &ScenarioSet::default(), "baseline").unwrap();
        assert_eq!(resolved.len(), Category::ALL.len());
        assert_eq!(resolved[&Category::E].service_level, 0.995);
        assert!(resolved[&Category::F].exchange_based());
    }

    #[test]
    fn scenario_override_layers_onto_defaults() {
        let resolved = resolve(&BaseParams::default(), &ScenarioSet::default(), "S1").unwrap();
        for params in resolved.values() {
            assert_eq!(params.shelf_life_days, 240);
        }
        // Untouched keys keep their category defaults.
        assert_eq!(resolved[&Category::B].moq_units, 50);
    }

    #[test]
    fn per_category_override_beats_scenario_wide() {
        let resolved = resolve(&BaseParams::default(), &ScenarioSet::default(), "S14").unwrap();
        assert_eq!(resolved[&Category::F].ordering_mode, OrderingMode::ParDriven);
        assert_eq!(resolved[&Category::F].par_level_days, Some(45));
        assert_eq!(resolved[&Category::F].pull_buffer_days, 60);
        assert_eq!(resolved[&Category::A].ordering_mode, OrderingMode::Auto);
    }

    #[test]
    fn missing_category_block_falls_back_to_defaults() {
        let base = BaseParams {
            categories: BTreeMap::new(),
        };
        let resolved = resolve(&base, &ScenarioSet::default(), "baseline").unwrap();
        assert_eq!(resolved[&Category::A].order_cadence_days, 7);
    }

    #[test]
    fn par_level_outside_band_is_rejected() {
        let mut scenarios = ScenarioSet::default();
        scenarios.scenarios.insert(
            "bad".to_owned(),
            ScenarioOverride {
                ordering_mode: Some(OrderingMode::ParDriven),
                par_level_days: Some(120),
                order_cadence_days: Some(30),
                ..ScenarioOverride::default()
            },
        );
        let err = resolve(&BaseParams::default(), &scenarios, "bad").unwrap_err();
        assert!(matches!(err, ConfigError::ParLevelOutOfBand { days: 120, .. }));
    }

    #[test]
    fn exchange_cadence_must_cover_lead_time_plus_week() {
        let mut scenarios = ScenarioSet::default();
        scenarios.scenarios.insert(
            "bad".to_owned(),
            ScenarioOverride {
                ordering_mode: Some(OrderingMode::ParDriven),
                par_level_days: Some(30),
                order_cadence_days: Some(8),
                lead_time: Some(LeadTime::Fixed { days: 5 }),
                ..ScenarioOverride::default()
            },
        );
        let err = resolve(&BaseParams::default(), &scenarios, "bad").unwrap_err();
        assert!(matches!(err, ConfigError::CadenceTooShort { cadence: 8, .. }));
    }

    #[test]
    fn effective_shelf_life_subtracts_pull_buffer() {
        let resolved =
            resolve(&BaseParams::default(), &ScenarioSet::default(), "baseline").unwrap();
        let f = &resolved[&Category::F];
        assert_eq!(
            f.effective_shelf_life_days(),
            f.shelf_life_days - f.pull_buffer_days
        );
    }

    #[test]
    fn documents_round_trip_through_toml() {
        let base = BaseParams::default();
        let text = toml::to_string(&base).unwrap();
        let back: BaseParams = toml::from_str(&text).unwrap();
        assert_eq!(
            back.categories[&Category::F].par_level_days,
            base.categories[&Category::F].par_level_days
        );
    }
}
