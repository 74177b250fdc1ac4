// src/error.rs

use thiserror::Error;

/// Fatal configuration problems, surfaced before any simulation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown scenario id '{0}'")]
    UnknownScenario(String),

    #[error("category {category}: par level {days} days outside the sane 14-90 day band")]
    ParLevelOutOfBand { category: String, days: u32 },

    #[error(
        "category {category}: exchange cadence {cadence} days shorter than lead time {lead_time} + 7"
    )]
    CadenceTooShort {
        category: String,
        cadence: u32,
        lead_time: u32,
    },

    #[error("category {category}: shelf life must be positive, got {days}")]
    InvalidShelfLife { category: String, days: i64 },

    #[error("category {category}: pull buffer {buffer} days consumes the whole {shelf_life}-day shelf life")]
    PullBufferTooLarge {
        category: String,
        buffer: u32,
        shelf_life: u32,
    },

    #[error("category {category}: service level {level} outside (0.5, 1.0)")]
    InvalidServiceLevel { category: String, level: f64 },

    #[error("category {category}: stochastic lead time needs p95 >= median (median {median}, p95 {p95})")]
    InvalidLeadTimeDistribution {
        category: String,
        median: f64,
        p95: f64,
    },

    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Per-instance data problems. Fatal for the instance, never for a sweep.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("demand series for {instance} is empty")]
    EmptyDemand { instance: String },

    #[error("demand series for {instance} is all zero over {days} days")]
    DegenerateDemand { instance: String, days: usize },
}
