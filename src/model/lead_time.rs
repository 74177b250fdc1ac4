// src/model/lead_time.rs

use rand::rngs::StdRng;
use rand_distr::{Distribution, LogNormal};

use crate::config::LeadTime;

/// Z-score of the 95th percentile of the standard normal.
const Z_95: f64 = 1.645;

/// Draws one transit time per order. Fixed mode always returns the constant;
/// stochastic mode draws from a log-normal whose 50th/95th percentiles match
/// the configured median/p95, reproducing the long shortage tail.
#[derive(Debug, Clone)]
pub enum LeadTimeSampler {
    Fixed(u32),
    Stochastic(LogNormal<f64>),
}

impl LeadTimeSampler {
    pub fn from_config(lead_time: LeadTime) -> Self {
        match lead_time {
            LeadTime::Fixed { days } => LeadTimeSampler::Fixed(days),
            LeadTime::Stochastic {
                median_days,
                p95_days,
            } => {
                // Median of a log-normal is e^mu; the p95/median ratio pins sigma.
                let mu = median_days.max(f64::MIN_POSITIVE).ln();
                let sigma = (p95_days / median_days).max(1.0).ln() / Z_95;
                // Parameters were validated at config resolution.
                let dist = LogNormal::new(mu, sigma).unwrap_or_else(|_| {
                    LogNormal::new(0.0, 0.0).expect("zero-sigma log-normal is valid")
                });
                LeadTimeSampler::Stochastic(dist)
            }
        }
    }

    /// One nonnegative whole-day transit time for a newly placed order.
    pub fn sample(&self, rng: &mut StdRng) -> u32 {
        match self {
            LeadTimeSampler::Fixed(days) => *days,
            LeadTimeSampler::Stochastic(dist) => {
                let days = dist.sample(rng).round();
                if days.is_finite() && days > 0.0 {
                    days as u32
                } else {
                    0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn fixed_mode_always_returns_the_constant() {
        let sampler = LeadTimeSampler::from_config(LeadTime::Fixed { days: 4 });
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(sampler.sample(&mut rng), 4);
        }
    }

    #[test]
    fn stochastic_mode_matches_configured_percentiles() {
        let sampler = LeadTimeSampler::from_config(LeadTime::Stochastic {
            median_days: 5.0,
            p95_days: 30.0,
        });
        let mut rng = StdRng::seed_from_u64(42);
        let mut draws: Vec<u32> = (0..20_000).map(|_| sampler.sample(&mut rng)).collect();
        draws.sort_unstable();
        let median = draws[draws.len() / 2];
        let p95 = draws[(draws.len() as f64 * 0.95) as usize];
        assert!((4..=6).contains(&median), "median {median}");
        assert!((24..=36).contains(&p95), "p95 {p95}");
    }

    #[test]
    fn same_seed_replays_identically() {
        let sampler = LeadTimeSampler::from_config(LeadTime::Stochastic {
            median_days: 5.0,
            p95_days: 30.0,
        });
        let a: Vec<u32> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..100).map(|_| sampler.sample(&mut rng)).collect()
        };
        let b: Vec<u32> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..100).map(|_| sampler.sample(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }
}
