// src/io/demand.rs
//
// Daily demand archetypes per SKU category. Each generator draws its shape
// parameters once per instance from the seeded RNG, then produces one usage
// value per calendar day.

use chrono::{Datelike, Days, NaiveDate};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::{Category, HospitalSize};

/// Generates the full daily usage series for one instance.
pub fn generate_demand(
    category: Category,
    size: HospitalSize,
    start_date: NaiveDate,
    days: usize,
    rng: &mut StdRng,
) -> Vec<u32> {
    match category {
        Category::A => stable_high_volume(size, start_date, days, rng),
        Category::B => low_volume_intermittent(size, days, rng),
        Category::C => weekly_pattern(size, start_date, days, rng),
        Category::D => trending(size, start_date, days, rng),
        Category::E => burst_events(size, days, rng),
        Category::F => code_cart(size, days, rng),
    }
}

fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let std_dev = std_dev.abs().max(1e-9);
    Normal::new(mean, std_dev)
        .expect("finite normal parameters")
        .sample(rng)
}

fn units(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

fn day_of_year(start: NaiveDate, offset: usize) -> f64 {
    f64::from((start + Days::new(offset as u64)).ordinal())
}

/// A: consistent daily usage with a small yearly seasonal swing.
fn stable_high_volume(
    size: HospitalSize,
    start: NaiveDate,
    days: usize,
    rng: &mut StdRng,
) -> Vec<u32> {
    let base = match size {
        HospitalSize::Small => 20.0,
        HospitalSize::Medium => 50.0,
        HospitalSize::Large => 120.0,
    };
    let season_amp = 0.1 + 0.1 * rng.gen::<f64>();
    let phase = rng.gen::<f64>();

    (0..days)
        .map(|i| {
            let seasonal = 1.0
                + season_amp
                    * (2.0 * std::f64::consts::PI * (day_of_year(start, i) / 365.25 + phase))
                        .sin();
            let lambda = (base * seasonal * (1.0 + 0.05 * gauss(rng, 0.0, 1.0))).max(0.0);
            units(gauss(rng, lambda, lambda * 0.15))
        })
        .collect()
}

/// B: many zero days; small quantities when usage occurs.
fn low_volume_intermittent(size: HospitalSize, days: usize, rng: &mut StdRng) -> Vec<u32> {
    let base = match size {
        HospitalSize::Small => 1.5,
        HospitalSize::Medium => 3.0,
        HospitalSize::Large => 6.0,
    };
    let zero_prob = 0.3 + 0.3 * rng.gen::<f64>();

    (0..days)
        .map(|_| {
            if rng.gen::<f64>() < zero_prob {
                0
            } else {
                let lambda = base * (0.8 + 0.4 * rng.gen::<f64>());
                units(gauss(rng, lambda, lambda * 0.5))
            }
        })
        .collect()
}

/// C: weekday high, weekend low.
fn weekly_pattern(size: HospitalSize, start: NaiveDate, days: usize, rng: &mut StdRng) -> Vec<u32> {
    let base = match size {
        HospitalSize::Small => 15.0,
        HospitalSize::Medium => 35.0,
        HospitalSize::Large => 80.0,
    };
    let weekday_mult = 1.3 + 0.4 * rng.gen::<f64>();
    let weekend_mult = 0.5 + 0.2 * rng.gen::<f64>();

    (0..days)
        .map(|i| {
            let date = start + Days::new(i as u64);
            let is_weekend = date.weekday().number_from_monday() >= 6;
            let mult = if is_weekend { weekend_mult } else { weekday_mult };
            let lambda = base * mult * (0.9 + 0.2 * rng.gen::<f64>());
            units(gauss(rng, lambda, lambda * 0.2))
        })
        .collect()
}

#[derive(Clone, Copy)]
enum Trend {
    LinearUp,
    LinearDown,
    StepUp,
    StepDown,
}

/// D: linear or step trend, up or down, plus mild seasonality.
fn trending(size: HospitalSize, start: NaiveDate, days: usize, rng: &mut StdRng) -> Vec<u32> {
    let base = match size {
        HospitalSize::Small => 25.0,
        HospitalSize::Medium => 60.0,
        HospitalSize::Large => 140.0,
    };
    let trend = match rng.gen_range(0..4u8) {
        0 => Trend::LinearUp,
        1 => Trend::LinearDown,
        2 => Trend::StepUp,
        _ => Trend::StepDown,
    };
    let trend_rate = 0.0005 + 0.001 * rng.gen::<f64>();
    let step_day = if days > 400 {
        rng.gen_range(200..days - 200)
    } else {
        days / 2
    };
    let step_mult = 1.3 + 0.4 * rng.gen::<f64>();

    (0..days)
        .map(|i| {
            let mut level = base;
            match trend {
                Trend::LinearUp => level *= 1.0 + trend_rate * i as f64,
                Trend::LinearDown => level *= (1.0 - trend_rate * i as f64).max(0.05),
                Trend::StepUp => {
                    if i >= step_day {
                        level *= step_mult;
                    }
                }
                Trend::StepDown => {
                    if i >= step_day {
                        level /= step_mult;
                    }
                }
            }
            let seasonal =
                1.0 + 0.1 * (2.0 * std::f64::consts::PI * day_of_year(start, i) / 365.25).sin();
            let lambda = (level * seasonal * (0.95 + 0.1 * rng.gen::<f64>())).max(0.0);
            units(gauss(rng, lambda, lambda * 0.18))
        })
        .collect()
}

/// E: mostly normal usage with rare 1-3 day spike episodes.
fn burst_events(size: HospitalSize, days: usize, rng: &mut StdRng) -> Vec<u32> {
    let base = match size {
        HospitalSize::Small => 18.0,
        HospitalSize::Medium => 45.0,
        HospitalSize::Large => 100.0,
    };
    let burst_prob = 0.01 + 0.03 * rng.gen::<f64>();
    let burst_mult = 2.5 + 1.5 * rng.gen::<f64>();

    let mut burst_remaining = 0u32;
    (0..days)
        .map(|_| {
            if burst_remaining == 0 && rng.gen::<f64>() < burst_prob {
                burst_remaining = rng.gen_range(1..=3);
            }
            let mult = if burst_remaining > 0 {
                burst_remaining -= 1;
                burst_mult
            } else {
                1.0
            };
            let lambda = base * mult * (0.9 + 0.2 * rng.gen::<f64>());
            units(gauss(rng, lambda, lambda * 0.25))
        })
        .collect()
}

/// F: code-cart usage; very low, highly intermittent single-digit draws.
fn code_cart(size: HospitalSize, days: usize, rng: &mut StdRng) -> Vec<u32> {
    let base = match size {
        HospitalSize::Small => 0.8,
        HospitalSize::Medium => 1.5,
        HospitalSize::Large => 3.0,
    };
    let zero_prob = 0.75 + 0.15 * rng.gen::<f64>();

    (0..days)
        .map(|_| {
            if rng.gen::<f64>() < zero_prob {
                0
            } else {
                let lambda = base * (0.6 + 0.8 * rng.gen::<f64>());
                units(gauss(rng, lambda, lambda * 0.6)).max(1)
            }
        })
        .collect()
}
