//! Deterministic bar series shared by unit and integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pairflow::models::{Candle, DateRange};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

pub fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

/// Calendar range covering the first `n` fixture days
pub fn range_for(n: usize) -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        day(n.saturating_sub(1)).date_naive(),
    )
}

pub fn series_from_closes(closes: &[f64], offset_days: usize) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle::from_close(day(i + offset_days), close))
        .collect()
}

/// `log_1 = 0.5 + 0.8 * log_2 + AR(1) noise` with `log_2` a random walk
pub fn cointegrated_pair(n: usize, seed: u64) -> (Vec<Candle>, Vec<Candle>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut log_2 = 4.0;
    let mut noise = 0.0;
    let mut closes_1 = Vec::with_capacity(n);
    let mut closes_2 = Vec::with_capacity(n);

    for _ in 0..n {
        log_2 += 0.02 * rng.sample::<f64, _>(StandardNormal);
        noise = 0.5 * noise + 0.005 * rng.sample::<f64, _>(StandardNormal);
        closes_1.push((0.5 + 0.8 * log_2 + noise).exp());
        closes_2.push(f64::exp(log_2));
    }

    (
        series_from_closes(&closes_1, 0),
        series_from_closes(&closes_2, 0),
    )
}

pub fn constant_series(n: usize, price: f64) -> Vec<Candle> {
    series_from_closes(&vec![price; n], 0)
}
