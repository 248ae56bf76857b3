//! Pair metrics computation over two bar series

use tracing::debug;

use crate::error::StatsError;
use crate::models::{
    Candle, LegAllocation, PairKey, PairMetricsDocument, PairSummary, RollingPoint,
};
use crate::signals::{allocate_capital, derive_signal, SignalThresholds};
use crate::stats::adf::adf_test;
use crate::stats::align::align_series;
use crate::stats::math::{self, round_to};
use crate::stats::rolling::rolling_mean_std;

pub const DEFAULT_WINDOW: usize = 30;

/// Presentation precision of summary scalars
pub const SUMMARY_DECIMALS: u32 = 3;

/// Presentation precision of rolling rows
pub const ROLLING_DECIMALS: u32 = 6;

/// Relative floor below which a standard deviation counts as zero
const ZERO_STD_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub window: usize,
    pub thresholds: SignalThresholds,
    pub capital: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            thresholds: SignalThresholds::default(),
            capital: None,
        }
    }
}

/// Compute the full metrics document for `pair` from both legs' bars.
///
/// Steps: inner-join on timestamp, log prices and returns, return
/// correlation, OLS hedge ratio of `log_1` on `log_2`, ADF on the regression
/// residuals, rolling spread z-score, threshold signal. Rounding is applied
/// only when building the document.
pub fn compute_metrics(
    pair: &PairKey,
    series_1: &[Candle],
    series_2: &[Candle],
    config: &AnalysisConfig,
) -> Result<PairMetricsDocument, StatsError> {
    if config.window < 2 {
        return Err(StatsError::InvalidWindow(config.window));
    }

    let aligned = align_series(series_1, series_2);
    if aligned.is_empty() {
        return Err(StatsError::NoOverlap {
            symbol_1: pair.symbol_1.clone(),
            symbol_2: pair.symbol_2.clone(),
        });
    }
    let n = aligned.len();

    let log_1 = log_prices(&aligned.close_1)?;
    let log_2 = log_prices(&aligned.close_2)?;

    let correlation = math::pearson(&math::diff(&log_1), &math::diff(&log_2));

    let (intercept, hedge_ratio) = hedge_regression(&log_1, &log_2, &pair.symbol_2)?;
    let correlation = correlation.ok_or(StatsError::UndefinedStatistic("return correlation"))?;

    let residuals: Vec<f64> = log_1
        .iter()
        .zip(&log_2)
        .map(|(y, x)| y - intercept - hedge_ratio * x)
        .collect();
    let adf = adf_test(&residuals)?;
    let cointegration = 1.0 - adf.p_value;

    let spread: Vec<f64> = log_1
        .iter()
        .zip(&log_2)
        .map(|(y, x)| y - hedge_ratio * x)
        .collect();

    if n < config.window {
        return Err(StatsError::InsufficientData {
            required: config.window,
            actual: n,
        });
    }

    let mut rolling = Vec::with_capacity(n + 1 - config.window);
    let mut latest_z = None;
    for w in rolling_mean_std(&spread, config.window) {
        let floor = ZERO_STD_TOLERANCE * w.mean.abs().max(1.0);
        if !(w.std > floor) {
            continue;
        }
        let z = (spread[w.index] - w.mean) / w.std;
        if !z.is_finite() {
            continue;
        }
        latest_z = Some(z);
        rolling.push(RollingPoint {
            timestamp: aligned.timestamps[w.index],
            spread: round_to(spread[w.index], ROLLING_DECIMALS),
            spread_mean: round_to(w.mean, ROLLING_DECIMALS),
            spread_std: round_to(w.std, ROLLING_DECIMALS),
            z_score: round_to(z, ROLLING_DECIMALS),
        });
    }
    let latest_z = latest_z.ok_or(StatsError::UndefinedStatistic("latest z-score"))?;
    let signal = derive_signal(latest_z, &config.thresholds);

    debug!(
        pair = %pair,
        observations = n,
        hedge_ratio,
        adf_statistic = adf.statistic,
        adf_lag = adf.used_lag,
        latest_z,
        "StatsEngine: computed metrics for {}",
        pair
    );

    let allocation = config.capital.map(|capital| {
        let alloc = allocate_capital(capital, hedge_ratio);
        LegAllocation {
            capital: alloc.capital,
            notional_1: round_to(alloc.notional_1, SUMMARY_DECIMALS),
            notional_2: round_to(alloc.notional_2, SUMMARY_DECIMALS),
        }
    });

    Ok(PairMetricsDocument {
        summary: PairSummary {
            symbol_1: pair.symbol_1.clone(),
            symbol_2: pair.symbol_2.clone(),
            correlation: round_to(correlation, SUMMARY_DECIMALS),
            cointegration: round_to(cointegration, SUMMARY_DECIMALS),
            hedge_ratio: round_to(hedge_ratio, SUMMARY_DECIMALS),
            latest_z_score: round_to(latest_z, SUMMARY_DECIMALS),
            signal,
            signal_text: signal.describe(pair),
            observations: n,
            window: config.window,
            allocation,
        },
        rolling,
    })
}

fn log_prices(closes: &[f64]) -> Result<Vec<f64>, StatsError> {
    closes
        .iter()
        .enumerate()
        .map(|(index, &price)| {
            if price > 0.0 && price.is_finite() {
                Ok(price.ln())
            } else {
                Err(StatsError::NonPositivePrice { index, price })
            }
        })
        .collect()
}

/// OLS of `y` on a constant and `x`; returns `(intercept, slope)`
fn hedge_regression(y: &[f64], x: &[f64], regressor: &str) -> Result<(f64, f64), StatsError> {
    let n = x.len() as f64;
    let mean_x = math::mean(x).ok_or(StatsError::InsufficientData {
        required: 2,
        actual: 0,
    })?;
    let mean_y = math::mean(y).ok_or(StatsError::InsufficientData {
        required: 2,
        actual: 0,
    })?;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        sxx += dx * dx;
        sxy += dx * (yi - mean_y);
    }

    let floor = n * (ZERO_STD_TOLERANCE * mean_x.abs().max(1.0)).powi(2);
    if !(sxx > floor) {
        return Err(StatsError::DegenerateRegression(format!(
            "log price of {} has zero variance",
            regressor
        )));
    }

    let slope = sxy / sxx;
    Ok((mean_y - slope * mean_x, slope))
}
