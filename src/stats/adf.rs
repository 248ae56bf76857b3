//! Augmented Dickey-Fuller unit-root test with a constant term.
//!
//! Lag length is picked by minimum AIC over `0..=maxlag` on a common sample,
//! then the test regression is refit on the longest sample for that lag.
//! p-values use MacKinnon's (1994) approximate response surface for one
//! variable with a constant.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::StatsError;
use crate::stats::ols;

/// Bounds of the MacKinnon surface for the constant-only case
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;

/// Polynomial coefficients (ascending powers) for the lower tail
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];

/// Polynomial coefficients (ascending powers) for the upper tail
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

#[derive(Debug, Clone, PartialEq)]
pub struct AdfResult {
    /// t-value of the lagged level coefficient
    pub statistic: f64,
    pub p_value: f64,
    /// Number of lagged differences in the selected regression
    pub used_lag: usize,
    /// Observations in the final test regression
    pub nobs: usize,
}

/// Run the ADF test on `series`
pub fn adf_test(series: &[f64]) -> Result<AdfResult, StatsError> {
    let n = series.len();
    // constant-only regression needs maxlag = n/2 - 2 >= 0
    if n / 2 < 2 {
        return Err(StatsError::InsufficientData {
            required: 4,
            actual: n,
        });
    }
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let maxlag = schwert.min(n / 2 - 2);

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=maxlag {
        let (y, columns) = design(series, &diffs, maxlag, lag);
        let fit = ols::fit(&y, &columns, "adf lag selection")?;
        if fit.ssr <= 0.0 {
            return Err(StatsError::UndefinedStatistic("adf statistic"));
        }
        let aic = fit.aic();
        match best {
            Some((_, best_aic)) if aic >= best_aic => {}
            _ => best = Some((lag, aic)),
        }
    }
    let used_lag = best.map(|(lag, _)| lag).unwrap_or(0);

    let (y, columns) = design(series, &diffs, used_lag, used_lag);
    let fit = ols::fit(&y, &columns, "adf regression")?;
    let statistic = fit
        .t_value(1)
        .ok_or(StatsError::UndefinedStatistic("adf statistic"))?;

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic)?,
        used_lag,
        nobs: y.len(),
    })
}

/// Build `Δx_t = c + γ·x_t + Σ δ_j·Δx_{t-j}` with rows starting after
/// `sample_lag` lags so candidate regressions share one sample.
fn design(series: &[f64], diffs: &[f64], sample_lag: usize, lag: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let rows = sample_lag..diffs.len();
    let y: Vec<f64> = rows.clone().map(|t| diffs[t]).collect();

    let mut columns = Vec::with_capacity(lag + 2);
    columns.push(vec![1.0; y.len()]);
    columns.push(rows.clone().map(|t| series[t]).collect());
    for j in 1..=lag {
        columns.push(rows.clone().map(|t| diffs[t - j]).collect());
    }
    (y, columns)
}

/// MacKinnon approximate p-value for an ADF statistic (one variable, constant)
pub fn mackinnon_p_value(statistic: f64) -> Result<f64, StatsError> {
    if statistic > TAU_MAX {
        return Ok(1.0);
    }
    if statistic < TAU_MIN {
        return Ok(0.0);
    }
    let value = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    let normal =
        Normal::new(0.0, 1.0).map_err(|_| StatsError::UndefinedStatistic("normal distribution"))?;
    Ok(normal.cdf(value))
}

fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
