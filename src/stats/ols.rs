//! Ordinary least squares via the normal equations

use crate::error::StatsError;

/// Result of an OLS fit with homoskedastic standard errors
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub params: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// t-statistic of coefficient `index`, `None` when its standard error is zero
    pub fn t_value(&self, index: usize) -> Option<f64> {
        let se = *self.std_errors.get(index)?;
        if se > 0.0 && se.is_finite() {
            Some(self.params[index] / se)
        } else {
            None
        }
    }

    /// Gaussian log-likelihood at the fitted parameters
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion, counting every regressor
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.params.len() as f64
    }
}

/// Regress `y` on the given regressor columns (include a column of ones for
/// an intercept). Every column must have `y.len()` entries.
pub fn fit(y: &[f64], columns: &[Vec<f64>], context: &'static str) -> Result<OlsFit, StatsError> {
    let n = y.len();
    let k = columns.len();
    if k == 0 || n <= k {
        return Err(StatsError::InsufficientData {
            required: k + 1,
            actual: n,
        });
    }
    debug_assert!(columns.iter().all(|c| c.len() == n));

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in i..k {
            let s: f64 = columns[i].iter().zip(&columns[j]).map(|(a, b)| a * b).sum();
            xtx[i][j] = s;
            xtx[j][i] = s;
        }
        xty[i] = columns[i].iter().zip(y).map(|(a, b)| a * b).sum();
    }

    let inv = invert(xtx).ok_or(StatsError::SingularMatrix(context))?;

    let params: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();

    let ssr: f64 = (0..n)
        .map(|row| {
            let fitted: f64 = (0..k).map(|i| params[i] * columns[i][row]).sum();
            let resid = y[row] - fitted;
            resid * resid
        })
        .sum();

    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|i| (sigma2 * inv[i][i]).max(0.0).sqrt()).collect();

    Ok(OlsFit {
        params,
        std_errors,
        ssr,
        nobs: n,
    })
}

/// Gauss-Jordan inversion with partial pivoting
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let k = a.len();
    let scale = (0..k).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let tolerance = scale * 1e-13;

    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot_row = (col..k).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot_row][col].abs() <= tolerance {
            return None;
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..k {
            a[col][j] /= pivot;
            inv[col][j] /= pivot;
        }

        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }
    Some(inv)
}
