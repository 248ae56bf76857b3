//! Trailing-window mean and sample standard deviation

use crate::stats::math;

/// Statistics of the window ending at `index`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingWindow {
    pub index: usize,
    pub mean: f64,
    pub std: f64,
}

/// One entry per full window, in order. Positions `0..window - 1` have no
/// full window and produce nothing; callers must not treat them as zero.
pub fn rolling_mean_std(values: &[f64], window: usize) -> Vec<RollingWindow> {
    if window < 2 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .enumerate()
        .filter_map(|(start, slice)| {
            let mean = math::mean(slice)?;
            let std = math::sample_std(slice)?;
            Some(RollingWindow {
                index: start + window - 1,
                mean,
                std,
            })
        })
        .collect()
}
