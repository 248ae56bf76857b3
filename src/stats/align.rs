//! Inner join of two bar series on exact timestamp

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::Candle;

/// Close prices of both legs on their shared, ascending time axis
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub close_1: Vec<f64>,
    pub close_2: Vec<f64>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Keep only timestamps present in both series. A timestamp repeated within
/// one series keeps its first bar.
pub fn align_series(series_1: &[Candle], series_2: &[Candle]) -> AlignedSeries {
    let mut by_time: HashMap<DateTime<Utc>, f64> = HashMap::with_capacity(series_2.len());
    for candle in series_2 {
        by_time.entry(candle.timestamp).or_insert(candle.close);
    }

    let mut rows: Vec<(DateTime<Utc>, f64, f64)> = Vec::with_capacity(series_1.len());
    for candle in series_1 {
        if let Some(close_2) = by_time.remove(&candle.timestamp) {
            rows.push((candle.timestamp, candle.close, close_2));
        }
    }
    rows.sort_by_key(|(ts, _, _)| *ts);

    let mut aligned = AlignedSeries {
        timestamps: Vec::with_capacity(rows.len()),
        close_1: Vec::with_capacity(rows.len()),
        close_2: Vec::with_capacity(rows.len()),
    };
    for (ts, c1, c2) in rows {
        aligned.timestamps.push(ts);
        aligned.close_1.push(c1);
        aligned.close_2.push(c2);
    }
    aligned
}
