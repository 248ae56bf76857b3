//! In-memory market data source for demos and tests

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::MarketDataError;
use crate::models::{Candle, DateRange};
use crate::services::market_data::MarketDataProvider;

/// Serves preloaded series per symbol; individual symbols can be primed to fail
#[derive(Default)]
pub struct StaticMarketDataProvider {
    series: RwLock<HashMap<String, Vec<Candle>>>,
    failures: RwLock<HashMap<String, MarketDataError>>,
}

impl StaticMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.insert_series(symbol, candles);
        self
    }

    pub fn with_failure(self, symbol: &str, error: MarketDataError) -> Self {
        self.failures.write().insert(symbol.to_string(), error);
        self
    }

    pub fn insert_series(&self, symbol: &str, mut candles: Vec<Candle>) {
        candles.sort_by_key(|c| c.timestamp);
        self.series.write().insert(symbol.to_string(), candles);
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketDataProvider {
    async fn get_candles(
        &self,
        symbol: &str,
        range: &DateRange,
        _resolution: u32,
    ) -> Result<Vec<Candle>, MarketDataError> {
        if let Some(error) = self.failures.read().get(symbol) {
            return Err(error.clone());
        }

        let series = self.series.read();
        let candles = series
            .get(symbol)
            .ok_or_else(|| MarketDataError::InvalidSymbol(symbol.to_string()))?;

        Ok(candles
            .iter()
            .filter(|c| {
                let day = c.timestamp.date_naive();
                day >= range.start && day <= range.end
            })
            .cloned()
            .collect())
    }
}
