//! Market data provider interface

use async_trait::async_trait;

use crate::error::MarketDataError;
use crate::models::{Candle, DateRange};

/// Default bar resolution in minutes
pub const DEFAULT_RESOLUTION: u32 = 30;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Historical bars for `symbol` within `range`, oldest first
    async fn get_candles(
        &self,
        symbol: &str,
        range: &DateRange,
        resolution: u32,
    ) -> Result<Vec<Candle>, MarketDataError>;
}
