//! Pair metrics document published after a successful aggregate job

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered symbol pair; `(A, B)` and `(B, A)` are different keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub symbol_1: String,
    pub symbol_2: String,
}

impl PairKey {
    pub fn new(symbol_1: impl Into<String>, symbol_2: impl Into<String>) -> Self {
        Self {
            symbol_1: symbol_1.into(),
            symbol_2: symbol_2.into(),
        }
    }

    /// File-name friendly form: `pairs_<s1>_<s2>_metrics`. Each symbol is
    /// percent-encoded, `_` included, so distinct keys never share a stem.
    pub fn file_stem(&self) -> String {
        format!(
            "pairs_{}_{}_metrics",
            encode_symbol(&self.symbol_1),
            encode_symbol(&self.symbol_2)
        )
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.symbol_1, self.symbol_2)
    }
}

fn encode_symbol(symbol: &str) -> String {
    let mut out = String::with_capacity(symbol.len());
    for byte in symbol.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' => out.push(byte as char),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

/// Trading action derived from the latest spread z-score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSignal {
    /// Spread rich: sell symbol_1, buy symbol_2
    #[serde(rename = "sell_symbol_1_buy_symbol_2")]
    SellFirstBuySecond,
    /// Spread cheap: buy symbol_1, sell symbol_2
    #[serde(rename = "buy_symbol_1_sell_symbol_2")]
    BuyFirstSellSecond,
    #[serde(rename = "hold")]
    Hold,
}

impl TradeSignal {
    /// Human-readable instruction naming the actual symbols
    pub fn describe(&self, pair: &PairKey) -> String {
        match self {
            TradeSignal::SellFirstBuySecond => {
                format!("SELL {}, BUY {}", pair.symbol_1, pair.symbol_2)
            }
            TradeSignal::BuyFirstSellSecond => {
                format!("BUY {}, SELL {}", pair.symbol_1, pair.symbol_2)
            }
            TradeSignal::Hold => "HOLD".to_string(),
        }
    }
}

/// Hedge-ratio weighted notional split of the requested capital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegAllocation {
    pub capital: f64,
    pub notional_1: f64,
    pub notional_2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSummary {
    pub symbol_1: String,
    pub symbol_2: String,
    /// Pearson correlation of log returns
    pub correlation: f64,
    /// `1 - ADF p-value` of the regression residuals. A directional score in
    /// [0, 1] where higher means more cointegrated; not a probability.
    pub cointegration: f64,
    pub hedge_ratio: f64,
    pub latest_z_score: f64,
    pub signal: TradeSignal,
    /// `signal` spelled out with the actual symbols, e.g. `SELL AAA, BUY BBB`
    #[serde(default)]
    pub signal_text: String,
    /// Number of timestamp-aligned observations
    pub observations: usize,
    pub window: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<LegAllocation>,
}

impl PairSummary {
    pub fn key(&self) -> PairKey {
        PairKey::new(self.symbol_1.clone(), self.symbol_2.clone())
    }
}

/// One post-warm-up row of the rolling spread series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingPoint {
    pub timestamp: DateTime<Utc>,
    pub spread: f64,
    pub spread_mean: f64,
    pub spread_std: f64,
    pub z_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairMetricsDocument {
    pub summary: PairSummary,
    pub rolling: Vec<RollingPoint>,
}

impl PairMetricsDocument {
    pub fn key(&self) -> PairKey {
        self.summary.key()
    }
}
