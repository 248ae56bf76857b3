//! Threshold policy mapping the latest z-score to a pair trade

use serde::{Deserialize, Serialize};

use crate::models::{LegAllocation, TradeSignal};

/// Entry bounds on the spread z-score. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub upper: f64,
    pub lower: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            upper: 2.0,
            lower: -2.0,
        }
    }
}

impl SignalThresholds {
    /// `±|z|`
    pub fn symmetric(z: f64) -> Self {
        Self {
            upper: z.abs(),
            lower: -z.abs(),
        }
    }
}

/// `z > upper` sells the spread, `z < lower` buys it, anything else holds
pub fn derive_signal(z: f64, thresholds: &SignalThresholds) -> TradeSignal {
    if z > thresholds.upper {
        TradeSignal::SellFirstBuySecond
    } else if z < thresholds.lower {
        TradeSignal::BuyFirstSellSecond
    } else {
        TradeSignal::Hold
    }
}

/// Split `capital` so that leg 2 carries `|hedge_ratio|` units of notional
/// per unit of leg 1
pub fn allocate_capital(capital: f64, hedge_ratio: f64) -> LegAllocation {
    let weight = hedge_ratio.abs();
    let notional_1 = capital / (1.0 + weight);
    LegAllocation {
        capital,
        notional_1,
        notional_2: capital - notional_1,
    }
}
