use pairflow::models::{Candle, PairKey, PairMetricsDocument, TradeSignal};
use pairflow::signals::SignalThresholds;
use pairflow::stats::{compute_metrics, AnalysisConfig};
use pairflow::StatsError;

use crate::fixtures::{constant_series, cointegrated_pair, series_from_closes};

fn pair() -> PairKey {
    PairKey::new("AAA", "BBB")
}

#[test]
fn rolling_series_drops_warm_up_rows() {
    let (s1, s2) = cointegrated_pair(100, 7);
    let doc = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default()).unwrap();

    assert_eq!(doc.summary.observations, 100);
    assert_eq!(doc.rolling.len(), 71);
    assert_eq!(doc.rolling[0].timestamp, s1[29].timestamp);
    assert_eq!(doc.rolling.last().unwrap().timestamp, s1[99].timestamp);
}

#[test]
fn rolling_rows_are_finite_with_positive_std() {
    let (s1, s2) = cointegrated_pair(120, 11);
    let doc = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default()).unwrap();

    for row in &doc.rolling {
        assert!(row.spread.is_finite());
        assert!(row.spread_mean.is_finite());
        assert!(row.spread_std > 0.0);
        assert!(row.z_score.is_finite());
    }
    assert!(doc
        .rolling
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn flat_windows_are_excluded_not_emitted_as_nan() {
    let (s1, s2) = cointegrated_pair(100, 11);
    let flatten = |series: &[Candle]| {
        let closes: Vec<f64> = series
            .iter()
            .enumerate()
            .map(|(i, c)| if i >= 60 { series[60].close } else { c.close })
            .collect();
        series_from_closes(&closes, 0)
    };
    let (s1, s2) = (flatten(&s1), flatten(&s2));

    let doc = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default()).unwrap();

    // Windows ending at index 89 or later see a constant spread
    assert!(doc.rolling.len() < 71);
    let last = doc.rolling.last().unwrap();
    assert!(last.timestamp < s1[89].timestamp);
    assert!(doc
        .rolling
        .iter()
        .all(|row| row.z_score.is_finite() && row.spread_std > 0.0));
    assert!((doc.summary.latest_z_score - last.z_score).abs() < 1e-3);
}

#[test]
fn summary_recovers_hedge_ratio_and_cointegration() {
    let (s1, s2) = cointegrated_pair(250, 3);
    let doc = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default()).unwrap();

    assert!((doc.summary.hedge_ratio - 0.8).abs() < 0.1, "hedge ratio {}", doc.summary.hedge_ratio);
    assert!(doc.summary.cointegration > 0.9, "cointegration {}", doc.summary.cointegration);
    assert!(doc.summary.cointegration <= 1.0);
    assert!(doc.summary.correlation > 0.0 && doc.summary.correlation <= 1.0);
}

#[test]
fn signal_matches_latest_z_and_thresholds() {
    let (s1, s2) = cointegrated_pair(100, 21);
    let config = AnalysisConfig::default();
    let doc = compute_metrics(&pair(), &s1, &s2, &config).unwrap();

    let z = doc.rolling.last().unwrap().z_score;
    let expected = if z > 2.0 {
        TradeSignal::SellFirstBuySecond
    } else if z < -2.0 {
        TradeSignal::BuyFirstSellSecond
    } else {
        TradeSignal::Hold
    };
    assert_eq!(doc.summary.signal, expected);
    assert_eq!(doc.summary.signal_text, expected.describe(&pair()));

    // A threshold below |z| always forces a trade
    let tight = AnalysisConfig {
        thresholds: SignalThresholds::symmetric(z.abs() / 2.0),
        ..AnalysisConfig::default()
    };
    let forced = compute_metrics(&pair(), &s1, &s2, &tight).unwrap();
    assert_ne!(forced.summary.signal, TradeSignal::Hold);
    let text = &forced.summary.signal_text;
    assert!(text.starts_with("SELL ") || text.starts_with("BUY "), "{text}");
}

#[test]
fn summary_scalars_rounded_to_three_decimals() {
    let (s1, s2) = cointegrated_pair(100, 5);
    let doc = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default()).unwrap();

    for value in [
        doc.summary.correlation,
        doc.summary.cointegration,
        doc.summary.hedge_ratio,
        doc.summary.latest_z_score,
    ] {
        assert_eq!((value * 1000.0).round() / 1000.0, value);
    }
}

#[test]
fn recomputing_identical_input_is_bit_identical() {
    let (s1, s2) = cointegrated_pair(150, 9);
    let config = AnalysisConfig::default();
    let first = compute_metrics(&pair(), &s1, &s2, &config).unwrap();
    let second = compute_metrics(&pair(), &s1, &s2, &config).unwrap();

    assert_eq!(first, second);
    for (a, b) in first.rolling.iter().zip(&second.rolling) {
        assert_eq!(a.z_score.to_bits(), b.z_score.to_bits());
    }
}

#[test]
fn constant_prices_fail_with_degenerate_regression() {
    let s1 = constant_series(60, 100.0);
    let s2 = constant_series(60, 50.0);
    let result = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default());
    assert!(matches!(result, Err(StatsError::DegenerateRegression(_))));
}

#[test]
fn disjoint_timestamps_fail_with_no_overlap() {
    let (s1, _) = cointegrated_pair(40, 1);
    let s2 = series_from_closes(&vec![10.0; 40], 1000);
    let result = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default());
    assert!(matches!(result, Err(StatsError::NoOverlap { .. })));
}

#[test]
fn partial_overlap_uses_shared_timestamps_only() {
    let (s1, s2) = cointegrated_pair(100, 13);
    // Second leg starts 10 days late
    let doc = compute_metrics(&pair(), &s1, &s2[10..], &AnalysisConfig::default()).unwrap();
    assert_eq!(doc.summary.observations, 90);
    assert_eq!(doc.rolling.len(), 61);
}

#[test]
fn short_history_fails_with_insufficient_data() {
    let (s1, s2) = cointegrated_pair(40, 17);
    let config = AnalysisConfig {
        window: 50,
        ..AnalysisConfig::default()
    };
    let result = compute_metrics(&pair(), &s1, &s2, &config);
    assert!(matches!(
        result,
        Err(StatsError::InsufficientData {
            required: 50,
            actual: 40
        })
    ));
}

#[test]
fn non_positive_price_rejected() {
    let (mut s1, s2) = cointegrated_pair(60, 19);
    s1[5].close = 0.0;
    let result = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default());
    assert!(matches!(
        result,
        Err(StatsError::NonPositivePrice { index: 5, .. })
    ));
}

#[test]
fn capital_split_follows_hedge_ratio() {
    let (s1, s2) = cointegrated_pair(100, 23);
    let config = AnalysisConfig {
        capital: Some(100_000.0),
        ..AnalysisConfig::default()
    };
    let doc = compute_metrics(&pair(), &s1, &s2, &config).unwrap();
    let allocation = doc.summary.allocation.expect("allocation");

    assert_eq!(allocation.capital, 100_000.0);
    assert!((allocation.notional_1 + allocation.notional_2 - 100_000.0).abs() < 0.01);
    assert!(allocation.notional_1 > allocation.notional_2);
}

#[test]
fn document_round_trips_through_json() {
    let (s1, s2) = cointegrated_pair(100, 29);
    let doc = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default()).unwrap();

    let json = serde_json::to_string(&doc).unwrap();
    let back: PairMetricsDocument = serde_json::from_str(&json).unwrap();

    assert_eq!(back.key(), pair());
    assert_eq!(back.summary, doc.summary);
    assert_eq!(back.rolling.len(), doc.rolling.len());
    for (a, b) in back.rolling.iter().zip(&doc.rolling) {
        assert_eq!(a.timestamp, b.timestamp);
        assert!((a.z_score - b.z_score).abs() < 1e-9);
    }
}

#[test]
fn signal_serializes_as_stable_tag() {
    let (s1, s2) = cointegrated_pair(100, 31);
    let doc = compute_metrics(&pair(), &s1, &s2, &AnalysisConfig::default()).unwrap();
    let value = serde_json::to_value(&doc).unwrap();
    let tag = value["summary"]["signal"].as_str().unwrap();
    assert!(matches!(
        tag,
        "hold" | "sell_symbol_1_buy_symbol_2" | "buy_symbol_1_sell_symbol_2"
    ));
}
