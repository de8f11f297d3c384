// =============================================================================
// Indicator Bundle Assembler
// =============================================================================
//
// Runs the full indicator set — RSI(14), MACD(12/26/9), EMA 20/50/200, and the
// key-level detector — over one validated candle series and collects the
// results into a single bundle.
//
// A calculator that cannot produce output for the given history (insufficient
// warm-up data) contributes an empty field instead of failing the bundle: a
// short history still yields whatever indicators it can support. The whole
// assembler is a pure function of its inputs, so callers can evaluate many
// symbols concurrently without any coordination.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::indicators::ema::calculate_ema;
use crate::indicators::key_levels::detect_key_levels;
use crate::indicators::macd::calculate_macd_default;
use crate::indicators::rsi::{calculate_rsi, DEFAULT_RSI_PERIOD};
use crate::indicators::{IndicatorError, KeyLevel, KeyLevelParams};
use crate::series::CandleSeries;

/// EMA trend-filter periods computed for every bundle.
pub const EMA_SHORT: usize = 20;
pub const EMA_MEDIUM: usize = 50;
pub const EMA_LONG: usize = 200;

/// All indicator output for one symbol. Fields are independently optional
/// from a data-availability standpoint: a short series may leave `ema200`
/// empty while `rsi` is populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorBundle {
    pub rsi: Vec<f64>,
    pub macd: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
    pub ema20: Vec<f64>,
    pub ema50: Vec<f64>,
    pub ema200: Vec<f64>,
    pub key_levels: Vec<KeyLevel>,
}

/// Assemble the full indicator bundle for `series`.
///
/// `symbol` is used for logging only; the math depends solely on the series
/// and the key-level parameters.
pub fn assemble(
    symbol: &str,
    series: &CandleSeries,
    key_level_params: &KeyLevelParams,
) -> IndicatorBundle {
    let closes = series.closes();

    let rsi = field_or_empty(symbol, "rsi", calculate_rsi(&closes, DEFAULT_RSI_PERIOD));

    let (macd, signal_line, histogram) = match calculate_macd_default(&closes) {
        Ok(m) => (m.line, m.signal, m.histogram),
        Err(e) => {
            log_skip(symbol, "macd", &e);
            (Vec::new(), Vec::new(), Vec::new())
        }
    };

    let ema20 = field_or_empty(symbol, "ema20", calculate_ema(&closes, EMA_SHORT));
    let ema50 = field_or_empty(symbol, "ema50", calculate_ema(&closes, EMA_MEDIUM));
    let ema200 = field_or_empty(symbol, "ema200", calculate_ema(&closes, EMA_LONG));

    let key_levels = match detect_key_levels(series, key_level_params) {
        Ok(levels) => levels,
        Err(e) => {
            log_skip(symbol, "keyLevels", &e);
            Vec::new()
        }
    };

    IndicatorBundle {
        rsi,
        macd,
        signal_line,
        histogram,
        ema20,
        ema50,
        ema200,
        key_levels,
    }
}

fn field_or_empty(symbol: &str, field: &str, result: Result<Vec<f64>, IndicatorError>) -> Vec<f64> {
    match result {
        Ok(values) => values,
        Err(e) => {
            log_skip(symbol, field, &e);
            Vec::new()
        }
    }
}

fn log_skip(symbol: &str, field: &str, err: &IndicatorError) {
    match err {
        IndicatorError::InsufficientData { .. } => {
            debug!(symbol, field, error = %err, "indicator skipped for short history");
        }
        IndicatorError::InvalidInput(_) => {
            warn!(symbol, field, error = %err, "indicator skipped due to invalid parameters");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Candle;

    fn series_from_closes(closes: &[f64]) -> CandleSeries {
        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 86_400, c, c + 0.5, c - 0.5, c, 1000.0))
            .collect();
        CandleSeries::new(candles).unwrap()
    }

    fn assert_strictly_increasing(tail: &[f64], name: &str) {
        for w in tail.windows(2) {
            assert!(w[1] > w[0], "{name} tail not increasing: {} -> {}", w[0], w[1]);
        }
    }

    #[test]
    fn uptrend_bundle_trends_up() {
        // 300 daily candles, smooth uptrend from 100 to 200. The trend is
        // exponential rather than linear: on a perfectly linear series the
        // seeded EMAs sit exactly at their steady-state lag and the histogram
        // collapses to zero, which would make the positivity assertion moot.
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 * 2f64.powf(i as f64 / 299.0))
            .collect();
        let series = series_from_closes(&closes);
        let bundle = assemble("UPTREND", &series, &KeyLevelParams::default());

        // EMA 20/50/200 all monotonically increasing in their tail region.
        for (ema, name) in [
            (&bundle.ema20, "ema20"),
            (&bundle.ema50, "ema50"),
            (&bundle.ema200, "ema200"),
        ] {
            assert!(!ema.is_empty(), "{name} should be populated");
            let tail = &ema[ema.len().saturating_sub(50)..];
            assert_strictly_increasing(tail, name);
        }

        // All deltas positive: RSI pegs at 100, comfortably above 50.
        let rsi_tail = &bundle.rsi[bundle.rsi.len() - 20..];
        assert!(rsi_tail.iter().all(|&v| v > 50.0));

        // Fast EMA sits above slow EMA throughout, so the histogram tail is
        // positive once the signal line has settled.
        let hist_tail = &bundle.histogram[bundle.histogram.len() - 20..];
        assert!(hist_tail.iter().all(|&v| v > 0.0));

        // A monotone trend has no interior extrema, hence no key levels.
        assert!(bundle.key_levels.is_empty());
    }

    #[test]
    fn flat_bundle_is_neutral() {
        // 300 candles, close = 150 constant, volume = 1000 constant.
        let candles: Vec<Candle> = (0..300)
            .map(|i| Candle::new(i as i64 * 86_400, 150.0, 150.0, 150.0, 150.0, 1000.0))
            .collect();
        let series = CandleSeries::new(candles).unwrap();
        let bundle = assemble("FLAT", &series, &KeyLevelParams::default());

        assert!(bundle.rsi.iter().all(|&v| (v - 50.0).abs() < 1e-10));
        assert!(bundle.macd.iter().all(|&v| v.abs() < 1e-9));
        assert!(bundle.signal_line.iter().all(|&v| v.abs() < 1e-9));
        assert!(bundle.histogram.iter().all(|&v| v.abs() < 1e-9));
        for ema in [&bundle.ema20, &bundle.ema50, &bundle.ema200] {
            assert!(!ema.is_empty());
            assert!(ema.iter().all(|&v| (v - 150.0).abs() < 1e-10));
        }
        // high == low == close everywhere: pivot ties across every window,
        // so no distinguishable levels.
        assert!(bundle.key_levels.is_empty());
    }

    #[test]
    fn short_history_yields_partial_bundle() {
        // 60 candles: enough for RSI, MACD, EMA20/50 — not for EMA200.
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.9).sin()).collect();
        let series = series_from_closes(&closes);
        let bundle = assemble("SHORT", &series, &KeyLevelParams::default());

        assert_eq!(bundle.rsi.len(), 60 - 14);
        assert!(!bundle.macd.is_empty());
        assert_eq!(bundle.ema20.len(), 60 - 20 + 1);
        assert_eq!(bundle.ema50.len(), 60 - 50 + 1);
        assert!(bundle.ema200.is_empty());
    }

    #[test]
    fn tiny_history_yields_empty_bundle_without_panicking() {
        let closes: Vec<f64> = (0..5).map(|i| 100.0 + i as f64).collect();
        let series = series_from_closes(&closes);
        let bundle = assemble("TINY", &series, &KeyLevelParams::default());

        assert!(bundle.rsi.is_empty());
        assert!(bundle.macd.is_empty());
        assert!(bundle.signal_line.is_empty());
        assert!(bundle.histogram.is_empty());
        assert!(bundle.ema20.is_empty());
        assert!(bundle.key_levels.is_empty());
    }

    #[test]
    fn assembler_is_deterministic() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 120.0 + 15.0 * ((i as f64) * 0.21).sin())
            .collect();
        let series = series_from_closes(&closes);
        let params = KeyLevelParams::default();
        let a = assemble("DET", &series, &params);
        let b = assemble("DET", &series, &params);
        assert_eq!(a.rsi, b.rsi);
        assert_eq!(a.macd, b.macd);
        assert_eq!(a.key_levels, b.key_levels);
    }
}
