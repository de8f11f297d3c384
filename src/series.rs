// =============================================================================
// Candle data model — validated, ordered price history
// =============================================================================
//
// A `CandleSeries` is the sole input of the indicator engine. Validation
// happens once, at construction: strictly increasing timestamps, positive
// finite OHLC prices, non-negative volume. The engine only ever reads the
// series; nothing downstream mutates it.

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorError;

/// A single OHLCV sample for one trading interval. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Ordered price history with strictly increasing timestamps.
///
/// Out-of-order input is rejected at construction rather than sorted: a
/// provider sending shuffled history is a bug we want surfaced, not hidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Validate and wrap a candle vector.
    pub fn new(candles: Vec<Candle>) -> Result<Self, IndicatorError> {
        let mut prev_ts: Option<i64> = None;

        for (i, c) in candles.iter().enumerate() {
            if let Some(prev) = prev_ts {
                if c.timestamp <= prev {
                    return Err(IndicatorError::InvalidInput(format!(
                        "timestamps not strictly increasing at index {i}: {prev} -> {}",
                        c.timestamp
                    )));
                }
            }
            prev_ts = Some(c.timestamp);

            for (name, px) in [
                ("open", c.open),
                ("high", c.high),
                ("low", c.low),
                ("close", c.close),
            ] {
                if !px.is_finite() || px <= 0.0 {
                    return Err(IndicatorError::InvalidInput(format!(
                        "non-positive or non-finite {name} price {px} at index {i}"
                    )));
                }
            }
            if !c.volume.is_finite() || c.volume < 0.0 {
                return Err(IndicatorError::InvalidInput(format!(
                    "invalid volume {} at index {i}",
                    c.volume
                )));
            }
        }

        Ok(Self { candles })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Closing prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Close price of the most recent candle, if any.
    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::new(ts, close, close + 1.0, close - 1.0, close, 100.0)
    }

    #[test]
    fn accepts_well_formed_series() {
        let series =
            CandleSeries::new(vec![candle(1, 10.0), candle(2, 11.0), candle(3, 12.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
        assert_eq!(series.last_close(), Some(12.0));
    }

    #[test]
    fn empty_series_is_valid() {
        let series = CandleSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.last_close(), None);
    }

    #[test]
    fn rejects_decreasing_timestamps() {
        let err = CandleSeries::new(vec![candle(2, 10.0), candle(1, 11.0)]).unwrap_err();
        assert!(matches!(err, IndicatorError::InvalidInput(_)));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let err = CandleSeries::new(vec![candle(1, 10.0), candle(1, 11.0)]).unwrap_err();
        assert!(matches!(err, IndicatorError::InvalidInput(_)));
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut bad = candle(1, 10.0);
        bad.low = 0.0;
        let err = CandleSeries::new(vec![bad]).unwrap_err();
        assert!(matches!(err, IndicatorError::InvalidInput(_)));
    }

    #[test]
    fn rejects_nan_price() {
        let mut bad = candle(1, 10.0);
        bad.close = f64::NAN;
        assert!(CandleSeries::new(vec![bad]).is_err());
    }

    #[test]
    fn rejects_negative_volume() {
        let mut bad = candle(1, 10.0);
        bad.volume = -1.0;
        assert!(CandleSeries::new(vec![bad]).is_err());
    }
}
