// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// MACD tracks the spread between a fast and a slow EMA, alongside a smoothed
// signal line and their difference (histogram):
//
//   line      = EMA(closes, fast) - EMA(closes, slow)
//   signal    = EMA(line, signal_period)
//   histogram = line - signal
//
// The fast and slow EMAs have different warm-up lengths, so the fast series
// must be shifted by `slow - fast` before subtracting. The signal line then
// consumes another `signal_period - 1` points of warm-up, and the line is
// re-aligned once more so that all three output series share one final common
// length and index origin. Getting either shift wrong silently produces a
// plausible-looking but misaligned oscillator.
// =============================================================================

use super::ema::calculate_ema;
use super::IndicatorError;

/// Default fast EMA period.
pub const DEFAULT_MACD_FAST: usize = 12;
/// Default slow EMA period.
pub const DEFAULT_MACD_SLOW: usize = 26;
/// Default signal-line EMA period.
pub const DEFAULT_MACD_SIGNAL: usize = 9;

/// MACD output: three series of equal length, index-aligned to the suffix of
/// the input starting at `slow + signal_period - 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute MACD line, signal line, and histogram for `closes`.
///
/// # Errors
/// - `InvalidInput` when any period is zero or `fast >= slow`.
/// - `InsufficientData` when `closes.len() < slow + signal_period` (the
///   minimum needed to produce even one signal-line point).
pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<MacdSeries, IndicatorError> {
    if fast == 0 || slow == 0 || signal_period == 0 {
        return Err(IndicatorError::InvalidInput(
            "MACD periods must be >= 1".into(),
        ));
    }
    if fast >= slow {
        return Err(IndicatorError::InvalidInput(format!(
            "MACD fast period ({fast}) must be smaller than slow period ({slow})"
        )));
    }
    let required = slow + signal_period;
    if closes.len() < required {
        return Err(IndicatorError::insufficient(required, closes.len()));
    }

    let fast_ema = calculate_ema(closes, fast)?;
    let slow_ema = calculate_ema(closes, slow)?;

    // Align the fast EMA to the slow EMA's warm-up: drop its extra
    // `slow - fast` leading points, then subtract pointwise.
    let offset = slow - fast;
    let line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(i, &s)| fast_ema[i + offset] - s)
        .collect();

    let signal = calculate_ema(&line, signal_period)?;

    // Re-align the line to the signal's warm-up so both share one origin.
    let line_aligned: Vec<f64> = line[signal_period - 1..].to_vec();

    let histogram: Vec<f64> = line_aligned
        .iter()
        .zip(signal.iter())
        .map(|(l, s)| l - s)
        .collect();

    Ok(MacdSeries {
        line: line_aligned,
        signal,
        histogram,
    })
}

/// MACD with the conventional 12/26/9 parameters.
pub fn calculate_macd_default(closes: &[f64]) -> Result<MacdSeries, IndicatorError> {
    calculate_macd(closes, DEFAULT_MACD_FAST, DEFAULT_MACD_SLOW, DEFAULT_MACD_SIGNAL)
}
