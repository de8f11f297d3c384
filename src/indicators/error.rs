// =============================================================================
// Indicator engine errors
// =============================================================================

use thiserror::Error;

/// Errors surfaced by the indicator engine.
///
/// Numeric edge cases (zero average loss in RSI, flat series in EMA/MACD) are
/// *not* errors — they resolve to well-defined sentinel values so the engine
/// never emits NaN or infinity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    /// Malformed input: non-increasing timestamps, non-positive prices, or a
    /// degenerate period parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The series is shorter than the calculator's minimum warm-up length.
    #[error("insufficient data: need {required} candles, got {actual}")]
    InsufficientData { required: usize, actual: usize },
}

impl IndicatorError {
    /// Shorthand used by every calculator's length guard.
    pub fn insufficient(required: usize, actual: usize) -> Self {
        IndicatorError::InsufficientData { required, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_carries_lengths() {
        let err = IndicatorError::insufficient(27, 10);
        assert_eq!(
            err.to_string(),
            "insufficient data: need 27 candles, got 10"
        );
    }

    #[test]
    fn invalid_input_message() {
        let err = IndicatorError::InvalidInput("period must be >= 1".into());
        assert_eq!(err.to_string(), "invalid input: period must be >= 1");
    }
}
