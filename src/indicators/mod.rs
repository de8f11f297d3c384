// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the core technical indicators.
// Every calculator is a stateless function of its inputs: no I/O, no shared
// state, bit-identical output for identical input. Callers get a typed
// `Result` so insufficient-data and invalid-input cases cannot be ignored.

pub mod ema;
pub mod error;
pub mod key_levels;
pub mod macd;
pub mod rsi;

pub use error::IndicatorError;
pub use key_levels::{KeyLevel, KeyLevelParams, LevelKind};
pub use macd::MacdSeries;
