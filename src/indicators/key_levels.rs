// =============================================================================
// Key Levels — pivot-based support / resistance detection
// =============================================================================
//
// Step 1 — Pivot identification: a candle is a pivot high when its high is the
//          maximum of the symmetric `pivot_window` neighbourhood (and strictly
//          above at least one neighbour — a flat extreme spanning the whole
//          window is not a pivot). Pivot lows mirror this on lows. Windows
//          that fall outside the series bounds are skipped entirely.
// Step 2 — Clustering: pivot prices are sorted ascending and greedily merged
//          while the next price stays within `cluster_tolerance_pct` of the
//          running cluster mean. Representative price = mean of members,
//          strength = member count. Highs and lows cluster separately.
// Step 3 — Classification against the latest close: clusters above it are
//          resistance candidates, below it support. A cluster straddling the
//          close (possible only through merging) is classified by the
//          majority position of its members.
// Step 4 — Selection: the strongest `top_n` clusters per side, ties broken by
//          proximity to the latest close.
// =============================================================================

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::IndicatorError;
use crate::series::CandleSeries;

/// Whether a level sits below (support) or above (resistance) the last close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelKind {
    Support,
    Resistance,
}

/// One inferred support/resistance price level.
///
/// `strength` counts the corroborating pivot touches inside the cluster and is
/// always >= 1 by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
    pub price: f64,
    pub kind: LevelKind,
    pub strength: usize,
}

fn default_pivot_window() -> usize {
    5
}

fn default_cluster_tolerance_pct() -> f64 {
    0.5
}

fn default_top_n() -> usize {
    3
}

/// Tunable detector parameters. The defaults (5 / 0.5% / 3) reconstruct the
/// conventional pivot-clustering approach; all three are exposed through the
/// gateway config so they can be matched against a reference output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyLevelParams {
    #[serde(default = "default_pivot_window")]
    pub pivot_window: usize,

    #[serde(default = "default_cluster_tolerance_pct")]
    pub cluster_tolerance_pct: f64,

    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for KeyLevelParams {
    fn default() -> Self {
        Self {
            pivot_window: default_pivot_window(),
            cluster_tolerance_pct: default_cluster_tolerance_pct(),
            top_n: default_top_n(),
        }
    }
}

/// Detect support/resistance levels for `series`.
///
/// Returns supports first, then resistances, each ranked strongest-first.
///
/// # Errors
/// - `InvalidInput` when `pivot_window == 0` or the tolerance is negative or
///   non-finite.
/// - `InsufficientData` when `series.len() < 2 * pivot_window + 1` (not
///   enough candles to evaluate a single full window).
pub fn detect_key_levels(
    series: &CandleSeries,
    params: &KeyLevelParams,
) -> Result<Vec<KeyLevel>, IndicatorError> {
    let w = params.pivot_window;
    if w == 0 {
        return Err(IndicatorError::InvalidInput(
            "pivot window must be >= 1".into(),
        ));
    }
    if !params.cluster_tolerance_pct.is_finite() || params.cluster_tolerance_pct < 0.0 {
        return Err(IndicatorError::InvalidInput(format!(
            "cluster tolerance must be a non-negative percentage, got {}",
            params.cluster_tolerance_pct
        )));
    }

    let required = 2 * w + 1;
    if series.len() < required {
        return Err(IndicatorError::insufficient(required, series.len()));
    }

    // Guaranteed non-empty by the length guard above.
    let last_close = match series.last_close() {
        Some(c) => c,
        None => return Err(IndicatorError::insufficient(required, 0)),
    };

    let (pivot_highs, pivot_lows) = find_pivots(series, w);

    let high_clusters = cluster_prices(pivot_highs, params.cluster_tolerance_pct);
    let low_clusters = cluster_prices(pivot_lows, params.cluster_tolerance_pct);

    let mut supports = Vec::new();
    let mut resistances = Vec::new();
    for cluster in high_clusters.into_iter().chain(low_clusters) {
        match cluster.classify(last_close) {
            LevelKind::Support => supports.push(cluster),
            LevelKind::Resistance => resistances.push(cluster),
        }
    }

    let mut levels = Vec::new();
    for cluster in rank_and_truncate(supports, last_close, params.top_n) {
        levels.push(KeyLevel {
            price: cluster.price(),
            kind: LevelKind::Support,
            strength: cluster.strength(),
        });
    }
    for cluster in rank_and_truncate(resistances, last_close, params.top_n) {
        levels.push(KeyLevel {
            price: cluster.price(),
            kind: LevelKind::Resistance,
            strength: cluster.strength(),
        });
    }

    Ok(levels)
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Pivot-high and pivot-low prices over full symmetric windows only.
fn find_pivots(series: &CandleSeries, w: usize) -> (Vec<f64>, Vec<f64>) {
    let candles = series.candles();
    let n = candles.len();

    let mut highs = Vec::new();
    let mut lows = Vec::new();

    for i in w..n - w {
        let window = &candles[i - w..=i + w];

        let h = candles[i].high;
        let is_window_max = window.iter().all(|c| h >= c.high);
        let above_some = window.iter().any(|c| h > c.high);
        if is_window_max && above_some {
            highs.push(h);
        }

        let l = candles[i].low;
        let is_window_min = window.iter().all(|c| l <= c.low);
        let below_some = window.iter().any(|c| l < c.low);
        if is_window_min && below_some {
            lows.push(l);
        }
    }

    (highs, lows)
}

/// A group of pivot prices merged within the cluster tolerance.
#[derive(Debug, Clone)]
struct Cluster {
    members: Vec<f64>,
    sum: f64,
}

impl Cluster {
    fn new(price: f64) -> Self {
        Self {
            members: vec![price],
            sum: price,
        }
    }

    fn push(&mut self, price: f64) {
        self.members.push(price);
        self.sum += price;
    }

    fn price(&self) -> f64 {
        self.sum / self.members.len() as f64
    }

    fn strength(&self) -> usize {
        self.members.len()
    }

    /// Distance of `price` from the cluster mean, as a percentage.
    fn deviation_pct(&self, price: f64) -> f64 {
        let mean = self.price();
        ((price - mean) / mean).abs() * 100.0
    }

    /// Kind relative to `last_close`, falling back to the majority position
    /// of the members when the representative price straddles the close.
    fn classify(&self, last_close: f64) -> LevelKind {
        let rep = self.price();
        if rep > last_close {
            LevelKind::Resistance
        } else if rep < last_close {
            LevelKind::Support
        } else {
            let above = self.members.iter().filter(|&&p| p > last_close).count();
            let below = self.members.iter().filter(|&&p| p < last_close).count();
            if above >= below {
                LevelKind::Resistance
            } else {
                LevelKind::Support
            }
        }
    }
}

/// Greedy ascending merge: a price joins the current cluster while it stays
/// within `tolerance_pct` of the running mean, otherwise it opens a new one.
fn cluster_prices(mut prices: Vec<f64>, tolerance_pct: f64) -> Vec<Cluster> {
    prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut clusters: Vec<Cluster> = Vec::new();
    for price in prices {
        match clusters.last_mut() {
            Some(current) if current.deviation_pct(price) <= tolerance_pct => {
                current.push(price);
            }
            _ => clusters.push(Cluster::new(price)),
        }
    }
    clusters
}

/// Strongest clusters first; ties broken by proximity to the latest close.
fn rank_and_truncate(mut clusters: Vec<Cluster>, last_close: f64, top_n: usize) -> Vec<Cluster> {
    clusters.sort_by(|a, b| {
        b.strength().cmp(&a.strength()).then_with(|| {
            let da = (a.price() - last_close).abs();
            let db = (b.price() - last_close).abs();
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        })
    });
    clusters.truncate(top_n);
    clusters
}
